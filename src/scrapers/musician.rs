//! "Born on this day" musician scraper.
//!
//! Two phases, like the news indexers:
//!
//! 1. **Listing**: fetch today's dated listing and collect its first-level
//!    entries, then pick one at random whose link looks like it belongs to the
//!    name shown (see [`choose_candidate`]).
//! 2. **Biography**: fetch the picked entry's page and keep the visible text of
//!    its main content region, truncated for summarization.

use crate::config::MusicianConfig;
use crate::error::ExtractionError;
use crate::models::MusicianDraft;
use crate::utils::{collapse_whitespace, truncate_chars};
use chrono::{Datelike, NaiveDate};
use itertools::Itertools;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

const ORIGIN: &str = "musician";

/// Leading "1940 – " style year prefix in listing entries.
static YEAR_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d{1,4}\s*(?:BC\s*)?[-–—:]\s*").unwrap());

/// One first-level entry of the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Display name: the entry text before its first comma.
    pub name: String,
    /// Absolute link target of the entry's first link.
    pub href: String,
}

impl ListingEntry {
    /// Whether the link target mentions the first token of the name.
    pub fn link_matches_name(&self) -> bool {
        let Some(first) = self.name.split_whitespace().next() else {
            return false;
        };
        let href = urlencoding::decode(&self.href)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| self.href.clone())
            .to_lowercase();
        href.contains(&first.to_lowercase())
    }
}

/// Fill the listing URL template for `date`.
pub fn listing_url(template: &str, date: NaiveDate) -> String {
    let month = date.format("%B").to_string().to_lowercase();
    template
        .replace("{month}", &month)
        .replace("{day}", &date.day().to_string())
}

/// Pick today's musician and fetch their biography text.
#[instrument(level = "info", skip(client, config))]
pub async fn fetch_musician(
    client: &Client,
    config: &MusicianConfig,
    date: NaiveDate,
) -> Result<MusicianDraft, ExtractionError> {
    let url = listing_url(&config.listing_url, date);
    let listing = get_text(client, &url).await?;
    let entries = parse_listing(&listing, &url, &config.listing_selector)?;
    info!(count = entries.len(), %url, "Indexed born-today listing");

    let entry = choose_candidate(
        &entries,
        config.max_attempts,
        &mut rand::rng(),
        ListingEntry::link_matches_name,
    )
        .ok_or_else(|| ExtractionError::Shape(ORIGIN, "listing has no linked entries".to_string()))?
        .clone();

    let page = get_text(client, &entry.href).await?;
    let biography_text = parse_biography(&page, &config.content_selectors, config.biography_chars)?;
    info!(name = %entry.name, chars = biography_text.chars().count(), "Fetched biography");

    Ok(MusicianDraft {
        name: entry.name,
        biography_url: Some(entry.href),
        biography_text,
    })
}

async fn get_text(client: &Client, url: &str) -> Result<String, ExtractionError> {
    client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(ExtractionError::transport(ORIGIN))?
        .text()
        .await
        .map_err(ExtractionError::transport(ORIGIN))
}

/// Collect the first-level, linked entries of the listing.
///
/// `item_selector` scopes the query to the listing's own items, so site
/// navigation and footer lists never become candidates. A first-level entry
/// is a matched item with no list item above it. Entries without a link are
/// dropped since there is no biography to follow, and entries repeating a
/// name already seen are dropped too.
pub fn parse_listing(
    html: &str,
    page_url: &str,
    item_selector: &str,
) -> Result<Vec<ListingEntry>, ExtractionError> {
    if html.trim().is_empty() {
        return Err(ExtractionError::Empty(ORIGIN));
    }
    let base = Url::parse(page_url)
        .map_err(|e| ExtractionError::Shape(ORIGIN, format!("bad listing url {page_url}: {e}")))?;
    let document = Html::parse_document(html);
    let item_selector = Selector::parse(item_selector).map_err(|e| {
        ExtractionError::Shape(ORIGIN, format!("bad listing selector {item_selector}: {e}"))
    })?;
    let link_selector = Selector::parse("a[href]").unwrap();

    let entries = document
        .select(&item_selector)
        .filter(|item| !has_ancestor(*item, &["li"]))
        .filter_map(|item| {
            let href = item
                .select(&link_selector)
                .next()
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| base.join(href).ok())?;
            let text = collapse_whitespace(&item.text().collect::<String>());
            let name = candidate_name(&text)?;
            Some(ListingEntry {
                name,
                href: href.to_string(),
            })
        })
        .unique_by(|entry| entry.name.clone())
        .collect::<Vec<_>>();

    if entries.is_empty() {
        return Err(ExtractionError::Shape(
            ORIGIN,
            "no first-level linked list entries".to_string(),
        ));
    }
    Ok(entries)
}

/// Text before the first comma, without a leading year.
fn candidate_name(text: &str) -> Option<String> {
    let head = text.split(',').next().unwrap_or_default();
    let name = YEAR_PREFIX.replace(head, "").trim().to_string();
    (!name.is_empty()).then_some(name)
}

/// Pick a random entry that passes `verify`.
///
/// Each attempt draws a different, not yet tried entry. After `max_attempts`
/// failed checks (or once every entry has been tried) the last drawn candidate
/// is accepted anyway. Returns `None` only for an empty listing.
pub fn choose_candidate<'a, R, F>(
    entries: &'a [ListingEntry],
    max_attempts: usize,
    rng: &mut R,
    mut verify: F,
) -> Option<&'a ListingEntry>
where
    R: Rng + ?Sized,
    F: FnMut(&ListingEntry) -> bool,
{
    let mut untried: Vec<usize> = (0..entries.len()).collect();
    let mut last = None;
    let mut attempt = 0usize;

    while attempt < max_attempts.max(1) && !untried.is_empty() {
        attempt += 1;
        let index = untried.swap_remove(rng.random_range(0..untried.len()));
        let candidate = &entries[index];
        if verify(candidate) {
            debug!(attempt, name = %candidate.name, "Candidate link matches name");
            return Some(candidate);
        }
        debug!(attempt, name = %candidate.name, href = %candidate.href, "Candidate link does not match name");
        last = Some(candidate);
    }

    if let Some(candidate) = last {
        warn!(
            attempts = attempt,
            name = %candidate.name,
            "No candidate verified; accepting the last one"
        );
    }
    last
}

/// Visible text of the biography's main content region.
///
/// The first selector in `content_selectors` that matches picks the region.
/// Text under `style` and `script` elements is skipped.
pub fn parse_biography(
    html: &str,
    content_selectors: &[String],
    max_chars: usize,
) -> Result<String, ExtractionError> {
    if html.trim().is_empty() {
        return Err(ExtractionError::Empty(ORIGIN));
    }
    let document = Html::parse_document(html);
    let region = content_selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| document.select(&selector).next())
        .ok_or_else(|| ExtractionError::Shape(ORIGIN, "no main content region".to_string()))?;

    let mut text = String::new();
    for node in region.descendants() {
        if let Node::Text(t) = node.value() {
            let hidden = node
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|el| matches!(el.value().name(), "style" | "script"));
            if !hidden {
                text.push_str(t);
                text.push(' ');
            }
        }
    }

    let text = collapse_whitespace(&text);
    if text.is_empty() {
        return Err(ExtractionError::Shape(ORIGIN, "biography has no text".to_string()));
    }
    Ok(truncate_chars(&text, max_chars))
}

fn has_ancestor(element: ElementRef<'_>, names: &[&str]) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|el| names.contains(&el.value().name()))
}
