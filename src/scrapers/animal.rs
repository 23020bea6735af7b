//! Animal of the day scraper.
//!
//! The picture-of-the-day page shows a single responsive image and a title
//! link. The image is the first element carrying a `srcset` attribute; its
//! first candidate is a site-relative path. The title link carries the
//! `uk-link-reset` class.

use crate::error::ExtractionError;
use crate::models::Animal;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{info, instrument};
use url::Url;

const ORIGIN: &str = "animal";

/// Fetch the picture-of-the-day page and extract the animal.
#[instrument(level = "info", skip(client))]
pub async fn fetch_animal(client: &Client, page_url: &str) -> Result<Animal, ExtractionError> {
    let html = client
        .get(page_url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(ExtractionError::transport(ORIGIN))?
        .text()
        .await
        .map_err(ExtractionError::transport(ORIGIN))?;

    let animal = parse_animal(&html, page_url)?;
    info!(name = %animal.name, image = %animal.image_url, "Extracted animal of the day");
    Ok(animal)
}

/// Extract the animal from the page body.
///
/// `page_url` is only used for its origin: the image path is qualified against
/// the site root, not against the page's directory.
pub fn parse_animal(html: &str, page_url: &str) -> Result<Animal, ExtractionError> {
    if html.trim().is_empty() {
        return Err(ExtractionError::Empty(ORIGIN));
    }
    let document = Html::parse_document(html);

    let srcset_selector = Selector::parse("[srcset]").unwrap();
    let srcset = document
        .select(&srcset_selector)
        .next()
        .and_then(|el| el.value().attr("srcset"))
        .ok_or_else(|| ExtractionError::Shape(ORIGIN, "no srcset attribute".to_string()))?;
    let path = srcset
        .split_whitespace()
        .next()
        .ok_or_else(|| ExtractionError::Shape(ORIGIN, "empty srcset attribute".to_string()))?;

    let origin = Url::parse(page_url)
        .and_then(|u| u.join("/"))
        .map_err(|e| ExtractionError::Shape(ORIGIN, format!("bad page url {page_url}: {e}")))?;
    let image_url = origin
        .join(path.trim_start_matches('/'))
        .map_err(|e| ExtractionError::Shape(ORIGIN, format!("bad image path {path}: {e}")))?;

    let title_selector = Selector::parse("a.uk-link-reset").unwrap();
    let name = document
        .select(&title_selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ExtractionError::Shape(ORIGIN, "no uk-link-reset title".to_string()))?;

    Ok(Animal {
        name,
        image_url: image_url.to_string(),
    })
}
