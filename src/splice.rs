//! Markup splicing.
//!
//! The generated page is parsed into a tree and written back out, and on the
//! way out every element whose id names a [`Placeholder`] gets its late-bound
//! value: the artist image, the biography summary, the outbound links. These
//! values only exist after generation, which is why this is a separate stage
//! and not part of the prompt.
//!
//! Placeholders the model left out are skipped and reported. Sentinel tokens
//! that survive anywhere in the output (for instance a sentinel `src` on an
//! element that lost its id) are replaced too, so none reaches the page.

use crate::models::{ArtistProfile, Placeholder, PublishedPage};
use scraper::{ElementRef, Html, Node};
use std::collections::HashSet;
use tracing::{info, instrument, warn};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose text content is written back without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

/// Values resolved after generation.
#[derive(Debug, Clone, Default)]
pub struct LateBindings {
    pub artist: ArtistProfile,
    pub musician_summary: String,
    pub biography_url: Option<String>,
}

impl LateBindings {
    /// Value written for an attribute placeholder; empty when unresolved.
    fn attribute_value(&self, placeholder: Placeholder) -> &str {
        match placeholder {
            Placeholder::MusicianImage => self.artist.image_url.as_deref(),
            Placeholder::SpotifyLink => self.artist.profile_url.as_deref(),
            Placeholder::BiographyLink => self.biography_url.as_deref(),
            Placeholder::MusicianText => None,
        }
        .unwrap_or_default()
    }
}

/// The spliced page plus the placeholders that were not found.
#[derive(Debug, Clone)]
pub struct SpliceReport {
    pub page: PublishedPage,
    pub missed: Vec<Placeholder>,
}

/// Bind `bindings` into `markup`.
#[instrument(level = "info", skip_all, fields(bytes = markup.len()))]
pub fn splice(markup: &str, bindings: &LateBindings) -> SpliceReport {
    let document = Html::parse_document(markup);
    let mut writer = Writer {
        bindings,
        found: HashSet::new(),
        out: String::with_capacity(markup.len() + 512),
    };

    for child in document.tree.root().children() {
        match child.value() {
            Node::Doctype(doctype) => {
                writer.out.push_str("<!DOCTYPE ");
                writer.out.push_str(doctype.name());
                writer.out.push_str(">\n");
            }
            Node::Comment(comment) => writer.comment(comment),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    writer.element(element);
                }
            }
            _ => {}
        }
    }

    let Writer { found, mut out, .. } = writer;
    for placeholder in Placeholder::ALL {
        if let Some(sentinel) = placeholder.sentinel() {
            if out.contains(sentinel) {
                out = out.replace(sentinel, &escape_attr(bindings.attribute_value(placeholder)));
            }
        }
    }

    let missed: Vec<Placeholder> = Placeholder::ALL
        .into_iter()
        .filter(|p| !found.contains(p))
        .collect();
    for placeholder in &missed {
        warn!(id = placeholder.element_id(), "Placeholder missing from generated markup; skipped");
    }
    info!(bytes = out.len(), missed = missed.len(), "Spliced late-bound values");

    SpliceReport {
        page: PublishedPage { markup: out },
        missed,
    }
}

struct Writer<'b> {
    bindings: &'b LateBindings,
    found: HashSet<Placeholder>,
    out: String,
}

impl Writer<'_> {
    fn element(&mut self, element: ElementRef<'_>) {
        let value = element.value();
        let name = value.name();
        let void = VOID_ELEMENTS.contains(&name);
        let placeholder = value
            .id()
            .and_then(|id| Placeholder::ALL.into_iter().find(|p| p.element_id() == id));
        match placeholder {
            // A void element has no content to hold the summary.
            Some(Placeholder::MusicianText) if void => {
                warn!(element = name, "Summary placeholder is on a void element; summary dropped");
            }
            Some(placeholder) => {
                self.found.insert(placeholder);
            }
            None => {}
        }

        let mut attrs: Vec<(String, String)> = value
            .attrs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        match placeholder {
            Some(p @ Placeholder::MusicianImage) => {
                set_attr(&mut attrs, "src", self.bindings.attribute_value(p));
            }
            Some(p @ Placeholder::SpotifyLink) => {
                set_attr(&mut attrs, "href", self.bindings.attribute_value(p));
                set_attr(&mut attrs, "target", "_blank");
            }
            Some(p @ Placeholder::BiographyLink) => {
                set_attr(&mut attrs, "href", self.bindings.attribute_value(p));
            }
            _ => {}
        }

        self.out.push('<');
        self.out.push_str(name);
        for (key, val) in &attrs {
            self.out.push(' ');
            self.out.push_str(key);
            self.out.push_str("=\"");
            self.out.push_str(&escape_attr(val));
            self.out.push('"');
        }
        self.out.push('>');
        if void {
            return;
        }

        if placeholder == Some(Placeholder::MusicianText) {
            let summary = escape_text(&self.bindings.musician_summary);
            self.out.push_str(&summary);
        } else {
            let raw = RAW_TEXT_ELEMENTS.contains(&name);
            for child in element.children() {
                match child.value() {
                    Node::Text(text) if raw => self.out.push_str(text),
                    Node::Text(text) => self.out.push_str(&escape_text(text)),
                    Node::Comment(comment) => self.comment(comment),
                    Node::Element(_) => {
                        if let Some(child) = ElementRef::wrap(child) {
                            self.element(child);
                        }
                    }
                    _ => {}
                }
            }
        }

        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
    }

    fn comment(&mut self, comment: &str) {
        self.out.push_str("<!--");
        self.out.push_str(comment);
        self.out.push_str("-->");
    }
}

fn set_attr(attrs: &mut Vec<(String, String)>, key: &str, value: &str) {
    match attrs.iter_mut().find(|(k, _)| k == key) {
        Some((_, v)) => *v = value.to_string(),
        None => attrs.push((key.to_string(), value.to_string())),
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}
