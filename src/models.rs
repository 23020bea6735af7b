//! Data models that flow through the daily pipeline.
//!
//! - [`Animal`], [`MusicianDraft`], [`Musician`]: what the extractors produce
//! - [`DailyFacts`]: the aggregated, immutable record a run is built on
//! - [`GenerationRequest`] / [`GenerationResult`]: the model round trip
//! - [`Placeholder`]: slots in the generated markup bound after generation
//! - [`PublishedPage`]: the markup that ends up on disk

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// The animal of the day as scraped from the picture-of-the-day page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Animal {
    /// Display name taken from the page's title link.
    pub name: String,
    /// Absolute URL of the picture.
    pub image_url: String,
}

/// A musician picked from the "born on this day" listing, before the
/// biography has been summarized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MusicianDraft {
    pub name: String,
    pub biography_url: Option<String>,
    /// Visible biography text, already truncated for summarization.
    pub biography_text: String,
}

/// A musician ready for the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Musician {
    pub name: String,
    pub biography_url: Option<String>,
    /// Short, kid-friendly summary of the biography.
    pub summary: String,
}

/// Everything a run knows before asking the model for a page.
///
/// Built once by [`crate::facts::aggregate`] and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct DailyFacts {
    /// The calendar day the page is generated for.
    pub date: NaiveDate,
    /// The instant the run started, embedded in the prompt as ISO 8601.
    pub generated_at: DateTime<FixedOffset>,
    /// Human-readable weather sentence.
    pub weather: String,
    pub animal: Animal,
    pub musician: Musician,
}

/// Sampling parameters sent along with a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A prompt plus its sampling parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt_text: String,
    pub parameters: ModelParameters,
}

/// The model's reply, with the fenced markup pulled out when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub raw_text: String,
    /// `None` when the reply carried no ```` ```html ```` fence.
    pub extracted_markup: Option<String>,
}

impl GenerationResult {
    /// The markup the splicer should work on: the fenced block when there is
    /// one, otherwise the whole reply.
    pub fn markup(&self) -> &str {
        self.extracted_markup.as_deref().unwrap_or(&self.raw_text)
    }
}

/// Artist profile looked up on the streaming service after generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtistProfile {
    pub image_url: Option<String>,
    pub profile_url: Option<String>,
}

/// A slot in the generated markup that is filled after generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// `<img id="musician-img">`, its `src` attribute.
    MusicianImage,
    /// `id="musician"`, its text content.
    MusicianText,
    /// `<a id="link-spotify">`, its `href` attribute.
    SpotifyLink,
    /// `<a id="link-wikipedia">`, its `href` attribute.
    BiographyLink,
}

impl Placeholder {
    pub const ALL: [Placeholder; 4] = [
        Placeholder::MusicianImage,
        Placeholder::MusicianText,
        Placeholder::SpotifyLink,
        Placeholder::BiographyLink,
    ];

    /// The element id the prompt asks the model to use.
    pub fn element_id(self) -> &'static str {
        match self {
            Placeholder::MusicianImage => "musician-img",
            Placeholder::MusicianText => "musician",
            Placeholder::SpotifyLink => "link-spotify",
            Placeholder::BiographyLink => "link-wikipedia",
        }
    }

    /// Literal token the model writes where the late value goes, if any.
    pub fn sentinel(self) -> Option<&'static str> {
        match self {
            Placeholder::MusicianImage => Some("MUSICIAN-IMG-REPLACE"),
            Placeholder::MusicianText => None,
            Placeholder::SpotifyLink => Some("SPOTIFY-LINK-REPLACE"),
            Placeholder::BiographyLink => Some("WIKIPEDIA-LINK-REPLACE"),
        }
    }
}

/// Final markup, with every placeholder bound or visibly empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPage {
    pub markup: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_prefers_extracted_block() {
        let result = GenerationResult {
            raw_text: "```html\n<p>x</p>\n```".to_string(),
            extracted_markup: Some("<p>x</p>\n".to_string()),
        };
        assert_eq!(result.markup(), "<p>x</p>\n");
    }

    #[test]
    fn test_markup_falls_back_to_raw_text() {
        let result = GenerationResult {
            raw_text: "<p>no fence</p>".to_string(),
            extracted_markup: None,
        };
        assert_eq!(result.markup(), "<p>no fence</p>");
    }

    #[test]
    fn test_placeholder_ids_are_distinct() {
        let mut ids: Vec<_> = Placeholder::ALL.iter().map(|p| p.element_id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), Placeholder::ALL.len());
    }
}
