//! YAML configuration for endpoints, model settings and output paths.
//!
//! Every section has defaults, so running without a config file works against
//! the public endpoints the page was designed around. Secrets never live here;
//! they come from the command line or the environment (see [`crate::cli`]).
//!
//! ```yaml
//! site_dir: ./site
//! request_timeout_secs: 90
//! llm:
//!   model: gpt-3.5-turbo-16k
//!   max_tokens: 1000
//! weather:
//!   latitude: 42.1675
//!   longitude: -87.8977
//!   location_name: Riverwoods
//! publish:
//!   archive_keying: run_date
//! ```

use crate::error::ConfigError;
use crate::models::ModelParameters;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding `index.html` and the `archive/` folder.
    pub site_dir: PathBuf,
    /// Deadline applied to every outbound request. `None` waits forever.
    pub request_timeout_secs: Option<u64>,
    pub llm: LlmConfig,
    pub weather: WeatherConfig,
    pub animal: AnimalConfig,
    pub musician: MusicianConfig,
    pub artist: ArtistConfig,
    pub publish: PublishSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_dir: PathBuf::from("."),
            request_timeout_secs: Some(120),
            llm: LlmConfig::default(),
            weather: WeatherConfig::default(),
            animal: AnimalConfig::default(),
            musician: MusicianConfig::default(),
            artist: ArtistConfig::default(),
            publish: PublishSettings::default(),
        }
    }
}

impl Config {
    /// Load the configuration from `path`, or return the defaults when no
    /// path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            info!("No config file given; using defaults");
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.to_path_buf(),
            error,
        })?;
        let config = Self::from_yaml(&raw).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn live_page(&self) -> PathBuf {
        self.site_dir.join("index.html")
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.site_dir.join("archive")
    }
}

/// OpenAI-compatible chat completions endpoint and sampling settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    /// Token ceiling for the page itself.
    pub max_tokens: u32,
    /// Token ceiling for the biography summary.
    pub summary_max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo-16k".to_string(),
            temperature: 1.0,
            max_tokens: 1000,
            summary_max_tokens: 300,
        }
    }
}

impl LlmConfig {
    pub fn page_parameters(&self) -> ModelParameters {
        ModelParameters {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub fn summary_parameters(&self) -> ModelParameters {
        ModelParameters {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.summary_max_tokens,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    Imperial,
    Metric,
}

impl Units {
    pub fn query_value(self) -> &'static str {
        match self {
            Units::Imperial => "imperial",
            Units::Metric => "metric",
        }
    }

    pub fn degree_symbol(self) -> &'static str {
        match self {
            Units::Imperial => "°F",
            Units::Metric => "°C",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub api_url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: String,
    pub units: Units,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            latitude: 42.1675,
            longitude: -87.8977,
            location_name: "Riverwoods".to_string(),
            units: Units::Imperial,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnimalConfig {
    pub page_url: String,
}

impl Default for AnimalConfig {
    fn default() -> Self {
        Self {
            page_url: "https://www.animalfunfacts.net/pictures/picture-of-the-day.html"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MusicianConfig {
    /// Listing URL; `{month}` becomes the lowercase English month name and
    /// `{day}` the day of month.
    pub listing_url: String,
    /// Selects the listing's own entries, leaving navigation and footer
    /// lists out.
    pub listing_selector: String,
    /// Name-verification attempts before the last candidate is accepted.
    pub max_attempts: usize,
    /// Characters of biography text handed to summarization.
    pub biography_chars: usize,
    /// Tried in order; the first that matches is the main content region.
    pub content_selectors: Vec<String>,
}

impl Default for MusicianConfig {
    fn default() -> Self {
        Self {
            listing_url: "https://www.onthisday.com/music/birthdays/{month}/{day}".to_string(),
            listing_selector: "main ul.photo-list > li, main ul.event-list > li".to_string(),
            max_attempts: 5,
            biography_chars: 2000,
            content_selectors: vec![
                "#mw-content-text".to_string(),
                "main".to_string(),
                "article".to_string(),
                "body".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtistConfig {
    pub token_url: String,
    pub search_url: String,
}

impl Default for ArtistConfig {
    fn default() -> Self {
        Self {
            token_url: "https://accounts.spotify.com/api/token".to_string(),
            search_url: "https://api.spotify.com/v1/search".to_string(),
        }
    }
}

/// Which date an archive entry is filed under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveKeying {
    /// The date of the run doing the rotation.
    #[default]
    RunDate,
    /// The date stamped into the rotated page, falling back to the run date.
    AuthoredDate,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PublishSettings {
    pub archive_keying: ArchiveKeying,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.musician.max_attempts, 5);
        assert_eq!(config.musician.biography_chars, 2000);
        assert!(config.musician.listing_selector.starts_with("main ul.photo-list"));
        assert_eq!(config.weather.units, Units::Imperial);
        assert_eq!(config.live_page(), PathBuf::from("./index.html"));
        assert_eq!(config.archive_dir(), PathBuf::from("./archive"));
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let config = Config::from_yaml(
            "site_dir: /srv/page\nllm:\n  model: local-model\npublish:\n  archive_keying: authored_date\n",
        )
        .unwrap();
        assert_eq!(config.site_dir, PathBuf::from("/srv/page"));
        assert_eq!(config.llm.model, "local-model");
        assert_eq!(config.llm.max_tokens, 1000);
        assert_eq!(config.publish.archive_keying, ArchiveKeying::AuthoredDate);
        assert_eq!(config.weather.location_name, "Riverwoods");
    }

    #[test]
    fn test_metric_units() {
        let config = Config::from_yaml("weather:\n  units: metric\n").unwrap();
        assert_eq!(config.weather.units.degree_symbol(), "°C");
        assert_eq!(config.weather.units.query_value(), "metric");
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = Config::load(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
