//! Error types for each stage of the daily pipeline.
//!
//! Fatal conditions are modelled here. Recoverable ones (a reply without a
//! code fence, a placeholder the model forgot) never become errors: they are
//! logged and reported through [`crate::models::GenerationResult`] and
//! [`crate::splice::SpliceReport`].

use std::path::PathBuf;
use thiserror::Error;

/// An upstream document could not be turned into a fact record.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The request failed, timed out, or returned a non-success status.
    #[error("{origin}: request failed: {error}")]
    Transport {
        origin: &'static str,
        #[source]
        error: reqwest::Error,
    },
    /// The document no longer has the shape the extractor expects.
    #[error("{0}: unexpected document shape: {1}")]
    Shape(&'static str, String),
    #[error("{0}: empty document")]
    Empty(&'static str),
}

impl ExtractionError {
    pub fn transport(origin: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |error| Self::Transport { origin, error }
    }
}

/// The language model could not be reached or answered with nothing.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The endpoint answered with a non-success status code.
    #[error("Status error: {1} (Status {0})")]
    StatusCode(reqwest::StatusCode, String),
    #[error("Model returned an empty reply")]
    EmptyReply,
}

/// Rotating the archive or writing the live page failed.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("failed to read live page {path}: {error}")]
    ReadLive {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
    #[error("failed to write archive entry {path}: {error}")]
    WriteArchive {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
    /// The archive entry was written but the live page was not replaced.
    #[error("archived previous page but failed to publish {path}: {error}")]
    WriteLive {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {error}")]
    Read {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
    #[error("invalid config {path}: {error}")]
    Parse {
        path: PathBuf,
        #[source]
        error: serde_yaml::Error,
    },
    #[error("missing secret: {0}")]
    MissingSecret(&'static str),
}

/// Any fatal failure of a run. No page is published when one of these occurs.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_error_names_origin() {
        let err = ExtractionError::Shape("animal", "no srcset attribute".to_string());
        assert_eq!(
            err.to_string(),
            "animal: unexpected document shape: no srcset attribute"
        );
    }

    #[test]
    fn test_pipeline_error_is_transparent() {
        let err: PipelineError = ExtractionError::Empty("weather").into();
        assert_eq!(err.to_string(), "weather: empty document");
        assert!(matches!(err, PipelineError::Extraction(_)));
    }
}
