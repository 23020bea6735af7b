//! Source extractors for the facts that go on the page.
//!
//! Each extractor splits into a pure `parse_*` function that turns a fetched
//! document into a typed record, and an async `fetch_*` function that does the
//! network round trip and hands the body to the parser.
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | Animal of the day | [`animal`] | HTML scraping | First `srcset` image, `uk-link-reset` title |
//! | Weather | [`weather`] | JSON API | Fixed coordinates, one unit system |
//! | Born on this day | [`musician`] | HTML scraping | Random pick with bounded name verification |
//! | Artist profile | [`artist`] | JSON API | Bearer token, looked up after generation |
//!
//! A document that does not have the expected shape is an
//! [`ExtractionError`](crate::error::ExtractionError).

pub mod animal;
pub mod artist;
pub mod musician;
pub mod weather;

use reqwest::Client;
use std::time::Duration;

/// Build the HTTP client shared by every extractor and the model client.
///
/// The optional timeout applies to each request as a whole.
pub fn http_client(timeout: Option<Duration>) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder().user_agent(concat!(
        env!("CARGO_PKG_NAME"),
        "/",
        env!("CARGO_PKG_VERSION")
    ));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build()
}
