//! Artist profile lookup on the streaming service.
//!
//! Runs after generation: the profile image and the external profile link are
//! spliced into the page. A client-credentials token is requested first, then
//! the artist search is queried for a single result.
//!
//! Nothing here is fatal to a run. Any failure leaves the profile unresolved
//! and the splicer writes empty values instead.

use crate::config::ArtistConfig;
use crate::error::ExtractionError;
use crate::models::ArtistProfile;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tracing::{info, instrument, warn};

const ORIGIN: &str = "artist";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub artists: Option<ArtistPage>,
}

#[derive(Debug, Deserialize)]
pub struct ArtistPage {
    #[serde(default)]
    pub items: Vec<ArtistItem>,
}

#[derive(Debug, Deserialize)]
pub struct ArtistItem {
    #[serde(default)]
    pub images: Vec<ArtistImage>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Deserialize)]
pub struct ArtistImage {
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

/// Look up `name`, degrading to an empty profile on any failure.
///
/// `credentials` is the pre-encoded `client_id:client_secret` pair used for
/// Basic authentication. Without credentials the lookup is skipped.
#[instrument(level = "info", skip(client, config, credentials))]
pub async fn resolve_artist(
    client: &Client,
    config: &ArtistConfig,
    credentials: Option<&str>,
    name: &str,
) -> ArtistProfile {
    let Some(credentials) = credentials else {
        warn!("No streaming-service credentials; musician image and link stay empty");
        return ArtistProfile::default();
    };

    let result = async {
        let token = fetch_token(client, &config.token_url, credentials).await?;
        search_artist(client, &config.search_url, &token, name).await
    }
    .await;

    match result {
        Ok(profile) => {
            info!(
                image = ?profile.image_url,
                profile = ?profile.profile_url,
                "Resolved artist profile"
            );
            profile
        }
        Err(e) => {
            warn!(error = %e, "Artist lookup failed; musician image and link stay empty");
            ArtistProfile::default()
        }
    }
}

/// Exchange client credentials for a bearer token.
async fn fetch_token(
    client: &Client,
    token_url: &str,
    credentials: &str,
) -> Result<String, ExtractionError> {
    let response: TokenResponse = client
        .post(token_url)
        .header(AUTHORIZATION, format!("Basic {credentials}"))
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body("grant_type=client_credentials")
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(ExtractionError::transport(ORIGIN))?
        .json()
        .await
        .map_err(ExtractionError::transport(ORIGIN))?;

    response
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ExtractionError::Shape(ORIGIN, "token response without access_token".to_string()))
}

async fn search_artist(
    client: &Client,
    search_url: &str,
    token: &str,
    name: &str,
) -> Result<ArtistProfile, ExtractionError> {
    let url = format!(
        "{search_url}?q={}&type=artist&limit=1",
        urlencoding::encode(name)
    );
    let body = client
        .get(&url)
        .header(ACCEPT, "application/json")
        .bearer_auth(token)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(ExtractionError::transport(ORIGIN))?
        .text()
        .await
        .map_err(ExtractionError::transport(ORIGIN))?;
    parse_search(&body)
}

/// Read the first artist's image and profile link from a search response.
pub fn parse_search(body: &str) -> Result<ArtistProfile, ExtractionError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| ExtractionError::Shape(ORIGIN, e.to_string()))?;
    let Some(first) = response.artists.and_then(|page| page.items.into_iter().next()) else {
        return Ok(ArtistProfile::default());
    };
    Ok(ArtistProfile {
        image_url: first.images.into_iter().next().map(|image| image.url),
        profile_url: first.external_urls.spotify,
    })
}
