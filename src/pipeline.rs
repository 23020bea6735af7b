//! The daily run, stage by stage.
//!
//! Extractors → aggregation → prompt → generation → splicing → publishing.
//! The three extractors run concurrently; every later stage waits on the one
//! before it. Any fatal error stops the run before anything is written.

use crate::api::{AskAsync, ChatClient, generate};
use crate::config::Config;
use crate::error::{ConfigError, ExtractionError, PipelineError};
use crate::facts::aggregate;
use crate::models::{
    ArtistProfile, DailyFacts, GenerationResult, ModelParameters, Musician, MusicianDraft,
};
use crate::outputs::archive::{PublishConfig, PublishReport, publish};
use crate::prompts::{compose_page_request, compose_summary_request};
use crate::scrapers::{animal, artist, http_client, musician, weather};
use crate::splice::{LateBindings, SpliceReport, splice};
use chrono::{DateTime, FixedOffset};
use reqwest::Client;
use tracing::{info, instrument};

/// Credentials for the upstream services.
#[derive(Clone, Default)]
pub struct Secrets {
    pub openai_key: Option<String>,
    pub openweather_key: Option<String>,
    /// Pre-encoded `client_id:client_secret` for the streaming service.
    pub spotify_key: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("openai_key", &self.openai_key.as_ref().map(|_| "***"))
            .field("openweather_key", &self.openweather_key.as_ref().map(|_| "***"))
            .field("spotify_key", &self.spotify_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Outcome of a run.
#[derive(Debug)]
pub enum RunOutcome {
    Published {
        report: PublishReport,
        splice: SpliceReport,
    },
    /// `--dry-run`: the page was built but not written.
    DryRun { splice: SpliceReport },
}

/// Run the whole pipeline once for `now`.
#[instrument(level = "info", skip_all, fields(date = %now.date_naive()))]
pub async fn run(
    config: &Config,
    secrets: &Secrets,
    now: DateTime<FixedOffset>,
    dry_run: bool,
) -> Result<RunOutcome, PipelineError> {
    let openai_key = secrets
        .openai_key
        .as_deref()
        .ok_or(ConfigError::MissingSecret("OPENAI_KEY"))?;
    let openweather_key = secrets
        .openweather_key
        .as_deref()
        .ok_or(ConfigError::MissingSecret("OPENWEATHER_KEY"))?;

    let client = http_client(config.request_timeout()).map_err(ExtractionError::transport("http"))?;
    let api = ChatClient::new(client.clone(), &config.llm, openai_key);

    let facts = collect_facts(&client, config, openweather_key, &api, now).await?;
    let result = generate_page(&api, &facts, config.llm.page_parameters()).await?;
    let profile = artist::resolve_artist(
        &client,
        &config.artist,
        secrets.spotify_key.as_deref(),
        &facts.musician.name,
    )
    .await;
    let splice = bind(&result, &facts, profile);

    if dry_run {
        info!("Dry run; not publishing");
        return Ok(RunOutcome::DryRun { splice });
    }

    let publish_config = PublishConfig {
        live_page: config.live_page(),
        archive_dir: config.archive_dir(),
        keying: config.publish.archive_keying,
    };
    let report = publish(&publish_config, &splice.page, facts.date).await?;
    Ok(RunOutcome::Published { report, splice })
}

/// Run the extractors and aggregate their facts.
#[instrument(level = "info", skip_all)]
pub async fn collect_facts<A: AskAsync>(
    client: &Client,
    config: &Config,
    openweather_key: &str,
    api: &A,
    now: DateTime<FixedOffset>,
) -> Result<DailyFacts, PipelineError> {
    let (animal, weather, draft) = tokio::join!(
        animal::fetch_animal(client, &config.animal.page_url),
        weather::fetch_weather(client, &config.weather, openweather_key),
        musician::fetch_musician(client, &config.musician, now.date_naive()),
    );

    let musician = match (&animal, &weather, draft) {
        (Ok(_), Ok(_), Ok(draft)) => {
            Ok(summarize(api, draft, config.llm.summary_parameters()).await?)
        }
        // Aggregation fails on the other extractor anyway; skip the model call.
        (_, _, other) => other.map(|draft| Musician {
            name: draft.name,
            biography_url: draft.biography_url,
            summary: String::new(),
        }),
    };

    Ok(aggregate(animal, weather, musician, now)?)
}

/// Condense the biography into the summary shown on the page.
#[instrument(level = "info", skip_all, fields(name = %draft.name))]
pub async fn summarize<A: AskAsync>(
    api: &A,
    draft: MusicianDraft,
    parameters: ModelParameters,
) -> Result<Musician, PipelineError> {
    let request = compose_summary_request(&draft, parameters);
    let summary = api.ask(&request).await?.trim().to_string();
    info!(chars = summary.chars().count(), "Summarized biography");
    Ok(Musician {
        name: draft.name,
        biography_url: draft.biography_url,
        summary,
    })
}

/// Compose the page prompt and ask the model for the page.
pub async fn generate_page<A: AskAsync>(
    api: &A,
    facts: &DailyFacts,
    parameters: ModelParameters,
) -> Result<GenerationResult, PipelineError> {
    let request = compose_page_request(facts, parameters);
    Ok(generate(api, &request).await?)
}

/// Splice the late-bound values into the generated markup.
pub fn bind(result: &GenerationResult, facts: &DailyFacts, artist: ArtistProfile) -> SpliceReport {
    let bindings = LateBindings {
        artist,
        musician_summary: facts.musician.summary.clone(),
        biography_url: facts.musician.biography_url.clone(),
    };
    splice(result.markup(), &bindings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::FakeAsk;
    use crate::config::ArchiveKeying;
    use crate::error::GenerationError;
    use crate::models::Animal;
    use crate::prompts::navigation_links;
    use scraper::{Html, Selector};
    use tempfile::TempDir;

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-03-10T07:00:00-06:00").unwrap()
    }

    fn facts() -> DailyFacts {
        DailyFacts {
            date: now().date_naive(),
            generated_at: now(),
            weather: "High 60°F, low 40°F".to_string(),
            animal: Animal {
                name: "Aardvark".to_string(),
                image_url: "https://x/a.jpg".to_string(),
            },
            musician: Musician {
                name: "Ada Example".to_string(),
                biography_url: Some("https://x/wiki/Ada_Example".to_string()),
                summary: "Ada Example is a singer who loves jazz.".to_string(),
            },
        }
    }

    fn params() -> ModelParameters {
        ModelParameters {
            model: "test".to_string(),
            temperature: 1.0,
            max_tokens: 1000,
        }
    }

    fn model_reply(date: chrono::NaiveDate) -> String {
        let (previous, next) = navigation_links(date);
        format!(
            r#"Here is your page!

```html
<!DOCTYPE html>
<html><head><style>html {{ padding: 40px; }}</style></head>
<body>
<h1>Sunday, March 10, 2024</h1>
<img src="https://x/a.jpg" alt="Aardvark">
<img id="musician-img" src="MUSICIAN-IMG-REPLACE" alt="Ada Example">
<div id="musician"></div>
<a href="SPOTIFY-LINK-REPLACE" id="link-spotify">Listen to Ada Example on Spotify 🎶</a>
<a href="{previous}">Yesterday</a> <a href="{next}">Tomorrow</a>
</body></html>
```
Have fun!"#
        )
    }

    #[tokio::test]
    async fn test_end_to_end_page() {
        let dir = TempDir::new().unwrap();
        let facts = facts();
        let reply = model_reply(facts.date);
        let api = FakeAsk::replying(vec![reply.as_str()]);

        let result = generate_page(&api, &facts, params()).await.unwrap();
        assert!(result.extracted_markup.is_some());
        let prompt = api.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("archive/2024-03-09.html"));
        assert!(prompt.contains("archive/2024-03-11.html"));

        let profile = ArtistProfile {
            image_url: Some("https://y/b.jpg".to_string()),
            profile_url: Some("https://z".to_string()),
        };
        let splice = bind(&result, &facts, profile);
        assert_eq!(splice.missed, vec![crate::models::Placeholder::BiographyLink]);

        let config = PublishConfig {
            live_page: dir.path().join("index.html"),
            archive_dir: dir.path().join("archive"),
            keying: ArchiveKeying::RunDate,
        };
        publish(&config, &splice.page, facts.date).await.unwrap();

        let live = std::fs::read_to_string(&config.live_page).unwrap();
        assert!(live.contains(r#"src="https://y/b.jpg""#));
        assert!(live.contains(r#"href="https://z""#));
        assert!(live.contains("archive/2024-03-09.html"));
        assert!(live.contains("archive/2024-03-11.html"));
        assert!(!live.contains("REPLACE"));
        assert!(!live.contains("Here is your page"));

        let document = Html::parse_document(&live);
        let musician = document
            .select(&Selector::parse("#musician").unwrap())
            .next()
            .unwrap();
        assert_eq!(
            musician.text().collect::<String>(),
            "Ada Example is a singer who loves jazz."
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("archive/2024-03-10.html")).unwrap(),
            ""
        );
    }

    #[tokio::test]
    async fn test_unfenced_reply_still_produces_a_page() {
        let api = FakeAsk::replying(vec![
            r#"<html><body><img id="musician-img" src="MUSICIAN-IMG-REPLACE"></body></html>"#,
        ]);
        let result = generate_page(&api, &facts(), params()).await.unwrap();
        assert_eq!(result.extracted_markup, None);

        let splice = bind(&result, &facts(), ArtistProfile::default());
        assert!(!splice.page.markup.is_empty());
        assert!(splice.page.markup.contains(r#"src="""#));
    }

    #[tokio::test]
    async fn test_generation_failure_is_fatal() {
        let api = FakeAsk::default();
        let err = generate_page(&api, &facts(), params()).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Generation(GenerationError::EmptyReply)
        ));
    }

    #[tokio::test]
    async fn test_summarize_trims_reply() {
        let api = FakeAsk::replying(vec!["  Ada sings.\n"]);
        let draft = MusicianDraft {
            name: "Ada Example".to_string(),
            biography_url: Some("https://x/ada".to_string()),
            biography_text: "Ada Example (born 1950) is a singer.".to_string(),
        };
        let musician = summarize(&api, draft, params()).await.unwrap();
        assert_eq!(musician.summary, "Ada sings.");
        assert_eq!(musician.biography_url.as_deref(), Some("https://x/ada"));
        assert!(api.prompts.lock().unwrap()[0].contains("Ada Example (born 1950) is a singer."));
    }

    #[tokio::test]
    async fn test_run_requires_model_key() {
        let err = run(&Config::default(), &Secrets::default(), now(), true)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Config(ConfigError::MissingSecret("OPENAI_KEY"))
        ));
    }

    #[test]
    fn test_secrets_are_not_logged() {
        let secrets = Secrets {
            openai_key: Some("sk-secret".to_string()),
            ..Secrets::default()
        };
        assert!(!format!("{secrets:?}").contains("sk-secret"));
    }
}
