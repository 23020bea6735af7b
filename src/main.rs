//! # Daily Fun Page
//!
//! Builds a "fun facts of the day" HTML page for elementary students from
//! several unrelated sources and keeps a dated archive of previous pages.
//!
//! ## Usage
//!
//! ```sh
//! OPENAI_KEY=... OPENWEATHER_KEY=... SPOTIFY_KEY=... daily_fun_page -s ./site
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Extraction**: animal of the day, weather and a musician born today,
//!    fetched concurrently
//! 2. **Aggregation**: the facts are collected into one immutable record
//! 3. **Generation**: a prompt is composed and the LLM writes the page
//! 4. **Splicing**: values only known after generation (artist image, links,
//!    biography) are bound into the markup by element id
//! 5. **Publishing**: the current page is archived under its date and the new
//!    page replaces it

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod facts;
mod models;
mod outputs;
mod pipeline;
mod prompts;
mod scrapers;
mod splice;
mod utils;

use cli::Cli;
use config::Config;
use pipeline::{RunOutcome, Secrets};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("daily_fun_page starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.site_dir, dry_run = args.dry_run, "Parsed CLI arguments");

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(site_dir) = args.site_dir {
        config.site_dir = site_dir;
    }

    // Early check: fail before any network call if the site is not writable
    if !args.dry_run {
        if let Err(e) = ensure_writable_dir(&config.archive_dir()).await {
            error!(
                path = %config.archive_dir().display(),
                error = %e,
                "Archive directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    let secrets = Secrets {
        openai_key: args.openai_key,
        openweather_key: args.openweather_key,
        spotify_key: args.spotify_key,
    };
    let now = Local::now().fixed_offset();

    let outcome = match pipeline::run(&config, &secrets, now, args.dry_run).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Run failed; nothing was published");
            return Err(e.into());
        }
    };

    match outcome {
        RunOutcome::Published { report, splice } => {
            if !splice.missed.is_empty() {
                warn!(missed = ?splice.missed, "Published with unbound placeholders");
            }
            info!(
                live = %report.live_path.display(),
                archive = %report.archive_path.display(),
                archived = report.archived,
                "Published today's page"
            );
        }
        RunOutcome::DryRun { splice } => {
            println!("{}", splice.page.markup);
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}
