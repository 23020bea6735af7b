//! Command-line interface definitions.
//!
//! Secrets can be passed as flags but are normally read from the
//! environment.

use clap::Parser;
use std::path::PathBuf;

/// Build today's fun-facts page and rotate yesterday's into the archive.
///
/// # Examples
///
/// ```sh
/// # Defaults, publishing into the current directory
/// daily_fun_page
///
/// # Custom config and output directory
/// daily_fun_page -c ./config.yaml -s /var/www/fun
///
/// # Print the page without touching the site
/// daily_fun_page --dry-run
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding index.html and archive/ (overrides the config file)
    #[arg(short, long)]
    pub site_dir: Option<PathBuf>,

    /// Build the page and print it instead of publishing
    #[arg(long)]
    pub dry_run: bool,

    /// Chat completions API key
    #[arg(long, env = "OPENAI_KEY", hide_env_values = true)]
    pub openai_key: Option<String>,

    /// Weather API key
    #[arg(long, env = "OPENWEATHER_KEY", hide_env_values = true)]
    pub openweather_key: Option<String>,

    /// Base64 `client_id:client_secret` for the artist search
    #[arg(long, env = "SPOTIFY_KEY", hide_env_values = true)]
    pub spotify_key: Option<String>,
}
