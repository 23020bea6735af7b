//! Archive rotation and publishing.
//!
//! A publish does two writes, in order:
//!
//! 1. Whatever currently sits at the live location is copied verbatim to
//!    `archive/<date>.html`. A missing live page (first run) archives an empty
//!    entry. Entries are write-once: if one already exists for that date it
//!    is left untouched. The entry is written to a temporary file first and
//!    linked into place, so a failed write never leaves a truncated entry.
//! 2. The new page replaces the live page through a temporary file and a
//!    rename, so readers never see a half-written page.
//!
//! Either write failing is a [`PublishError`].
//!
//! # Archive keying
//!
//! By default entries are filed under the date of the run doing the rotation
//! ([`ArchiveKeying::RunDate`]), so `archive/D.html` holds the page written on
//! the run before D. A page's previous-day link (`archive/<D-1>.html`)
//! therefore opens the page from two runs back, even on consecutive days.
//! A page stamped by [`stamp`] can instead be filed under the date it was
//! generated for ([`ArchiveKeying::AuthoredDate`]), which makes every entry's
//! name the date its page was written for.

use crate::config::ArchiveKeying;
use crate::error::PublishError;
use crate::models::PublishedPage;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

static GENERATED_FOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<!-- daily-page:generated-for=(\d{4}-\d{2}-\d{2}) -->").unwrap()
});

/// Where pages live. Passed in explicitly; nothing here reads process state.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub live_page: PathBuf,
    pub archive_dir: PathBuf,
    pub keying: ArchiveKeying,
}

/// What a publish did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub archive_path: PathBuf,
    /// `false` when an entry for that date already existed and was kept.
    pub archived: bool,
    pub live_path: PathBuf,
}

/// Append the generated-for marker to a page.
pub fn stamp(page: &PublishedPage, date: NaiveDate) -> String {
    format!(
        "{}\n<!-- daily-page:generated-for={} -->\n",
        page.markup.trim_end(),
        date.format("%Y-%m-%d")
    )
}

/// Date a page was generated for, if it was stamped.
pub fn authored_date(markup: &str) -> Option<NaiveDate> {
    GENERATED_FOR
        .captures(markup)
        .and_then(|caps| NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok())
}

pub fn archive_path(archive_dir: &Path, date: NaiveDate) -> PathBuf {
    archive_dir.join(format!("{}.html", date.format("%Y-%m-%d")))
}

/// Rotate the live page into the archive, then publish `page` for `today`.
#[instrument(level = "info", skip(config, page), fields(live = %config.live_page.display()))]
pub async fn publish(
    config: &PublishConfig,
    page: &PublishedPage,
    today: NaiveDate,
) -> Result<PublishReport, PublishError> {
    let previous = match fs::read(&config.live_page).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No live page yet; archiving an empty entry");
            Vec::new()
        }
        Err(error) => {
            return Err(PublishError::ReadLive {
                path: config.live_page.clone(),
                error,
            });
        }
    };

    let key = match config.keying {
        ArchiveKeying::RunDate => today,
        ArchiveKeying::AuthoredDate => authored_date(&String::from_utf8_lossy(&previous))
            .unwrap_or_else(|| {
                warn!("Previous page carries no generated-for marker; filing under the run date");
                today
            }),
    };
    let archive_path = archive_path(&config.archive_dir, key);
    let archived = write_once(&archive_path, &previous)
        .await
        .map_err(|error| PublishError::WriteArchive {
            path: archive_path.clone(),
            error,
        })?;
    if archived {
        info!(path = %archive_path.display(), bytes = previous.len(), "Archived previous page");
    } else {
        warn!(path = %archive_path.display(), "Archive entry already exists; kept as is");
    }

    replace_atomically(&config.live_page, stamp(page, today).as_bytes())
        .await
        .map_err(|error| PublishError::WriteLive {
            path: config.live_page.clone(),
            error,
        })?;
    info!(path = %config.live_page.display(), "Published live page");

    Ok(PublishReport {
        archive_path,
        archived,
        live_path: config.live_page.clone(),
    })
}

/// Create `path` with `contents` unless it exists. Returns whether it wrote.
///
/// The contents go to a temporary file which is then hard-linked to `path`.
/// The link fails if `path` appeared in the meantime, and `path` only ever
/// names a complete entry.
async fn write_once(path: &Path, contents: &[u8]) -> std::io::Result<bool> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).await?;
    }
    if fs::try_exists(path).await? {
        return Ok(false);
    }

    let tmp = temp_path(path);
    if let Err(e) = write_synced(&tmp, contents).await {
        discard(&tmp).await;
        return Err(e);
    }
    let linked = fs::hard_link(&tmp, path).await;
    discard(&tmp).await;
    match linked {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}

async fn replace_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).await?;
    }
    let tmp = temp_path(path);
    write_synced(&tmp, contents).await?;
    fs::rename(&tmp, path).await
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

async fn write_synced(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await
}

async fn discard(tmp: &Path) {
    match fs::remove_file(tmp).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %tmp.display(), error = %e, "Could not remove temporary file"),
    }
}
