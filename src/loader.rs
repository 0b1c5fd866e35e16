//! Input Loading
//!
//! Reads the records produced by the external log scanner:
//!
//! - **Sessions**: a JSON array of [`SessionRecord`] or JSONL, one record per line
//! - **Facets**: the same two file shapes, or a directory of `*.json` files holding one
//!   [`FrictionFacet`] each
//! - **Change events**: a JSON array (or JSONL) of [`ChangeEvent`]
//!
//! Malformed JSONL lines and unreadable facet files are skipped with a warning;
//! a file that cannot be read at all, or a malformed JSON array, is an error.

use crate::models::{ChangeEvent, FrictionFacet, SessionRecord};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use glob::{glob, Pattern};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Load sessions and facets concurrently.
pub async fn load_inputs(
    sessions_path: &Path,
    facets_path: &Path,
) -> Result<(Vec<SessionRecord>, Vec<FrictionFacet>)> {
    futures::try_join!(load_sessions(sessions_path), load_facets(facets_path))
}

pub async fn load_sessions(path: &Path) -> Result<Vec<SessionRecord>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read sessions file: {}", path.display()))?;
    let sessions: Vec<SessionRecord> = parse_records(&content, path)?;
    info!(path = %path.display(), count = sessions.len(), "Loaded sessions");
    Ok(sessions)
}

pub async fn load_facets(path: &Path) -> Result<Vec<FrictionFacet>> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Failed to access facets path: {}", path.display()))?;

    let facets = if metadata.is_dir() {
        load_facet_directory(path).await?
    } else {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read facets file: {}", path.display()))?;
        parse_records(&content, path)?
    };

    info!(path = %path.display(), count = facets.len(), "Loaded facets");
    Ok(facets)
}

pub async fn load_changes(path: &Path) -> Result<Vec<ChangeEvent>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read changes file: {}", path.display()))?;
    parse_records(&content, path)
}

/// Modification time of a tracked file, used as a change instant.
pub fn change_instant_from_file(path: &Path) -> Result<DateTime<Utc>> {
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .with_context(|| format!("Failed to read modification time: {}", path.display()))?;
    Ok(DateTime::<Utc>::from(modified))
}

async fn load_facet_directory(dir: &Path) -> Result<Vec<FrictionFacet>> {
    let pattern = format!("{}/*.json", Pattern::escape(&dir.to_string_lossy()));
    let mut files: Vec<PathBuf> = glob(&pattern)
        .with_context(|| format!("Invalid facets directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .collect();
    files.sort();

    let reads = join_all(files.iter().map(tokio::fs::read_to_string)).await;

    let mut facets = Vec::with_capacity(files.len());
    for (file, content) in files.iter().zip(reads) {
        let parsed = content
            .map_err(anyhow::Error::from)
            .and_then(|c| serde_json::from_str::<FrictionFacet>(&c).map_err(anyhow::Error::from));
        match parsed {
            Ok(facet) => facets.push(facet),
            Err(e) => warn!(file = %file.display(), error = %e, "Skipping unreadable facet file"),
        }
    }

    Ok(facets)
}

/// A JSON array, or JSONL with malformed lines skipped.
fn parse_records<T: DeserializeOwned>(content: &str, source: &Path) -> Result<Vec<T>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed)
            .with_context(|| format!("Failed to parse JSON array: {}", source.display()));
    }

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (line_number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                warn!(
                    file = %source.display(),
                    line = line_number + 1,
                    error = %e,
                    "Skipping malformed line"
                );
            }
        }
    }

    if skipped > 0 {
        debug!(file = %source.display(), skipped, "Malformed lines skipped");
    }

    Ok(records)
}
