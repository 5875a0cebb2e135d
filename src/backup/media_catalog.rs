//! Resolution of chat-store media rows to content hashes.
//!
//! The chat store writes media paths both as `/Media/...` and as bare
//! `Media/...`; both live under the manifest's `Message/` namespace. The two
//! branches of [`lookup_key`] are kept separate on purpose and must not be
//! folded into a single normalisation.

use crate::backup::path_index::PathIndex;
use crate::backup::store::optional_text;
use crate::backup::warn::{self, RowSkip};
use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

const MESSAGE_NAMESPACE: &str = "Message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRow {
    pub id: i64,
    pub local_path: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaDescriptor {
    pub media_id: i64,
    /// Empty when the manifest has no entry for the path.
    pub hash: String,
    pub extension: String,
    pub title: String,
}

impl MediaDescriptor {
    pub fn is_resolved(&self) -> bool {
        !self.hash.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MediaCatalog {
    by_id: HashMap<i64, MediaDescriptor>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub descriptors: usize,
    pub resolved: usize,
    pub unresolved: usize,
}

pub fn lookup_key(local_path: &str) -> String {
    if local_path.starts_with('/') {
        format!("{MESSAGE_NAMESPACE}{local_path}")
    } else {
        format!("{MESSAGE_NAMESPACE}/{local_path}")
    }
}

/// Extension of the path as written, dot included; empty without one.
pub fn extension_of(local_path: &str) -> String {
    Path::new(local_path)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

impl MediaCatalog {
    pub fn build<I>(rows: I, index: &PathIndex) -> Self
    where
        I: IntoIterator<Item = MediaRow>,
    {
        let mut by_id = HashMap::new();
        for row in rows {
            let Some(local_path) = row.local_path else {
                continue;
            };
            let hash = index
                .lookup(&lookup_key(&local_path))
                .unwrap_or_default()
                .to_string();
            by_id.insert(
                row.id,
                MediaDescriptor {
                    media_id: row.id,
                    hash,
                    extension: extension_of(&local_path),
                    title: row.title.unwrap_or_default(),
                },
            );
        }
        Self { by_id }
    }

    pub fn get(&self, media_id: i64) -> Option<&MediaDescriptor> {
        self.by_id.get(&media_id)
    }

    pub fn stats(&self) -> CatalogStats {
        let resolved = self.by_id.values().filter(|d| d.is_resolved()).count();
        CatalogStats {
            descriptors: self.by_id.len(),
            resolved,
            unresolved: self.by_id.len() - resolved,
        }
    }
}

pub fn load_media_rows(chat: &Connection) -> Result<Vec<MediaRow>> {
    let mut stmt = chat
        .prepare("SELECT Z_PK, ZMEDIALOCALPATH, ZTITLE FROM ZWAMEDIAITEM")
        .context("failed to prepare media scan")?;
    let mut rows = stmt.query([]).context("failed to scan media items")?;

    let mut out = Vec::new();
    let mut idx = 0usize;
    while let Some(row) = rows.next().context("failed to read media row")? {
        idx += 1;
        let parsed = (|| -> rusqlite::Result<MediaRow> {
            Ok(MediaRow {
                id: row.get(0)?,
                local_path: optional_text(row, 1)?,
                title: optional_text(row, 2)?,
            })
        })();
        match parsed {
            Ok(media) => out.push(media),
            Err(err) => warn::row_skipped(RowSkip {
                code: "MEDIA_ROW_INVALID",
                stage: "media-catalog",
                session: None,
                row: idx,
                reason: "unreadable-columns",
                err: &err.to_string(),
            }),
        }
    }
    Ok(out)
}

pub fn load(chat: &Connection, index: &PathIndex) -> Result<MediaCatalog> {
    let rows = load_media_rows(chat)?;
    let scanned = rows.len();
    let catalog = MediaCatalog::build(rows, index);
    let stats = catalog.stats();
    tracing::info!(
        scanned,
        descriptors = stats.descriptors,
        resolved = stats.resolved,
        unresolved = stats.unresolved,
        "media catalog built"
    );
    Ok(catalog)
}
