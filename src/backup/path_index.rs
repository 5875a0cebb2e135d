use crate::backup::store::optional_text;
use crate::backup::warn::{self, RowSkip};
use anyhow::{Context, Result};
use rusqlite::Connection;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalFileRecord {
    pub hash: String,
    pub logical_path: String,
}

/// Manifest paths mapped to content hashes, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct PathIndex {
    by_path: HashMap<String, String>,
}

impl PathIndex {
    /// Later records win when a logical path repeats.
    pub fn build<I>(records: I) -> Self
    where
        I: IntoIterator<Item = LogicalFileRecord>,
    {
        let mut by_path = HashMap::new();
        for record in records {
            by_path.insert(record.logical_path, record.hash);
        }
        Self { by_path }
    }

    pub fn lookup(&self, candidate: &str) -> Option<&str> {
        self.by_path.get(candidate).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

/// Every `(fileID, relativePath)` pair of the manifest, in table order.
/// Rows missing either column are skipped.
pub fn load_manifest_records(manifest: &Connection) -> Result<Vec<LogicalFileRecord>> {
    let mut stmt = manifest
        .prepare("SELECT fileID, relativePath FROM Files")
        .context("failed to prepare manifest scan")?;
    let mut rows = stmt.query([]).context("failed to scan manifest")?;

    let mut out = Vec::new();
    let mut idx = 0usize;
    while let Some(row) = rows.next().context("failed to read manifest row")? {
        idx += 1;
        let parsed = optional_text(row, 0).and_then(|hash| Ok((hash, optional_text(row, 1)?)));
        match parsed {
            Ok((Some(hash), Some(logical_path))) => out.push(LogicalFileRecord { hash, logical_path }),
            Ok(_) => {
                tracing::debug!(row = idx, "manifest row without hash or path");
            }
            Err(err) => warn::row_skipped(RowSkip {
                code: "MANIFEST_ROW_INVALID",
                stage: "path-index",
                session: None,
                row: idx,
                reason: "unreadable-columns",
                err: &err.to_string(),
            }),
        }
    }
    Ok(out)
}

pub fn load(manifest: &Connection) -> Result<PathIndex> {
    let records = load_manifest_records(manifest)?;
    let index = PathIndex::build(records);
    tracing::info!(entries = index.len(), "path index loaded");
    Ok(index)
}
