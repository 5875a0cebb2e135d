use crate::backup::path_index::PathIndex;
use crate::backup::store::{optional_text, table_exists};
use crate::backup::warn::{self, RowSkip};
use anyhow::{Context, Result};
use rusqlite::Connection;
use std::collections::BTreeMap;

const PROFILE_TABLE: &str = "ZWAPROFILEPICTUREITEM";

/// Contact key to profile-picture hash. Profile paths are manifest paths
/// verbatim, without the `Message/` prefix media rows need. Read-only
/// diagnostics; nothing is materialized from it.
#[derive(Debug, Clone, Default)]
pub struct ProfilePictureCatalog {
    by_jid: BTreeMap<String, String>,
    unresolved: usize,
}

impl ProfilePictureCatalog {
    pub fn build<I>(rows: I, index: &PathIndex) -> Self
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        let mut out = Self::default();
        for (jid, path) in rows {
            let Some(path) = path else {
                continue;
            };
            match index.lookup(&path) {
                Some(hash) => {
                    out.by_jid.insert(jid, hash.to_string());
                }
                None => out.unresolved += 1,
            }
        }
        out
    }

    pub fn hash_for(&self, jid: &str) -> Option<&str> {
        self.by_jid.get(jid).map(String::as_str)
    }

    pub fn resolved(&self) -> usize {
        self.by_jid.len()
    }

    pub fn unresolved(&self) -> usize {
        self.unresolved
    }
}

pub fn load(chat: &Connection, index: &PathIndex) -> Result<ProfilePictureCatalog> {
    if !table_exists(chat, PROFILE_TABLE)? {
        tracing::debug!("chat store has no profile picture table");
        return Ok(ProfilePictureCatalog::default());
    }

    let mut stmt = chat
        .prepare("SELECT ZJID, ZPATH FROM ZWAPROFILEPICTUREITEM")
        .context("failed to prepare profile picture scan")?;
    let mut rows = stmt.query([]).context("failed to scan profile pictures")?;

    let mut pairs = Vec::new();
    let mut idx = 0usize;
    while let Some(row) = rows.next().context("failed to read profile picture row")? {
        idx += 1;
        match optional_text(row, 0).and_then(|jid| Ok((jid, optional_text(row, 1)?))) {
            Ok((Some(jid), path)) => pairs.push((jid, path)),
            Ok((None, _)) => {}
            Err(err) => warn::row_skipped(RowSkip {
                code: "PROFILE_ROW_INVALID",
                stage: "profile-pictures",
                session: None,
                row: idx,
                reason: "unreadable-columns",
                err: &err.to_string(),
            }),
        }
    }

    Ok(ProfilePictureCatalog::build(pairs, index))
}
