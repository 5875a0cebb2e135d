//! Staging and opening of the two relational stores.
//!
//! Both databases are copied into the destination directory once and
//! opened from there, so the backup itself is never touched. The copies
//! are opened without `CREATE` and only ever read.

use crate::backup::config::StoreConfig;
use crate::backup::content_store::{ContentStore, copy_if_absent};
use crate::backup::paths::ExportPaths;
use crate::error::ExportError;
use anyhow::{Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row};
use std::fs;
use std::path::Path;

pub struct BackupStores {
    pub manifest: Connection,
    pub chat: Connection,
    pub manifest_copied: bool,
    pub chat_copied: bool,
}

pub fn open_staged(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("failed to open database {}", path.display()))?;
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
        row.get::<_, i64>(0)
    })
    .with_context(|| format!("database {} is not readable", path.display()))?;
    Ok(conn)
}

/// Content hash of the chat store as listed in the manifest.
pub fn chat_store_hash(manifest: &Connection, cfg: &StoreConfig) -> Result<String> {
    let hash = manifest
        .query_row(
            "SELECT fileID FROM Files WHERE relativePath = ?1 AND domain = ?2",
            [&cfg.chat_relative_path, &cfg.chat_domain],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .context("failed to query manifest for the chat store")?;

    hash.ok_or_else(|| {
        ExportError::ChatStoreNotFound {
            relative_path: cfg.chat_relative_path.clone(),
            domain: cfg.chat_domain.clone(),
        }
        .into()
    })
}

/// Copies the manifest and the chat store into the destination if they
/// are not there yet, then opens both copies.
pub fn stage(paths: &ExportPaths, content: &ContentStore, cfg: &StoreConfig) -> Result<BackupStores> {
    fs::create_dir_all(&paths.dst_dir)
        .with_context(|| format!("failed to create {}", paths.dst_dir.display()))?;

    let manifest_copied = copy_if_absent(&paths.source_manifest_db, &paths.manifest_db)
        .context("failed to stage manifest database")?;
    let manifest = open_staged(&paths.manifest_db)?;

    let chat_copied = if paths.chat_db.exists() {
        false
    } else {
        let hash = chat_store_hash(&manifest, cfg)?;
        copy_if_absent(&content.locate(&hash), &paths.chat_db)
            .context("failed to stage chat database")?
    };
    let chat = open_staged(&paths.chat_db)?;

    tracing::info!(
        manifest = %paths.manifest_db.display(),
        chat = %paths.chat_db.display(),
        manifest_copied,
        chat_copied,
        "databases staged"
    );

    Ok(BackupStores {
        manifest,
        chat,
        manifest_copied,
        chat_copied,
    })
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |_| Ok(()),
        )
        .optional()
        .with_context(|| format!("failed to look up table {table}"))?;
    Ok(found.is_some())
}

/// Reads a nullable text column. Blobs are decoded lossily since the chat
/// store keeps some names as raw bytes; numbers are an error.
pub fn optional_text(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    match row.get_ref(idx)? {
        ValueRef::Null => Ok(None),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Ok(Some(String::from_utf8_lossy(bytes).into_owned()))
        }
        other => Err(rusqlite::Error::InvalidColumnType(
            idx,
            format!("column {idx}"),
            other.data_type(),
        )),
    }
}
