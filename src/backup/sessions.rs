use crate::backup::store::optional_text;
use crate::backup::warn::{self, RowSkip};
use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: i64,
    pub conversation_key: String,
    pub display_name: String,
}

pub fn is_status_session(conversation_key: &str, status_suffix: &str) -> bool {
    conversation_key.ends_with(status_suffix)
}

/// All chat sessions, most recent first, without status pseudo-sessions.
pub fn list(chat: &Connection, status_suffix: &str) -> Result<Vec<Session>> {
    let mut stmt = chat
        .prepare(
            "SELECT Z_PK, ZCONTACTJID, ZPARTNERNAME
             FROM ZWACHATSESSION
             ORDER BY ZLASTMESSAGEDATE DESC",
        )
        .context("failed to prepare session scan")?;
    let mut rows = stmt.query([]).context("failed to scan chat sessions")?;

    let mut out = Vec::new();
    let mut idx = 0usize;
    while let Some(row) = rows.next().context("failed to read session row")? {
        idx += 1;
        let parsed = (|| -> rusqlite::Result<(i64, Option<String>, Option<String>)> {
            Ok((row.get(0)?, optional_text(row, 1)?, optional_text(row, 2)?))
        })();
        let (id, key, name) = match parsed {
            Ok(parsed) => parsed,
            Err(err) => {
                warn::row_skipped(RowSkip {
                    code: "SESSION_ROW_INVALID",
                    stage: "sessions",
                    session: None,
                    row: idx,
                    reason: "unreadable-columns",
                    err: &err.to_string(),
                });
                continue;
            }
        };

        let conversation_key = key.unwrap_or_default();
        if is_status_session(&conversation_key, status_suffix) {
            continue;
        }
        let display_name = match name {
            Some(name) if !name.trim().is_empty() => name,
            _ => conversation_key.clone(),
        };
        out.push(Session {
            id,
            conversation_key,
            display_name,
        });
    }

    tracing::info!(sessions = out.len(), "chat sessions enumerated");
    Ok(out)
}
