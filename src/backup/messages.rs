use crate::backup::content_store::ContentStore;
use crate::backup::media_catalog::MediaCatalog;
use crate::backup::paths::ExportPaths;
use crate::backup::sessions::Session;
use crate::backup::store::optional_text;
use crate::backup::timestamp;
use crate::backup::warn::{self, RowSkip};
use anyhow::{Context, Result};
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Message {
    /// `None` for messages sent from the device owner.
    pub sender_key: Option<String>,
    pub sender_name: String,
    pub text: String,
    pub media_relative_path: String,
    pub media_extension: String,
    pub timestamp: String,
    pub is_group: bool,
}

impl Message {
    pub fn is_incoming(&self) -> bool {
        self.sender_key.is_some()
    }
}

/// A message row with nullable columns already decoded.
#[derive(Debug, Clone, Default)]
struct RawMessage {
    from_jid: Option<String>,
    push_name: Option<String>,
    text: Option<String>,
    media_id: Option<i64>,
    timestamp: Option<String>,
    has_group_member: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveStats {
    pub messages: usize,
    pub skipped_rows: usize,
    pub media_copied: usize,
    pub media_reused: usize,
    pub media_unresolved: usize,
}

#[derive(Debug)]
pub struct SessionMessages {
    pub messages: Vec<Message>,
    pub stats: ResolveStats,
}

pub struct MessageResolver<'a> {
    chat: &'a Connection,
    catalog: &'a MediaCatalog,
    content: &'a ContentStore,
    paths: &'a ExportPaths,
}

fn media_relative_path(session_id: i64, file_name: &str) -> String {
    format!("media/{session_id}/{file_name}")
}

impl<'a> MessageResolver<'a> {
    pub fn new(
        chat: &'a Connection,
        catalog: &'a MediaCatalog,
        content: &'a ContentStore,
        paths: &'a ExportPaths,
    ) -> Self {
        Self {
            chat,
            catalog,
            content,
            paths,
        }
    }

    /// Messages of one session in conversation order, media materialized.
    pub fn resolve(&self, session: &Session) -> Result<SessionMessages> {
        let media_dir = self.paths.session_media_dir(session.id);
        fs::create_dir_all(&media_dir)
            .with_context(|| format!("failed to create {}", media_dir.display()))?;

        let mut stmt = self
            .chat
            .prepare(
                "SELECT ZFROMJID, ZPUSHNAME, ZTEXT, ZMEDIAITEM, ZMESSAGEDATE, ZGROUPMEMBER
                 FROM ZWAMESSAGE
                 WHERE ZCHATSESSION = ?1
                 ORDER BY ZSORT",
            )
            .context("failed to prepare message scan")?;
        let mut rows = stmt
            .query([session.id])
            .with_context(|| format!("failed to scan messages of session {}", session.id))?;

        let mut stats = ResolveStats::default();
        let mut messages = Vec::new();
        let mut idx = 0usize;
        while let Some(row) = rows.next().context("failed to read message row")? {
            idx += 1;
            let parsed = (|| -> rusqlite::Result<RawMessage> {
                Ok(RawMessage {
                    from_jid: optional_text(row, 0)?,
                    push_name: optional_text(row, 1)?,
                    text: optional_text(row, 2)?,
                    media_id: row.get(3)?,
                    timestamp: timestamp::convert(row.get_ref(4)?),
                    has_group_member: !matches!(row.get_ref(5)?, ValueRef::Null),
                })
            })();
            let raw = match parsed {
                Ok(raw) => raw,
                Err(err) => {
                    stats.skipped_rows += 1;
                    warn::row_skipped(RowSkip {
                        code: "MESSAGE_ROW_INVALID",
                        stage: "messages",
                        session: Some(session.id),
                        row: idx,
                        reason: "unreadable-columns",
                        err: &err.to_string(),
                    });
                    continue;
                }
            };
            messages.push(self.resolve_one(session.id, &media_dir, raw, &mut stats)?);
        }

        stats.messages = messages.len();
        tracing::info!(
            session = session.id,
            messages = stats.messages,
            skipped = stats.skipped_rows,
            media_copied = stats.media_copied,
            media_reused = stats.media_reused,
            media_unresolved = stats.media_unresolved,
            "session resolved"
        );
        Ok(SessionMessages { messages, stats })
    }

    fn resolve_one(
        &self,
        session_id: i64,
        media_dir: &Path,
        raw: RawMessage,
        stats: &mut ResolveStats,
    ) -> Result<Message> {
        let mut msg = Message {
            sender_key: raw.from_jid,
            sender_name: raw.push_name.unwrap_or_default(),
            text: raw.text.unwrap_or_default(),
            timestamp: raw.timestamp.unwrap_or_default(),
            is_group: raw.has_group_member,
            ..Message::default()
        };

        let Some(media_id) = raw.media_id else {
            return Ok(msg);
        };
        let descriptor = match self.catalog.get(media_id) {
            Some(descriptor) if descriptor.is_resolved() => descriptor,
            _ => {
                // Contact cards and locations carry a media row without a file.
                stats.media_unresolved += 1;
                tracing::debug!(session = session_id, media_id, "media not resolved");
                return Ok(msg);
            }
        };

        let out = self.content.materialize(
            &descriptor.hash,
            &descriptor.extension,
            media_dir,
            media_id,
        )?;
        if out.copied {
            stats.media_copied += 1;
            tracing::debug!(session = session_id, media_id, path = %out.dest_path.display(), "media copied");
        } else {
            stats.media_reused += 1;
        }

        msg.media_relative_path = media_relative_path(session_id, &out.file_name);
        msg.media_extension = descriptor.extension.clone();
        msg.text = descriptor.title.clone();
        Ok(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::fixtures::{FixtureBackup, MessageRow};
    use crate::backup::media_catalog::{self, MediaCatalog};
    use crate::backup::path_index;
    use rusqlite::types::Value;
    use tempfile::tempdir;

    struct Harness {
        _tmp: tempfile::TempDir,
        backup: FixtureBackup,
        paths: ExportPaths,
    }

    fn harness() -> Harness {
        let tmp = tempdir().expect("tempdir");
        let backup = FixtureBackup::new(tmp.path());
        let paths = ExportPaths::new(&backup.src, &tmp.path().join("dst"));
        Harness {
            _tmp: tmp,
            backup,
            paths,
        }
    }

    fn session(id: i64) -> Session {
        Session {
            id,
            conversation_key: format!("{id}@s.whatsapp.net"),
            display_name: format!("chat {id}"),
        }
    }

    fn catalog_for(h: &Harness) -> MediaCatalog {
        let index = path_index::load(&h.backup.manifest).expect("index");
        media_catalog::load(&h.backup.chat, &index).expect("catalog")
    }

    #[test]
    fn photo_message_is_materialized() {
        let h = harness();
        h.backup.add_file("ab12", "Message/Media/photo.jpg", b"\xff\xd8jpeg");
        h.backup.add_session(1, "1@s.whatsapp.net", Some("Alice"), 1.0);
        h.backup.add_media(5, Some("Media/photo.jpg"), None);
        h.backup.add_message(MessageRow {
            media_id: Some(5),
            text: Some("ignored caption"),
            ..MessageRow::text(1, 1, "")
        });

        let catalog = catalog_for(&h);
        let content = ContentStore::new(&h.paths.src_dir);
        let resolver = MessageResolver::new(&h.backup.chat, &catalog, &content, &h.paths);
        let out = resolver.resolve(&session(1)).expect("resolve");

        assert_eq!(out.messages.len(), 1);
        let msg = &out.messages[0];
        assert_eq!(msg.media_extension, ".jpg");
        assert_eq!(msg.media_relative_path, "media/1/5.jpg");
        assert_eq!(msg.text, "");
        let copied = h.paths.dst_dir.join("media/1/5.jpg");
        assert_eq!(
            fs::read(copied).expect("read copy"),
            fs::read(h.backup.src.join("ab/ab12")).expect("read source")
        );
        assert_eq!(out.stats.media_copied, 1);

        let again = resolver.resolve(&session(1)).expect("second resolve");
        assert_eq!(again.stats.media_copied, 0);
        assert_eq!(again.stats.media_reused, 1);
        assert_eq!(again.messages, out.messages);
    }

    #[test]
    fn media_title_replaces_text() {
        let h = harness();
        h.backup.add_file("cd34", "Message/Media/clip.mp4", b"mp4");
        h.backup.add_media(8, Some("/Media/clip.mp4"), Some("Birthday"));
        h.backup.add_message(MessageRow {
            media_id: Some(8),
            ..MessageRow::text(2, 1, "original")
        });

        let catalog = catalog_for(&h);
        let content = ContentStore::new(&h.paths.src_dir);
        let resolver = MessageResolver::new(&h.backup.chat, &catalog, &content, &h.paths);
        let out = resolver.resolve(&session(2)).expect("resolve");

        assert_eq!(out.messages[0].text, "Birthday");
        assert_eq!(out.messages[0].media_relative_path, "media/2/8.mp4");
    }

    #[test]
    fn unresolved_media_keeps_text() {
        let h = harness();
        h.backup.add_media(9, Some("Media/contact.vcf"), Some("Bob"));
        h.backup.add_message(MessageRow {
            media_id: Some(9),
            ..MessageRow::text(3, 1, "BEGIN:VCARD")
        });
        h.backup.add_message(MessageRow {
            media_id: Some(404),
            ..MessageRow::text(3, 2, "no such media")
        });

        let catalog = catalog_for(&h);
        let content = ContentStore::new(&h.paths.src_dir);
        let resolver = MessageResolver::new(&h.backup.chat, &catalog, &content, &h.paths);
        let out = resolver.resolve(&session(3)).expect("resolve");

        assert_eq!(out.messages.len(), 2);
        assert_eq!(out.messages[0].text, "BEGIN:VCARD");
        assert_eq!(out.messages[0].media_relative_path, "");
        assert_eq!(out.messages[0].media_extension, "");
        assert_eq!(out.messages[1].text, "no such media");
        assert_eq!(out.stats.media_unresolved, 2);
    }

    #[test]
    fn fields_are_normalised() {
        let h = harness();
        h.backup.add_message(MessageRow {
            from_jid: Some("777@s.whatsapp.net"),
            push_name: Some("Carol"),
            date: Value::Text("2020-01-01T00:00:00Z".to_string()),
            group_member: Some(12),
            ..MessageRow::text(4, 2, "second")
        });
        h.backup.add_message(MessageRow {
            text: None,
            date: Value::Text("not a date".to_string()),
            ..MessageRow::text(4, 1, "")
        });

        let catalog = catalog_for(&h);
        let content = ContentStore::new(&h.paths.src_dir);
        let resolver = MessageResolver::new(&h.backup.chat, &catalog, &content, &h.paths);
        let out = resolver.resolve(&session(4)).expect("resolve");

        let first = &out.messages[0];
        assert!(!first.is_incoming());
        assert_eq!(first.text, "");
        assert_eq!(first.sender_name, "");
        assert_eq!(first.timestamp, "");
        assert!(!first.is_group);

        let second = &out.messages[1];
        assert!(second.is_incoming());
        assert_eq!(second.sender_key.as_deref(), Some("777@s.whatsapp.net"));
        assert_eq!(second.sender_name, "Carol");
        assert_eq!(second.timestamp, "2051-01-01T00:00:00Z");
        assert!(second.is_group);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let h = harness();
        h.backup.add_message(MessageRow::text(5, 1, "fine"));
        h.backup
            .chat
            .execute(
                "INSERT INTO ZWAMESSAGE (ZCHATSESSION, ZSORT, ZTEXT, ZMEDIAITEM) VALUES (5, 2, 'bad', 'x')",
                [],
            )
            .expect("insert malformed");
        h.backup.add_message(MessageRow::text(5, 3, "also fine"));

        let catalog = catalog_for(&h);
        let content = ContentStore::new(&h.paths.src_dir);
        let resolver = MessageResolver::new(&h.backup.chat, &catalog, &content, &h.paths);
        let out = resolver.resolve(&session(5)).expect("resolve");

        let texts: Vec<&str> = out.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["fine", "also fine"]);
        assert_eq!(out.stats.skipped_rows, 1);
    }

    #[test]
    fn missing_content_aborts_the_session() {
        let h = harness();
        h.backup
            .add_manifest_row("dead01", "AppDomainGroup-group.net.whatsapp.WhatsApp.shared", "Message/Media/lost.jpg");
        h.backup.add_media(11, Some("Media/lost.jpg"), None);
        h.backup.add_message(MessageRow {
            media_id: Some(11),
            ..MessageRow::text(6, 1, "")
        });

        let catalog = catalog_for(&h);
        let content = ContentStore::new(&h.paths.src_dir);
        let resolver = MessageResolver::new(&h.backup.chat, &catalog, &content, &h.paths);
        assert!(resolver.resolve(&session(6)).is_err());
    }

    #[test]
    fn media_directory_failure_is_fatal() {
        let h = harness();
        h.backup.add_message(MessageRow::text(7, 1, "hello"));
        fs::create_dir_all(&h.paths.dst_dir).expect("mkdir dst");
        fs::write(h.paths.dst_dir.join("media"), b"not a directory").expect("block media dir");

        let catalog = catalog_for(&h);
        let content = ContentStore::new(&h.paths.src_dir);
        let resolver = MessageResolver::new(&h.backup.chat, &catalog, &content, &h.paths);
        let err = resolver.resolve(&session(7)).expect_err("media dir blocked");
        assert!(format!("{err:#}").contains("failed to create"));
    }
}
