//! Test-only builders for a miniature backup: a manifest, a chat store and
//! a content-addressed file tree.

use crate::backup::config::{DEFAULT_CHAT_DOMAIN, DEFAULT_CHAT_RELATIVE_PATH};
use rusqlite::types::Value;
use rusqlite::{Connection, params};
use std::fs;
use std::path::{Path, PathBuf};

pub const CHAT_STORE_HASH: &str = "7c7fba66680ef796b916b067077cc246adacf01d";
pub const MEDIA_DOMAIN: &str = "AppDomainGroup-group.net.whatsapp.WhatsApp.shared";

/// Schema SQL shared with the integration tests under `tests/common`.
const MANIFEST_SCHEMA: &str = include_str!("../../tests/common/manifest_schema.sql");
const CHAT_SCHEMA: &str = include_str!("../../tests/common/chat_schema.sql");

pub fn create_manifest_schema(conn: &Connection) {
    conn.execute_batch(MANIFEST_SCHEMA)
        .expect("create manifest schema");
}

pub fn create_chat_schema(conn: &Connection) {
    conn.execute_batch(CHAT_SCHEMA).expect("create chat schema");
}

/// One message row as the fixture inserts it.
#[derive(Debug, Clone)]
pub struct MessageRow {
    pub session: i64,
    pub sort: i64,
    pub from_jid: Option<&'static str>,
    pub push_name: Option<&'static str>,
    pub text: Option<&'static str>,
    pub media_id: Option<i64>,
    pub date: Value,
    pub group_member: Option<i64>,
}

impl MessageRow {
    pub fn text(session: i64, sort: i64, text: &'static str) -> Self {
        Self {
            session,
            sort,
            from_jid: None,
            push_name: None,
            text: Some(text),
            media_id: None,
            date: Value::Null,
            group_member: None,
        }
    }
}

pub struct FixtureBackup {
    pub src: PathBuf,
    pub manifest: Connection,
    pub chat: Connection,
    chat_path: PathBuf,
}

impl FixtureBackup {
    pub fn new(root: &Path) -> Self {
        let src = root.join("src");
        fs::create_dir_all(&src).expect("mkdir src");
        let manifest = Connection::open(src.join("Manifest.db")).expect("open manifest");
        create_manifest_schema(&manifest);
        let chat_path = root.join("chat-build.sqlite");
        let chat = Connection::open(&chat_path).expect("open chat");
        create_chat_schema(&chat);
        Self {
            src,
            manifest,
            chat,
            chat_path,
        }
    }

    pub fn add_manifest_row(&self, hash: &str, domain: &str, relative_path: &str) {
        self.manifest
            .execute(
                "INSERT INTO Files (fileID, domain, relativePath, flags) VALUES (?1, ?2, ?3, 1)",
                params![hash, domain, relative_path],
            )
            .expect("insert manifest row");
    }

    pub fn add_file(&self, hash: &str, relative_path: &str, bytes: &[u8]) {
        let shard = self.src.join(&hash[..2]);
        fs::create_dir_all(&shard).expect("mkdir shard");
        fs::write(shard.join(hash), bytes).expect("write content");
        self.add_manifest_row(hash, MEDIA_DOMAIN, relative_path);
    }

    pub fn add_session(&self, id: i64, jid: &str, name: Option<&str>, last_message: f64) {
        self.chat
            .execute(
                "INSERT INTO ZWACHATSESSION (Z_PK, ZCONTACTJID, ZPARTNERNAME, ZLASTMESSAGEDATE)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, jid, name, last_message],
            )
            .expect("insert session");
    }

    pub fn add_media(&self, id: i64, local_path: Option<&str>, title: Option<&str>) {
        self.chat
            .execute(
                "INSERT INTO ZWAMEDIAITEM (Z_PK, ZMEDIALOCALPATH, ZTITLE) VALUES (?1, ?2, ?3)",
                params![id, local_path, title],
            )
            .expect("insert media");
    }

    pub fn add_message(&self, row: MessageRow) {
        self.chat
            .execute(
                "INSERT INTO ZWAMESSAGE
                    (ZCHATSESSION, ZSORT, ZFROMJID, ZPUSHNAME, ZTEXT, ZMEDIAITEM, ZMESSAGEDATE, ZGROUPMEMBER)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    row.session,
                    row.sort,
                    row.from_jid,
                    row.push_name,
                    row.text,
                    row.media_id,
                    row.date,
                    row.group_member
                ],
            )
            .expect("insert message");
    }

    pub fn add_profile_picture(&self, jid: &str, path: Option<&str>) {
        self.chat
            .execute(
                "INSERT INTO ZWAPROFILEPICTUREITEM (ZJID, ZPATH) VALUES (?1, ?2)",
                params![jid, path],
            )
            .expect("insert profile picture");
    }

    /// Places the chat store into the content tree and lists it in the
    /// manifest, as a real backup would.
    pub fn finish(&self) {
        let shard = self.src.join(&CHAT_STORE_HASH[..2]);
        fs::create_dir_all(&shard).expect("mkdir chat shard");
        fs::copy(&self.chat_path, shard.join(CHAT_STORE_HASH)).expect("copy chat store");
        self.add_manifest_row(
            CHAT_STORE_HASH,
            DEFAULT_CHAT_DOMAIN,
            DEFAULT_CHAT_RELATIVE_PATH,
        );
    }
}
