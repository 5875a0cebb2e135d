#![allow(dead_code)]

use rusqlite::{Connection, params};
use std::fs;
use std::path::{Path, PathBuf};

pub const CHAT_STORE_HASH: &str = "7c7fba66680ef796b916b067077cc246adacf01d";
const MANIFEST_SCHEMA: &str = include_str!("manifest_schema.sql");
const CHAT_SCHEMA: &str = include_str!("chat_schema.sql");
const CHAT_DOMAIN: &str = "AppDomainGroup-group.net.whatsapp.WhatsApp.shared";

/// A minimal iPhone backup: manifest, content tree and a chat store.
pub struct Backup {
    pub root: PathBuf,
    pub src: PathBuf,
    manifest: Connection,
    chat: Connection,
    chat_path: PathBuf,
}

impl Backup {
    pub fn new(root: &Path) -> Self {
        let src = root.join("src");
        fs::create_dir_all(&src).expect("mkdir src");
        let manifest = Connection::open(src.join("Manifest.db")).expect("open manifest");
        manifest
            .execute_batch(MANIFEST_SCHEMA)
            .expect("manifest schema");
        let chat_path = root.join("chat-build.sqlite");
        let chat = Connection::open(&chat_path).expect("open chat");
        chat.execute_batch(CHAT_SCHEMA).expect("chat schema");
        Self {
            root: root.to_path_buf(),
            src,
            manifest,
            chat,
            chat_path,
        }
    }

    pub fn file(&self, hash: &str, relative_path: &str, bytes: &[u8]) {
        let shard = self.src.join(&hash[..2]);
        fs::create_dir_all(&shard).expect("mkdir shard");
        fs::write(shard.join(hash), bytes).expect("write content");
        self.manifest
            .execute(
                "INSERT INTO Files (fileID, domain, relativePath, flags) VALUES (?1, ?2, ?3, 1)",
                params![hash, CHAT_DOMAIN, relative_path],
            )
            .expect("manifest row");
    }

    pub fn session(&self, id: i64, jid: &str, name: &str, last_message: f64) {
        self.chat
            .execute(
                "INSERT INTO ZWACHATSESSION (Z_PK, ZCONTACTJID, ZPARTNERNAME, ZLASTMESSAGEDATE) VALUES (?1, ?2, ?3, ?4)",
                params![id, jid, name, last_message],
            )
            .expect("session row");
    }

    pub fn media(&self, id: i64, local_path: &str, title: Option<&str>) {
        self.chat
            .execute(
                "INSERT INTO ZWAMEDIAITEM (Z_PK, ZMEDIALOCALPATH, ZTITLE) VALUES (?1, ?2, ?3)",
                params![id, local_path, title],
            )
            .expect("media row");
    }

    pub fn message(
        &self,
        session: i64,
        sort: i64,
        from: Option<&str>,
        text: Option<&str>,
        media: Option<i64>,
        date: f64,
    ) {
        self.chat
            .execute(
                "INSERT INTO ZWAMESSAGE (ZCHATSESSION, ZSORT, ZFROMJID, ZTEXT, ZMEDIAITEM, ZMESSAGEDATE)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![session, sort, from, text, media, date],
            )
            .expect("message row");
    }

    pub fn finish(&self) {
        let shard = self.src.join(&CHAT_STORE_HASH[..2]);
        fs::create_dir_all(&shard).expect("mkdir chat shard");
        fs::copy(&self.chat_path, shard.join(CHAT_STORE_HASH)).expect("copy chat store");
        self.manifest
            .execute(
                "INSERT INTO Files (fileID, domain, relativePath, flags) VALUES (?1, ?2, 'ChatStorage.sqlite', 1)",
                params![CHAT_STORE_HASH, CHAT_DOMAIN],
            )
            .expect("chat store manifest row");
    }
}

pub fn cmd(root: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("wa-archive");
    cmd.current_dir(root)
        .env("WA_ARCHIVE_CONFIG_PATH", root.join("no-config.toml"))
        .env("WA_ARCHIVE_HOME", root.join("home"))
        .env_remove("WA_ARCHIVE_SRC")
        .env_remove("WA_ARCHIVE_DST")
        .env_remove("RUST_LOG");
    cmd
}
