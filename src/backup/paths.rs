use std::env;
use std::path::{Path, PathBuf};

pub const MANIFEST_DB_NAME: &str = "Manifest.db";
pub const CHAT_DB_NAME: &str = "ChatStorage.db";

#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub src_dir: PathBuf,
    pub dst_dir: PathBuf,
    pub source_manifest_db: PathBuf,
    pub manifest_db: PathBuf,
    pub chat_db: PathBuf,
    pub media_dir: PathBuf,
}

impl ExportPaths {
    pub fn new(src_dir: &Path, dst_dir: &Path) -> Self {
        Self {
            src_dir: src_dir.to_path_buf(),
            dst_dir: dst_dir.to_path_buf(),
            source_manifest_db: src_dir.join(MANIFEST_DB_NAME),
            manifest_db: dst_dir.join(MANIFEST_DB_NAME),
            chat_db: dst_dir.join(CHAT_DB_NAME),
            media_dir: dst_dir.join("media"),
        }
    }

    /// Directory that receives the media of one session.
    pub fn session_media_dir(&self, session_id: i64) -> PathBuf {
        self.media_dir.join(session_id.to_string())
    }
}

fn env_or_default_path(var: &str, fallback: &str) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => PathBuf::from(fallback),
    }
}

/// Resolves source and destination from explicit arguments, then the
/// environment, then the `src`/`dst` working-directory defaults.
pub fn resolve_paths(src: Option<&Path>, dst: Option<&Path>) -> ExportPaths {
    let src_dir = src
        .map(Path::to_path_buf)
        .unwrap_or_else(|| env_or_default_path("WA_ARCHIVE_SRC", "src"));
    let dst_dir = dst
        .map(Path::to_path_buf)
        .unwrap_or_else(|| env_or_default_path("WA_ARCHIVE_DST", "dst"));
    ExportPaths::new(&src_dir, &dst_dir)
}
