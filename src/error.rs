use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("chat store not listed in manifest (relativePath={relative_path}, domain={domain})")]
    ChatStoreNotFound {
        relative_path: String,
        domain: String,
    },
    #[error("source file missing: {}", .0.display())]
    MissingSourceFile(PathBuf),
    #[error("config file invalid or unreadable: {0}")]
    InvalidConfig(String),
    #[error("content file for hash {hash} missing at {}", .path.display())]
    MissingContent { hash: String, path: PathBuf },
}
