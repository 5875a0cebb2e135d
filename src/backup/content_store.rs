use crate::error::ExportError;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Content-addressed file tree of a backup: `<root>/<hash[..2]>/<hash>`.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Materialized {
    pub file_name: String,
    pub dest_path: PathBuf,
    pub copied: bool,
}

fn shard_of(hash: &str) -> &str {
    hash.get(..2).unwrap_or(hash)
}

fn partial_path(dst: &Path) -> PathBuf {
    let mut name = dst.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dst.with_file_name(name)
}

/// Copies through `<dst>.part` so `dst` only ever appears complete.
fn copy_into_place(src: &Path, dst: &Path) -> Result<()> {
    let partial = partial_path(dst);
    fs::copy(src, &partial)
        .with_context(|| format!("failed to copy {} to {}", src.display(), partial.display()))?;
    fs::rename(&partial, dst).with_context(|| {
        format!("failed to move {} to {}", partial.display(), dst.display())
    })?;
    Ok(())
}

impl ContentStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn locate(&self, hash: &str) -> PathBuf {
        self.root.join(shard_of(hash)).join(hash)
    }

    /// Copies the content for `hash` to `<dest_dir>/<media_id><extension>`
    /// unless that file is already there.
    pub fn materialize(
        &self,
        hash: &str,
        extension: &str,
        dest_dir: &Path,
        media_id: i64,
    ) -> Result<Materialized> {
        let file_name = format!("{media_id}{extension}");
        let dest_path = dest_dir.join(&file_name);
        if dest_path.exists() {
            return Ok(Materialized {
                file_name,
                dest_path,
                copied: false,
            });
        }

        let src_path = self.locate(hash);
        if !src_path.is_file() {
            return Err(ExportError::MissingContent {
                hash: hash.to_string(),
                path: src_path,
            }
            .into());
        }
        copy_into_place(&src_path, &dest_path)?;

        Ok(Materialized {
            file_name,
            dest_path,
            copied: true,
        })
    }
}

/// Copies `src` to `dst` when `dst` is absent. Returns whether it copied.
pub fn copy_if_absent(src: &Path, dst: &Path) -> Result<bool> {
    if dst.exists() {
        return Ok(false);
    }
    if !src.is_file() {
        return Err(ExportError::MissingSourceFile(src.to_path_buf()).into());
    }
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    copy_into_place(src, dst)?;
    Ok(true)
}
