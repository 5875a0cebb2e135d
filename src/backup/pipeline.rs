use crate::backup::config::ExportConfig;
use crate::backup::content_store::ContentStore;
use crate::backup::media_catalog::{self, CatalogStats, MediaCatalog};
use crate::backup::messages::MessageResolver;
use crate::backup::path_index::{self, PathIndex};
use crate::backup::paths::ExportPaths;
use crate::backup::profile_pictures::{self, ProfilePictureCatalog};
use crate::backup::render::ArchiveRenderer;
use crate::backup::sessions::{self, Session};
use crate::backup::store::{self, BackupStores};
use anyhow::{Context, Result};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    pub limit_chats: Option<usize>,
    pub limit_msgs: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct SessionExport {
    pub session: Session,
    pub messages: usize,
    pub rendered: usize,
    pub dropped: usize,
    pub skipped_rows: usize,
    pub media_copied: usize,
    pub media_reused: usize,
    pub media_unresolved: usize,
    pub page: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub manifest_entries: usize,
    pub catalog: CatalogStats,
    pub sessions_total: usize,
    pub index_path: PathBuf,
    pub exported: Vec<SessionExport>,
}

/// Everything resolved up front: the staged stores, the path index and
/// the catalogs built from it. Nothing is materialized yet.
pub struct PreparedBackup {
    pub content: ContentStore,
    pub stores: BackupStores,
    pub index: PathIndex,
    pub catalog: MediaCatalog,
    pub profiles: ProfilePictureCatalog,
}

pub fn prepare(paths: &ExportPaths, cfg: &ExportConfig) -> Result<PreparedBackup> {
    let content = ContentStore::new(&paths.src_dir);
    let stores = store::stage(paths, &content, &cfg.store)?;
    let index = path_index::load(&stores.manifest)?;
    let catalog = media_catalog::load(&stores.chat, &index)?;
    let profiles = profile_pictures::load(&stores.chat, &index)?;
    Ok(PreparedBackup {
        content,
        stores,
        index,
        catalog,
        profiles,
    })
}

pub fn run_export(
    paths: &ExportPaths,
    cfg: &ExportConfig,
    opts: &ExportOptions,
) -> Result<ExportOutcome> {
    let renderer = ArchiveRenderer::new(&cfg.render)?;
    let prepared = prepare(paths, cfg)?;

    let mut all_sessions = sessions::list(&prepared.stores.chat, &cfg.store.status_suffix)?;
    let sessions_total = all_sessions.len();
    if let Some(limit) = opts.limit_chats {
        all_sessions.truncate(limit);
    }

    let index_path = renderer.render_index(&paths.dst_dir, &all_sessions)?;

    let resolver = MessageResolver::new(
        &prepared.stores.chat,
        &prepared.catalog,
        &prepared.content,
        paths,
    );
    let mut exported = Vec::with_capacity(all_sessions.len());
    for session in all_sessions {
        tracing::info!(session = session.id, name = %session.display_name, "building session");
        let resolved = resolver
            .resolve(&session)
            .with_context(|| format!("failed to resolve session {}", session.id))?;
        let page = renderer.render_session(
            &paths.dst_dir,
            &session,
            &resolved.messages,
            opts.limit_msgs,
        )?;
        exported.push(SessionExport {
            messages: resolved.stats.messages,
            rendered: page.rendered,
            dropped: page.dropped,
            skipped_rows: resolved.stats.skipped_rows,
            media_copied: resolved.stats.media_copied,
            media_reused: resolved.stats.media_reused,
            media_unresolved: resolved.stats.media_unresolved,
            page: page.path,
            session,
        });
    }

    Ok(ExportOutcome {
        manifest_entries: prepared.index.len(),
        catalog: prepared.catalog.stats(),
        sessions_total,
        index_path,
        exported,
    })
}
