use anyhow::Result;
use std::path::PathBuf;

use crate::backup::config::{load_config, unknown_env_keys};
use crate::backup::paths::resolve_paths;
use crate::backup::pipeline::prepare;
use crate::commands::CommandReport;

#[derive(Debug, Clone, Default)]
pub struct InspectOptions {
    pub src: Option<PathBuf>,
    pub dst: Option<PathBuf>,
}

pub fn run(opts: &InspectOptions) -> Result<CommandReport> {
    let cfg = load_config()?;
    let paths = resolve_paths(opts.src.as_deref(), opts.dst.as_deref());
    let mut report = CommandReport::new("inspect");

    report.detail(format!("src_dir={}", paths.src_dir.display()));
    report.detail(format!("dst_dir={}", paths.dst_dir.display()));
    report.detail(format!("chat_domain={}", cfg.store.chat_domain));
    report.detail(format!("render.message_cap={}", cfg.render.message_cap));
    report.detail(format!("render.timezone={}", cfg.render.timezone));

    for key in unknown_env_keys() {
        report.issue(format!("unrecognised environment variable {key}"));
    }

    let prepared = prepare(&paths, &cfg)?;
    let stats = prepared.catalog.stats();
    report.detail(format!("manifest.copied={}", prepared.stores.manifest_copied));
    report.detail(format!("chat.copied={}", prepared.stores.chat_copied));
    report.detail(format!("manifest_entries={}", prepared.index.len()));
    report.detail(format!("media.descriptors={}", stats.descriptors));
    report.detail(format!("media.resolved={}", stats.resolved));
    report.detail(format!("media.unresolved={}", stats.unresolved));
    report.detail(format!(
        "profile_pictures.resolved={}",
        prepared.profiles.resolved()
    ));
    report.detail(format!(
        "profile_pictures.unresolved={}",
        prepared.profiles.unresolved()
    ));

    if prepared.index.is_empty() {
        report.issue("manifest lists no files");
    }

    Ok(report)
}
