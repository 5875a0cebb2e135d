use anyhow::Result;
use std::path::PathBuf;

use crate::backup::config::load_config;
use crate::backup::paths::resolve_paths;
use crate::backup::pipeline::{ExportOptions, run_export};
use crate::commands::CommandReport;

#[derive(Debug, Clone, Default)]
pub struct ExportCommandOptions {
    pub src: Option<PathBuf>,
    pub dst: Option<PathBuf>,
    pub limit_chats: Option<usize>,
    pub limit_msgs: Option<usize>,
}

pub fn run(opts: &ExportCommandOptions) -> Result<CommandReport> {
    let cfg = load_config()?;
    let paths = resolve_paths(opts.src.as_deref(), opts.dst.as_deref());
    let mut report = CommandReport::new("export");

    report.detail(format!("src_dir={}", paths.src_dir.display()));
    report.detail(format!("dst_dir={}", paths.dst_dir.display()));

    let outcome = run_export(
        &paths,
        &cfg,
        &ExportOptions {
            limit_chats: opts.limit_chats,
            limit_msgs: opts.limit_msgs,
        },
    )?;

    report.detail(format!("manifest_entries={}", outcome.manifest_entries));
    report.detail(format!("media.descriptors={}", outcome.catalog.descriptors));
    report.detail(format!("media.resolved={}", outcome.catalog.resolved));
    report.detail(format!("media.unresolved={}", outcome.catalog.unresolved));
    report.detail(format!("sessions.total={}", outcome.sessions_total));
    report.detail(format!("sessions.exported={}", outcome.exported.len()));
    report.detail(format!("index={}", outcome.index_path.display()));
    for session in &outcome.exported {
        report.detail(format!(
            "session id={} name={} messages={} rendered={} media_copied={} media_reused={} media_unresolved={} dropped={} page={}",
            session.session.id,
            session.session.display_name,
            session.messages,
            session.rendered,
            session.media_copied,
            session.media_reused,
            session.media_unresolved,
            session.dropped,
            session.page.display(),
        ));
        if session.skipped_rows > 0 {
            report.warning(format!(
                "session {} skipped {} malformed message rows",
                session.session.id, session.skipped_rows
            ));
        }
    }

    Ok(report)
}
