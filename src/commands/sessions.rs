use anyhow::Result;
use std::path::PathBuf;

use crate::backup::config::load_config;
use crate::backup::paths::resolve_paths;
use crate::backup::pipeline::prepare;
use crate::backup::sessions;
use crate::commands::CommandReport;

#[derive(Debug, Clone, Default)]
pub struct SessionsOptions {
    pub src: Option<PathBuf>,
    pub dst: Option<PathBuf>,
}

pub fn run(opts: &SessionsOptions) -> Result<CommandReport> {
    let cfg = load_config()?;
    let paths = resolve_paths(opts.src.as_deref(), opts.dst.as_deref());
    let mut report = CommandReport::new("sessions");

    let prepared = prepare(&paths, &cfg)?;
    let listed = sessions::list(&prepared.stores.chat, &cfg.store.status_suffix)?;

    report.detail(format!("sessions={}", listed.len()));
    for session in &listed {
        let avatar = prepared
            .profiles
            .hash_for(&session.conversation_key)
            .is_some();
        report.detail(format!(
            "session id={} key={} name={} avatar={}",
            session.id, session.conversation_key, session.display_name, avatar
        ));
    }

    Ok(report)
}
