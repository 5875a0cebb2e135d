use crate::error::ExportError;
use anyhow::Result;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Every `WA_ARCHIVE_*` variable the binary reads.
pub const KNOWN_ENV_KEYS: &[&str] = &[
    "WA_ARCHIVE_HOME",
    "WA_ARCHIVE_SRC",
    "WA_ARCHIVE_DST",
    "WA_ARCHIVE_CONFIG_PATH",
    "WA_ARCHIVE_CHAT_RELATIVE_PATH",
    "WA_ARCHIVE_CHAT_DOMAIN",
    "WA_ARCHIVE_STATUS_SUFFIX",
    "WA_ARCHIVE_RENDER_CAP",
    "WA_ARCHIVE_TIMEZONE",
];

pub const DEFAULT_CHAT_RELATIVE_PATH: &str = "ChatStorage.sqlite";
pub const DEFAULT_CHAT_DOMAIN: &str = "AppDomainGroup-group.net.whatsapp.WhatsApp.shared";
pub const DEFAULT_STATUS_SUFFIX: &str = "@status";
pub const DEFAULT_RENDER_CAP: usize = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub chat_relative_path: String,
    pub chat_domain: String,
    pub status_suffix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            chat_relative_path: DEFAULT_CHAT_RELATIVE_PATH.to_string(),
            chat_domain: DEFAULT_CHAT_DOMAIN.to_string(),
            status_suffix: DEFAULT_STATUS_SUFFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub message_cap: usize,
    pub timezone: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            message_cap: DEFAULT_RENDER_CAP,
            timezone: "UTC".to_string(),
        }
    }
}

impl RenderConfig {
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .trim()
            .parse::<Tz>()
            .map_err(|err| ExportError::InvalidConfig(format!("timezone: {err}")).into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExportConfig {
    pub store: StoreConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialExportConfig {
    store: Option<StoreConfig>,
    render: Option<RenderConfig>,
}

fn env_or_usize(var: &str, fallback: usize) -> usize {
    match env::var(var) {
        Ok(v) => v.trim().parse::<usize>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn validate(cfg: &ExportConfig) -> Result<()> {
    if cfg.store.chat_relative_path.trim().is_empty() {
        return Err(ExportError::InvalidConfig("chat relative path cannot be empty".into()).into());
    }
    if cfg.store.chat_domain.trim().is_empty() {
        return Err(ExportError::InvalidConfig("chat domain cannot be empty".into()).into());
    }
    if cfg.store.status_suffix.is_empty() {
        return Err(ExportError::InvalidConfig("status suffix cannot be empty".into()).into());
    }
    if cfg.render.message_cap == 0 {
        return Err(ExportError::InvalidConfig("render message cap must be >= 1".into()).into());
    }
    cfg.render.tz()?;
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("WA_ARCHIVE_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    Some(dirs::config_dir()?.join("wa-archive").join("config.toml"))
}

fn merge_file_config(base: &mut ExportConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)
        .map_err(|err| ExportError::InvalidConfig(format!("{}: {err}", path.display())))?;
    let parsed: PartialExportConfig = toml::from_str(&raw)
        .map_err(|err| ExportError::InvalidConfig(format!("{}: {err}", path.display())))?;
    if let Some(store) = parsed.store {
        base.store = store;
    }
    if let Some(render) = parsed.render {
        base.render = render;
    }
    Ok(())
}

pub fn load_config() -> Result<ExportConfig> {
    let mut cfg = ExportConfig::default();
    merge_file_config(&mut cfg)?;

    cfg.store.chat_relative_path = env_or_string(
        "WA_ARCHIVE_CHAT_RELATIVE_PATH",
        &cfg.store.chat_relative_path,
    );
    cfg.store.chat_domain = env_or_string("WA_ARCHIVE_CHAT_DOMAIN", &cfg.store.chat_domain);
    cfg.store.status_suffix = env_or_string("WA_ARCHIVE_STATUS_SUFFIX", &cfg.store.status_suffix);
    cfg.render.message_cap = env_or_usize("WA_ARCHIVE_RENDER_CAP", cfg.render.message_cap);
    cfg.render.timezone = env_or_string("WA_ARCHIVE_TIMEZONE", &cfg.render.timezone);

    validate(&cfg)?;
    Ok(cfg)
}

/// `WA_ARCHIVE_*` variables set in the environment that nothing reads.
fn unknown_keys<I>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    keys.into_iter()
        .filter(|key| key.starts_with("WA_ARCHIVE_"))
        .filter(|key| !KNOWN_ENV_KEYS.contains(&key.as_str()))
        .collect()
}

pub fn unknown_env_keys() -> Vec<String> {
    unknown_keys(env::vars().map(|(key, _)| key))
}
