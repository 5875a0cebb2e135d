//! Static HTML archive: a frameset index, a session navigation page and one
//! page per session.

use crate::backup::config::RenderConfig;
use crate::backup::messages::Message;
use crate::backup::sessions::Session;
use anyhow::{Context, Result};
use chrono::DateTime;
use chrono_tz::Tz;
use minijinja::{Environment, HtmlEscape, Value, context};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const FRAMESET_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>WhatsApp</title></head>
<frameset cols="25%,*">
	<frame src="sessions/index.html">
	<frame name="session">
</frameset>
</html>
"#;

const SESSIONS_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>WhatsApp</title></head>
<body>
<h1>WhatsApp</h1>
{% for s in sessions %}
	<a href="session_{{ s.id }}.html" target="session">{{ s.display_name }}</a><br>
{% endfor %}
</body>
</html>
"#;

const SESSION_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{{ session.display_name }}</title>
<style><!--
body { background: rgb(229,221,213); }
.chat { width: 600px; margin: auto; }
.message { margin: 5px; padding: 8px; }
.message img { max-width: 100%; display: block; }
.message video { max-width: 100%; display: block; }
.incoming { background: white; }
.outgoing { background: rgb(221,247,200); text-align: right; }
.sender { font-weight: bold; display: block; }
.datetime { margin: 2px; }
--></style>
</head>
<body>
<h1>{{ session.display_name }}</h1>
<div class="chat">
{% for m in messages %}
	<p class="message {% if m.incoming %}incoming{% else %}outgoing{% endif %}">
		{% if m.incoming and m.is_group and m.sender_name %}<span class="sender">{{ m.sender_name }}</span>{% endif %}
		{{ m.text | nl2br }}
		{% if m.category == "image" %}
			<img src="../{{ m.media }}">
		{% elif m.category == "video" %}
			<video controls>
				<source src="../{{ m.media }}" type="video/mp4">
			</video>
		{% elif m.category == "audio-mp4" %}
			<audio controls preload="none" style="width:480px;">
				<source src="../{{ m.media }}" type="audio/mp4"/>
			</audio>
		{% elif m.category == "audio-ogg" %}
			<audio controls preload="none" style="width:480px;">
				<source src="../{{ m.media }}" type="audio/ogg"/>
			</audio>
		{% endif %}
	</p>
	<p class="datetime">{{ m.timestamp_display }}</p>
{% endfor %}
</div>
</body>
</html>
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaCategory {
    None,
    Image,
    Video,
    AudioMp4,
    AudioOgg,
}

impl MediaCategory {
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            ".jpg" | ".jpeg" | ".png" | ".gif" => Self::Image,
            ".mp4" | ".mov" => Self::Video,
            ".m4a" => Self::AudioMp4,
            ".opus" => Self::AudioOgg,
            _ => Self::None,
        }
    }
}

#[derive(Debug, Serialize)]
struct MessageView<'a> {
    incoming: bool,
    is_group: bool,
    sender_name: &'a str,
    text: &'a str,
    media: &'a str,
    category: MediaCategory,
    timestamp_display: String,
}

#[derive(Debug, Clone)]
pub struct RenderedSession {
    pub path: PathBuf,
    pub rendered: usize,
    pub dropped: usize,
}

fn nl2br(value: String) -> Value {
    Value::from_safe_string(HtmlEscape(&value).to_string().replace('\n', "<br>"))
}

/// The most recent `keep` messages; the list is in conversation order.
pub fn truncate_recent(messages: &[Message], keep: usize) -> &[Message] {
    let start = messages.len().saturating_sub(keep);
    &messages[start..]
}

pub fn display_timestamp(iso: &str, tz: Tz) -> String {
    match DateTime::parse_from_rfc3339(iso) {
        Ok(at) => at.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) => String::new(),
    }
}

pub struct ArchiveRenderer {
    env: Environment<'static>,
    tz: Tz,
    message_cap: usize,
}

impl ArchiveRenderer {
    pub fn new(cfg: &RenderConfig) -> Result<Self> {
        let mut env = Environment::new();
        env.add_filter("nl2br", nl2br);
        env.add_template("sessions.html", SESSIONS_TEMPLATE)
            .context("invalid sessions template")?;
        env.add_template("session.html", SESSION_TEMPLATE)
            .context("invalid session template")?;
        Ok(Self {
            env,
            tz: cfg.tz()?,
            message_cap: cfg.message_cap,
        })
    }

    /// Writes `index.html` and `sessions/index.html`.
    pub fn render_index(&self, dst_dir: &Path, sessions: &[Session]) -> Result<PathBuf> {
        let index = dst_dir.join("index.html");
        fs::write(&index, FRAMESET_HTML)
            .with_context(|| format!("failed to write {}", index.display()))?;

        let sessions_dir = dst_dir.join("sessions");
        fs::create_dir_all(&sessions_dir)
            .with_context(|| format!("failed to create {}", sessions_dir.display()))?;
        let html = self
            .env
            .get_template("sessions.html")?
            .render(context! { sessions => sessions })
            .context("failed to render session index")?;
        let nav = sessions_dir.join("index.html");
        fs::write(&nav, html).with_context(|| format!("failed to write {}", nav.display()))?;
        Ok(index)
    }

    /// Writes `sessions/session_<id>.html` with at most the configured cap
    /// (further lowered by `limit`) of the most recent messages.
    pub fn render_session(
        &self,
        dst_dir: &Path,
        session: &Session,
        messages: &[Message],
        limit: Option<usize>,
    ) -> Result<RenderedSession> {
        let keep = limit.map_or(self.message_cap, |l| l.min(self.message_cap));
        let shown = truncate_recent(messages, keep);
        let views: Vec<MessageView<'_>> = shown
            .iter()
            .map(|m| MessageView {
                incoming: m.is_incoming(),
                is_group: m.is_group,
                sender_name: &m.sender_name,
                text: &m.text,
                media: &m.media_relative_path,
                category: if m.media_relative_path.is_empty() {
                    MediaCategory::None
                } else {
                    MediaCategory::from_extension(&m.media_extension)
                },
                timestamp_display: display_timestamp(&m.timestamp, self.tz),
            })
            .collect();

        let html = self
            .env
            .get_template("session.html")?
            .render(context! { session => session, messages => views })
            .with_context(|| format!("failed to render session {}", session.id))?;

        let sessions_dir = dst_dir.join("sessions");
        fs::create_dir_all(&sessions_dir)
            .with_context(|| format!("failed to create {}", sessions_dir.display()))?;
        let path = sessions_dir.join(format!("session_{}.html", session.id));
        fs::write(&path, html).with_context(|| format!("failed to write {}", path.display()))?;

        Ok(RenderedSession {
            path,
            rendered: shown.len(),
            dropped: messages.len() - shown.len(),
        })
    }
}
