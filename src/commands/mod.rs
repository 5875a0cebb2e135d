pub mod export;
pub mod inspect;
pub mod sessions;

use serde::Serialize;
use std::fmt::Write as _;

/// Outcome of one subcommand. Warnings are reported but keep `ok`;
/// any issue clears it and makes the process exit with status 2.
#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            warnings: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.warnings.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }

    pub fn render_text(&self) -> String {
        let status = if self.ok { "ok" } else { "failed" };
        let mut out = format!("{} {status}\n", self.command);
        let lines = self
            .details
            .iter()
            .map(|d| ("", d))
            .chain(self.warnings.iter().map(|w| ("warning: ", w)))
            .chain(self.issues.iter().map(|i| ("issue: ", i)));
        for (label, text) in lines {
            let _ = writeln!(out, "  {label}{text}");
        }
        out
    }
}
