fn sanitize_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_sep = false;
    for ch in value.chars() {
        if ch.is_whitespace() {
            if !out.is_empty() && !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else if !ch.is_control() {
            out.push(ch);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "na".to_string()
    } else {
        trimmed.to_string()
    }
}

/// A row that was skipped without aborting the run.
pub struct RowSkip<'a> {
    pub code: &'a str,
    pub stage: &'a str,
    pub session: Option<i64>,
    pub row: usize,
    pub reason: &'a str,
    pub err: &'a str,
}

pub fn row_skipped(event: RowSkip<'_>) {
    let session = event
        .session
        .map(|id| id.to_string())
        .unwrap_or_else(|| "na".to_string());
    tracing::warn!(
        code = %sanitize_value(event.code),
        stage = %sanitize_value(event.stage),
        session = %session,
        row = event.row,
        reason = %sanitize_value(event.reason),
        err = %sanitize_value(event.err),
        "row skipped"
    );
}
