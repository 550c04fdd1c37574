//! Keeps player-supplied text on a single log line.

const MAX_PREVIEW: usize = 160;

/// Escape control characters and cap length so chat and names never break log lines.
pub fn escape_log(s: &str) -> String {
    escape_log_with(s, MAX_PREVIEW)
}

/// Like [`escape_log`] with an explicit character budget.
pub fn escape_log_with(s: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(s.len().min(max_chars) + 4);
    for (count, ch) in s.chars().enumerate() {
        if count >= max_chars {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\x{:02X}", c as u32)),
            c => out.push(c),
        }
    }
    out
}
