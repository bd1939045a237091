use mailparse::{MailHeader, MailHeaderMap};

/// First value of `key`, RFC 2047-decoded and trimmed; empty when absent.
pub fn header_text(headers: &[MailHeader], key: &str) -> String {
    headers
        .get_first_value(key)
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// Collapses a body into a single line of at most `max_chars` characters,
/// for log output.
pub fn normalize_snippet(s: &str, max_chars: usize) -> String {
    let mut out = String::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(line);
        if out.chars().count() >= max_chars {
            break;
        }
    }
    out.chars().take(max_chars).collect()
}
