use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::error::{ConfigError, DateParseError};

const RFC5322: &str = "%a, %d %b %Y %H:%M:%S %z";
const SHORT_PREFIX_LEN: usize = 16;

static TRAILING_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^()]*\)\s*$").expect("valid regex"));

/// Parses an email `Date:` header into a wall-clock timestamp.
///
/// Formats are tried from most to least precise:
/// * `Tue, 20 Jun 2023 03:15:04 -0500`
/// * the same followed by a parenthesized zone name, `... -0500 (CDT)`
/// * the first 16 characters only, `Tue, 20 Jun 2023`, read as midnight of
///   that day. Time and zone are lost.
///
/// The offset is dropped rather than converted, so the result is the local
/// time the sender's client wrote.
pub fn parse_email_date(raw: &str) -> Result<NaiveDateTime, DateParseError> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_str(s, RFC5322) {
        return Ok(dt.naive_local());
    }

    let without_comment = TRAILING_COMMENT.replace(s, "");
    if without_comment != s
        && let Ok(dt) = DateTime::parse_from_str(&without_comment, RFC5322)
    {
        return Ok(dt.naive_local());
    }

    let prefix: String = s.chars().take(SHORT_PREFIX_LEN).collect();
    let prefix = prefix.trim_end();
    if let Ok(day) = NaiveDate::parse_from_str(prefix, "%a, %d %b %Y")
        && let Some(dt) = day.and_hms_opt(0, 0, 0)
    {
        return Ok(dt);
    }

    Err(DateParseError(raw.to_string()))
}

/// Parses a `dd-mm-yyyy` command line date.
pub fn parse_cli_date(s: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(s.trim(), "%d-%m-%Y").map_err(|_| ConfigError::InvalidDate(s.to_string()))
}

/// IMAP SEARCH date, e.g. `20-Jun-2023`.
pub fn imap_date(date: NaiveDate) -> String {
    date.format("%d-%b-%Y").to_string()
}
