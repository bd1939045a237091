use chrono::NaiveDate;

use crate::error::ConfigError;

pub type MessageId = u32;

/// One body-bearing unit taken from a message. A multi-part message can
/// produce several of these, one per plain-text part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRecord {
    pub body: String,
    pub subject: String,
    /// Raw `Date:` header value, empty when the source has none.
    pub date: String,
    pub from: String,
    pub to: String,
}

/// An RFC822 message as fetched from the server.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub id: MessageId,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Subject,
    From,
    To,
    Body,
}

impl FilterField {
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "subject" => Ok(Self::Subject),
            "from" => Ok(Self::From),
            "to" => Ok(Self::To),
            "body" => Ok(Self::Body),
            _ => Err(ConfigError::UnknownFilterField(name.to_string())),
        }
    }

    /// IMAP SEARCH key for this field.
    pub fn search_key(self) -> &'static str {
        match self {
            Self::Subject => "SUBJECT",
            Self::From => "FROM",
            Self::To => "TO",
            Self::Body => "BODY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterQuery {
    pub field: FilterField,
    pub value: String,
}

impl FilterQuery {
    /// Renders the query as an IMAP SEARCH criterion, e.g. `SUBJECT "invoice"`.
    pub fn to_search(&self) -> String {
        format!("{} {}", self.field.search_key(), quote(&self.value))
    }
}

/// Messages received on or after `start` and strictly before `end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRangeQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub limit: Option<usize>,
}

impl DateRangeQuery {
    pub fn new(start: NaiveDate, end: NaiveDate, limit: Option<usize>) -> Result<Self, ConfigError> {
        if start >= end {
            return Err(ConfigError::EmptyDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end, limit })
    }

    pub fn to_search(&self) -> String {
        format!(
            "(SINCE \"{}\" BEFORE \"{}\")",
            crate::mail::date::imap_date(self.start),
            crate::mail::date::imap_date(self.end)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalQuery {
    Filter(FilterQuery),
    DateRange(DateRangeQuery),
}

/// Quoted IMAP string with backslashes and double quotes escaped.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_field_is_case_insensitive() {
        assert_eq!(FilterField::parse("Subject").unwrap(), FilterField::Subject);
        assert_eq!(FilterField::parse("FROM").unwrap(), FilterField::From);
        assert!(matches!(
            FilterField::parse("cc"),
            Err(ConfigError::UnknownFilterField(_))
        ));
    }

    #[test]
    fn filter_query_escapes_quotes() {
        let q = FilterQuery {
            field: FilterField::Subject,
            value: r#"say "hi" \o/"#.to_string(),
        };
        assert_eq!(q.to_search(), r#"SUBJECT "say \"hi\" \\o/""#);
    }

    #[test]
    fn date_range_renders_since_before() {
        let q = DateRangeQuery::new(
            NaiveDate::from_ymd_opt(2023, 6, 20).unwrap(),
            NaiveDate::from_ymd_opt(2023, 6, 22).unwrap(),
            Some(10),
        )
        .unwrap();
        assert_eq!(q.to_search(), r#"(SINCE "20-Jun-2023" BEFORE "22-Jun-2023")"#);
    }

    #[test]
    fn date_range_rejects_inverted_bounds() {
        let day = NaiveDate::from_ymd_opt(2023, 6, 20).unwrap();
        assert!(matches!(
            DateRangeQuery::new(day, day, None),
            Err(ConfigError::EmptyDateRange { .. })
        ));
    }
}
