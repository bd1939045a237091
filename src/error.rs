//! Error types shared across the crate.
//!
//! Each failure class gets its own enum so callers can tell terminal
//! conditions apart from retryable ones without inspecting messages.

use std::path::PathBuf;

use thiserror::Error;

/// Problems detected while building a run, before any network I/O.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown mailbox '{0}' (expected inbox, sent, drafts, archive, spam or trash)")]
    UnknownMailbox(String),

    #[error("unknown filter field '{0}' (expected subject, from, to or body)")]
    UnknownFilterField(String),

    #[error("source file '{0}' must be a plain file name inside the source directory")]
    NotInSourceDir(String),

    #[error("source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("unsupported source format for {}: only .txt files are supported", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("could not read source file {}: {source}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("missing secret '{0}': set it in the config file, the environment or the keyring")]
    MissingSecret(&'static str),

    #[error("no source selected: pass --file, --filter-by/--filter-value or --start-date/--end-date")]
    NoSource,

    #[error("invalid date '{0}': expected dd-mm-yyyy")]
    InvalidDate(String),

    #[error("start date {start} is not before end date {end}")]
    EmptyDateRange { start: String, end: String },
}

/// Login failures that retrying will never fix.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("the provider requires a web login; enable IMAP access for this account")]
    WebLoginRequired,

    #[error("invalid credentials; check the mailbox address and app password")]
    InvalidCredentials,
}

#[derive(Error, Debug)]
pub enum MailError {
    #[error(transparent)]
    Auth(#[from] AuthFailure),

    #[error("gave up connecting after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("IMAP error: {0}")]
    Imap(#[from] imap::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognised date header: {0:?}")]
pub struct DateParseError(pub String);

/// Failures talking to the text-generation service.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Which half of the confirm-then-extract exchange failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Confirm,
    Extract,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Confirm => f.write_str("confirmation"),
            Stage::Extract => f.write_str("extraction"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("no response from the service during {stage}")]
    NoResponse { stage: Stage },

    #[error("no usable table after {attempts} extraction attempts: {last}")]
    AttemptsExhausted { attempts: u32, last: String },

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Reasons a service reply could not become a spreadsheet.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("reply is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("reply contains no rows")]
    Empty,

    #[error("row {0} is not a JSON object")]
    NotAnObject(usize),

    #[error("a single-record reply must only hold scalar values (key '{0}')")]
    NestedValue(String),

    #[error("reply is a JSON {0}, expected a list of objects")]
    UnexpectedShape(&'static str),

    #[error("table of {rows} row(s) x {columns} column(s) does not fit in a worksheet")]
    TooLarge { rows: usize, columns: usize },

    #[error("could not create results directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write spreadsheet: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}
