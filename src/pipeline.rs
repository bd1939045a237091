use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{error, info, warn};

use crate::domain::email::{DateRangeQuery, EmailRecord, FilterField, FilterQuery, RetrievalQuery};
use crate::error::{ConfigError, MailError};
use crate::llm::client::ChatService;
use crate::llm::extraction::{ExtractionClient, Outcome};
use crate::mail::date::parse_cli_date;
use crate::mail::decoders::normalize_snippet;
use crate::mail::extract::extract_records;
use crate::mail::file_source::FileSource;
use crate::mail::imap_client::{MailStore, fetch_by_date_range, fetch_by_filter, resolve_mailbox};
use crate::sheet::TableWriter;

/// Raw source selection as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    pub mailbox: String,
    pub filter_by: Option<String>,
    pub filter_value: Option<String>,
    pub file: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<usize>,
}

/// Where this run's records come from.
#[derive(Debug, Clone)]
pub enum RunMode {
    File(FileSource),
    Mailbox {
        mailbox: &'static str,
        query: RetrievalQuery,
    },
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl RunMode {
    /// Picks exactly one source: a file if named, else a filter query if
    /// both field and value are given, else a date range. Everything is
    /// validated here so mistakes surface before any connection is made.
    pub fn from_options(opts: &SourceOptions, source_dir: &Path) -> Result<Self, ConfigError> {
        if let Some(file) = non_empty(&opts.file) {
            return Ok(RunMode::File(FileSource::open(source_dir, file)?));
        }

        let mailbox = resolve_mailbox(&opts.mailbox)?;

        if let (Some(field), Some(value)) = (non_empty(&opts.filter_by), non_empty(&opts.filter_value)) {
            let query = FilterQuery {
                field: FilterField::parse(field)?,
                value: value.to_string(),
            };
            return Ok(RunMode::Mailbox {
                mailbox,
                query: RetrievalQuery::Filter(query),
            });
        }

        if let (Some(start), Some(end)) = (non_empty(&opts.start_date), non_empty(&opts.end_date)) {
            let query = DateRangeQuery::new(parse_cli_date(start)?, parse_cli_date(end)?, opts.limit)?;
            return Ok(RunMode::Mailbox {
                mailbox,
                query: RetrievalQuery::DateRange(query),
            });
        }

        Err(ConfigError::NoSource)
    }

    pub fn needs_mailbox(&self) -> bool {
        matches!(self, RunMode::Mailbox { .. })
    }

    /// Gathers the run's records. `open_store` is only called for mailbox
    /// modes; the store is closed once fetching is done, even if it failed.
    pub fn collect<M, F>(&self, open_store: F) -> Result<Vec<EmailRecord>>
    where
        M: MailStore,
        F: FnOnce() -> Result<M>,
    {
        match self {
            RunMode::File(src) => {
                let record = src
                    .load()
                    .with_context(|| format!("reading {}", src.path().display()))?;
                Ok(vec![record])
            }
            RunMode::Mailbox { mailbox, query } => {
                let mut store = open_store()?;
                let records = collect_from_store(&mut store, mailbox, query);
                if let Err(e) = store.close() {
                    warn!("Logout failed: {e}");
                }
                Ok(records?)
            }
        }
    }
}

pub fn collect_from_store<M: MailStore + ?Sized>(
    store: &mut M,
    mailbox: &str,
    query: &RetrievalQuery,
) -> Result<Vec<EmailRecord>, MailError> {
    match query {
        RetrievalQuery::Filter(q) => Ok(fetch_by_filter(store, mailbox, q)?
            .map(|raw| extract_records(&raw.bytes))
            .unwrap_or_default()),
        RetrievalQuery::DateRange(q) => fetch_by_date_range(store, mailbox, q),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub records: usize,
    pub written: Vec<PathBuf>,
    pub declined: usize,
    pub failed: usize,
}

pub struct Pipeline<S> {
    client: ExtractionClient<S>,
    writer: TableWriter,
}

impl<S: ChatService> Pipeline<S> {
    pub fn new(client: ExtractionClient<S>, writer: TableWriter) -> Self {
        Self { client, writer }
    }

    /// Processes records in order, one at a time. A failing record is
    /// logged and counted; the rest still run.
    pub fn run(&self, records: &[EmailRecord]) -> RunSummary {
        let mut summary = RunSummary {
            records: records.len(),
            ..RunSummary::default()
        };

        for (i, record) in records.iter().enumerate() {
            info!(
                "[{}/{}] '{}' from {}: {}",
                i + 1,
                records.len(),
                record.subject,
                if record.from.is_empty() { "(file)" } else { record.from.as_str() },
                normalize_snippet(&record.body, 80)
            );

            match self.client.process(record, &self.writer) {
                Ok(Outcome::Written { path, rows, .. }) => {
                    println!("Saved {rows} row(s) to {}", path.display());
                    summary.written.push(path);
                }
                Ok(Outcome::Declined) => summary.declined += 1,
                Err(e) => {
                    error!("'{}': {e}", record.subject);
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}
