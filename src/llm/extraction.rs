use std::path::PathBuf;

use log::{info, warn};

use crate::domain::email::EmailRecord;
use crate::error::{ExtractionError, Stage};
use crate::llm::client::{ChatMessage, ChatService};
use crate::retry::RetryPolicy;
use crate::sheet::TableWriter;

pub const CONFIRM_PROMPT: &str = "You will be provided with unstructured email data, and your task \
is to answer whether you can parse it into a list of key value pairs where every row has the same \
keys, so that it can be saved to an Excel file. Reply with either 'YES, I CAN.' or 'NO, I CAN'T.' \
and nothing else.";

pub const EXTRACT_PROMPT: &str = "You will be provided with unstructured email data, and your task \
is to parse it into a JSON list of key value objects where every object has the same keys, so that \
it can be saved to an Excel file. Reply with the JSON list only and no other text. Make sure the \
JSON is valid: every property name enclosed in double quotes and every string terminated.";

/// What happened to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The service said the body cannot be tabulated.
    Declined,
    /// A spreadsheet was written.
    Written {
        path: PathBuf,
        rows: usize,
        reply: String,
    },
}

/// Drives the confirm-then-extract exchange for one record at a time.
pub struct ExtractionClient<S> {
    service: S,
    retry: RetryPolicy,
}

impl<S: ChatService> ExtractionClient<S> {
    pub fn new(service: S, retry: RetryPolicy) -> Self {
        Self { service, retry }
    }

    /// Asks whether `record` can be tabulated and, if so, extracts it and
    /// hands the reply to `writer` until a table is written or the retry
    /// budget is spent.
    pub fn process(
        &self,
        record: &EmailRecord,
        writer: &TableWriter,
    ) -> Result<Outcome, ExtractionError> {
        if !self.confirm(record)? {
            info!("'{}' cannot be tabulated; skipping", record.subject);
            return Ok(Outcome::Declined);
        }
        self.extract(record, writer)
    }

    fn confirm(&self, record: &EmailRecord) -> Result<bool, ExtractionError> {
        let messages = [
            ChatMessage::system(CONFIRM_PROMPT),
            ChatMessage::user(record.body.as_str()),
        ];
        let reply = self
            .service
            .complete(&messages)?
            .ok_or(ExtractionError::NoResponse {
                stage: Stage::Confirm,
            })?;
        Ok(reply.to_uppercase().contains("YES"))
    }

    fn extract(
        &self,
        record: &EmailRecord,
        writer: &TableWriter,
    ) -> Result<Outcome, ExtractionError> {
        let messages = [
            ChatMessage::system(EXTRACT_PROMPT),
            ChatMessage::user(record.body.as_str()),
        ];

        let mut attempt = 0;
        loop {
            attempt += 1;
            let reply = self
                .service
                .complete(&messages)?
                .ok_or(ExtractionError::NoResponse {
                    stage: Stage::Extract,
                })?;

            let err = match writer.write(&reply, &record.subject) {
                Ok((path, rows)) => return Ok(Outcome::Written { path, rows, reply }),
                Err(e) => e,
            };

            if !self.retry.allows_retry_after(attempt) {
                return Err(ExtractionError::AttemptsExhausted {
                    attempts: attempt,
                    last: err.to_string(),
                });
            }
            warn!("Could not save the extracted data ({err}); retrying...");
            self.retry.pause(false);
        }
    }
}
