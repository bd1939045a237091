use std::io::{Read, Write};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use native_tls::TlsConnector;

use crate::domain::email::{DateRangeQuery, EmailRecord, FilterQuery, MessageId, RawMessage};
use crate::error::{AuthFailure, ConfigError, MailError};
use crate::mail::date::parse_email_date;
use crate::mail::extract::extract_records;
use crate::retry::RetryPolicy;

pub type ImapSession = imap::Session<native_tls::TlsStream<std::net::TcpStream>>;

/// Folder paths behind the user-facing mailbox names.
const MAILBOXES: &[(&str, &str)] = &[
    ("inbox", "INBOX"),
    ("sent", "[Gmail]/Sent Mail"),
    ("drafts", "[Gmail]/Drafts"),
    ("archive", "[Gmail]/All Mail"),
    ("spam", "[Gmail]/Spam"),
    ("trash", "[Gmail]/Trash"),
];

/// Maps a case-insensitive mailbox name such as `Sent` to its folder path.
pub fn resolve_mailbox(name: &str) -> Result<&'static str, ConfigError> {
    let key = name.trim().to_ascii_lowercase();
    MAILBOXES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, path)| *path)
        .ok_or_else(|| ConfigError::UnknownMailbox(name.to_string()))
}

/// The few mailbox operations a run needs. Implemented by a live IMAP
/// session; tests substitute an in-memory store.
pub trait MailStore {
    fn select_mailbox(&mut self, mailbox: &str) -> Result<(), MailError>;

    /// Message sequence numbers matching `query`, ascending.
    fn search_ids(&mut self, query: &str) -> Result<Vec<MessageId>, MailError>;

    /// Full RFC822 source of one message, `None` if the server sent no body.
    fn fetch_raw(&mut self, id: MessageId) -> Result<Option<RawMessage>, MailError>;

    fn close(&mut self) -> Result<(), MailError> {
        Ok(())
    }
}

impl<M: MailStore + ?Sized> MailStore for &mut M {
    fn select_mailbox(&mut self, mailbox: &str) -> Result<(), MailError> {
        (**self).select_mailbox(mailbox)
    }

    fn search_ids(&mut self, query: &str) -> Result<Vec<MessageId>, MailError> {
        (**self).search_ids(query)
    }

    fn fetch_raw(&mut self, id: MessageId) -> Result<Option<RawMessage>, MailError> {
        (**self).fetch_raw(id)
    }

    fn close(&mut self) -> Result<(), MailError> {
        (**self).close()
    }
}

impl<T: Read + Write> MailStore for imap::Session<T> {
    fn select_mailbox(&mut self, mailbox: &str) -> Result<(), MailError> {
        let mb = self.select(mailbox)?;
        debug!("{mailbox} has {} messages", mb.exists);
        Ok(())
    }

    fn search_ids(&mut self, query: &str) -> Result<Vec<MessageId>, MailError> {
        let mut ids: Vec<MessageId> = self.search(query)?.into_iter().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn fetch_raw(&mut self, id: MessageId) -> Result<Option<RawMessage>, MailError> {
        let fetches = self.fetch(id.to_string(), "RFC822")?;
        Ok(fetches
            .iter()
            .next()
            .and_then(|f| f.body())
            .map(|b| RawMessage {
                id,
                bytes: b.to_vec(),
            }))
    }

    fn close(&mut self) -> Result<(), MailError> {
        imap::Session::logout(self)?;
        Ok(())
    }
}

pub struct ImapClient {
    pub server: String,
    pub port: u16,
    pub user: String,
}

impl ImapClient {
    pub fn new(server: impl Into<String>, port: u16, user: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            port,
            user: user.into(),
        }
    }

    /// Logs in with an app password, retrying transient failures under
    /// `policy`. Credential and provider-policy rejections end immediately.
    pub fn connect(&self, password: &str, policy: &RetryPolicy) -> Result<ImapSession, MailError> {
        info!("Connecting to {}:{}", self.server, self.port);
        let session = login_with_retry(policy, || self.login_once(password), thread::sleep)?;
        info!("Logged in as {}", self.user);
        Ok(session)
    }

    fn login_once(&self, password: &str) -> Result<ImapSession, imap::Error> {
        let tls = TlsConnector::builder().build()?;
        let client = imap::connect((self.server.as_str(), self.port), self.server.as_str(), &tls)?;
        client.login(&self.user, password).map_err(|(e, _client)| e)
    }
}

/// How a failed login attempt should be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginFailure {
    Terminal(AuthFailure),
    /// Network or TLS trouble; retry after the normal delay.
    Connection,
    /// Anything else the server or parser reported; retry after the longer delay.
    Other,
}

pub fn classify_login_error(err: &imap::Error) -> LoginFailure {
    match err {
        imap::Error::No(text) | imap::Error::Bad(text) => match classify_server_response(text) {
            Some(auth) => LoginFailure::Terminal(auth),
            None => LoginFailure::Other,
        },
        imap::Error::Io(_)
        | imap::Error::Tls(_)
        | imap::Error::TlsHandshake(_)
        | imap::Error::ConnectionLost => LoginFailure::Connection,
        _ => LoginFailure::Other,
    }
}

/// Recognises the provider's rejection texts, e.g.
/// `[AUTHENTICATIONFAILED] Invalid credentials (Failure)` or
/// `[WEBALERT https://...] Web login required.`
pub fn classify_server_response(text: &str) -> Option<AuthFailure> {
    let lower = text.to_ascii_lowercase();
    if lower.contains("web login required")
        || lower.contains("webalert")
        || lower.contains("application-specific password required")
    {
        Some(AuthFailure::WebLoginRequired)
    } else if lower.contains("invalid credentials") || lower.contains("authenticationfailed") {
        Some(AuthFailure::InvalidCredentials)
    } else {
        None
    }
}

/// Runs `attempt` until it succeeds, hits a terminal auth failure, or the
/// policy runs out of attempts. `pause` is handed the wait before each retry:
/// the base delay after connection trouble, base plus error delay otherwise.
pub fn login_with_retry<S, F, P>(
    policy: &RetryPolicy,
    mut attempt: F,
    mut pause: P,
) -> Result<S, MailError>
where
    F: FnMut() -> Result<S, imap::Error>,
    P: FnMut(Duration),
{
    let mut n = 0;
    loop {
        n += 1;
        let err = match attempt() {
            Ok(session) => return Ok(session),
            Err(e) => e,
        };

        let after_error = match classify_login_error(&err) {
            LoginFailure::Terminal(auth) => return Err(MailError::Auth(auth)),
            LoginFailure::Connection => false,
            LoginFailure::Other => true,
        };

        if !policy.allows_retry_after(n) {
            return Err(MailError::RetriesExhausted {
                attempts: n,
                last: err.to_string(),
            });
        }
        warn!("Login attempt {n} failed, retrying: {err}");
        pause(policy.wait_for(after_error));
    }
}

/// Returns only the most recent message matching `query`.
pub fn fetch_by_filter<M: MailStore + ?Sized>(
    store: &mut M,
    mailbox: &str,
    query: &FilterQuery,
) -> Result<Option<RawMessage>, MailError> {
    store.select_mailbox(mailbox)?;
    let search = query.to_search();
    let ids = store.search_ids(&search)?;
    let Some(&latest) = ids.iter().max() else {
        info!("No message in {mailbox} matches {search}");
        return Ok(None);
    };
    debug!("{} match(es) for {search}, using {latest}", ids.len());
    store.fetch_raw(latest)
}

/// Fetches messages in the date range in server order and extracts their
/// records, stopping once `query.limit` records exist.
///
/// Messages without a readable `Date:` header are skipped. Messages that
/// yield no record are visited but do not count toward the limit.
pub fn fetch_by_date_range<M: MailStore + ?Sized>(
    store: &mut M,
    mailbox: &str,
    query: &DateRangeQuery,
) -> Result<Vec<EmailRecord>, MailError> {
    store.select_mailbox(mailbox)?;
    let ids = store.search_ids(&query.to_search())?;
    info!(
        "{} message(s) in {mailbox} between {} and {}",
        ids.len(),
        query.start,
        query.end
    );

    let mut records = Vec::new();
    for id in ids {
        if query.limit.is_some_and(|limit| records.len() >= limit) {
            break;
        }
        let Some(raw) = store.fetch_raw(id)? else {
            warn!("Message {id} came back without a body; skipping");
            continue;
        };
        let extracted = extract_records(&raw.bytes);
        let Some(first) = extracted.first() else {
            debug!("Message {id} has no plain-text part");
            continue;
        };
        match parse_email_date(&first.date) {
            Ok(date) => debug!("Message {id} dated {date}"),
            Err(e) => {
                warn!("Message {id}: {e}; skipping");
                continue;
            }
        }
        records.extend(extracted);
    }

    if let Some(limit) = query.limit {
        records.truncate(limit);
    }
    Ok(records)
}
