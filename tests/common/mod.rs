#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};

use rs_mail_tabulator::domain::email::{MessageId, RawMessage};
use rs_mail_tabulator::error::{MailError, ServiceError};
use rs_mail_tabulator::llm::client::{ChatMessage, ChatService};
use rs_mail_tabulator::mail::imap_client::MailStore;

/// Replays canned replies in order and records every request.
#[derive(Default)]
pub struct ScriptedChat {
    replies: RefCell<VecDeque<Option<String>>>,
    pub requests: RefCell<Vec<Vec<ChatMessage>>>,
}

impl ScriptedChat {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            replies: RefCell::new(replies.into_iter().map(|r| r.map(Into::into)).collect()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }

    /// System prompt of the n-th request.
    pub fn system_prompt(&self, n: usize) -> String {
        self.requests.borrow()[n][0].content.clone()
    }
}

impl ChatService for ScriptedChat {
    fn complete(&self, messages: &[ChatMessage]) -> Result<Option<String>, ServiceError> {
        self.requests.borrow_mut().push(messages.to_vec());
        Ok(self
            .replies
            .borrow_mut()
            .pop_front()
            .expect("service called more often than scripted"))
    }
}

/// In-memory mailbox keyed by sequence number.
#[derive(Default)]
pub struct FakeStore {
    pub messages: BTreeMap<MessageId, Vec<u8>>,
    pub selected: Vec<String>,
    pub searches: Vec<String>,
    pub fetched: Vec<MessageId>,
    pub closed: bool,
    /// Fetching this id fails as if the connection dropped.
    pub fail_on: Option<MessageId>,
}

impl FakeStore {
    pub fn with_messages<I>(messages: I) -> Self
    where
        I: IntoIterator<Item = (MessageId, Vec<u8>)>,
    {
        Self {
            messages: messages.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl MailStore for FakeStore {
    fn select_mailbox(&mut self, mailbox: &str) -> Result<(), MailError> {
        self.selected.push(mailbox.to_string());
        Ok(())
    }

    fn search_ids(&mut self, query: &str) -> Result<Vec<MessageId>, MailError> {
        self.searches.push(query.to_string());
        Ok(self.messages.keys().copied().collect())
    }

    fn fetch_raw(&mut self, id: MessageId) -> Result<Option<RawMessage>, MailError> {
        self.fetched.push(id);
        if self.fail_on == Some(id) {
            return Err(MailError::Imap(imap::Error::ConnectionLost));
        }
        Ok(self.messages.get(&id).map(|b| RawMessage {
            id,
            bytes: b.clone(),
        }))
    }

    fn close(&mut self) -> Result<(), MailError> {
        self.closed = true;
        Ok(())
    }
}

pub fn plain_message(subject: &str, date: &str, body: &str) -> Vec<u8> {
    format!(
        "From: Jane <jane@example.com>\r\nTo: me@example.com\r\nSubject: {subject}\r\nDate: {date}\r\nContent-Type: text/plain\r\n\r\n{body}"
    )
    .into_bytes()
}

pub fn html_message(subject: &str, date: &str) -> Vec<u8> {
    format!(
        "From: news@example.com\r\nSubject: {subject}\r\nDate: {date}\r\nContent-Type: text/html\r\n\r\n<p>hello</p>"
    )
    .into_bytes()
}

pub const DATE: &str = "Tue, 20 Jun 2023 03:15:04 -0500";
