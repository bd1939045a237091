//! Pulls email bodies from an IMAP mailbox or a text file, asks a chat
//! completion service to turn them into key/value rows, and saves the rows
//! as `.xlsx` spreadsheets.

pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod llm;
pub mod mail;
pub mod pipeline;
pub mod retry;
pub mod sheet;
