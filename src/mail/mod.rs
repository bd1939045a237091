pub mod date;
pub mod decoders;
pub mod extract;
pub mod file_source;
pub mod imap_client;
