pub mod writer;

pub use writer::{Table, TableWriter, sanitize_subject};
