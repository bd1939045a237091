pub mod client;
pub mod extraction;
