//! Expression compilation and change-log processing for DynamoDB-compatible engines.
//!
//! The crate has two halves:
//!
//! - [`expression`] turns typed conditions and updates into wire expressions.
//! - [`stream`] walks the shards of a change log and feeds records to a handler.
//!
//! Both talk to the remote engine only through the traits in [`engine`].
#![allow(clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod config;
pub mod engine;
pub mod error;
pub mod expression;
pub mod stream;
pub mod table;

pub use config::StreamProcessingConfig;
pub use engine::{ChangeLogEngine, ItemEngine};
pub use error::{Error, Result};
pub use table::TableClient;
