//! DynamoDB wire model types for dynakit.
//!
//! These are the plain data structures exchanged between the expression
//! builders in `dynakit-core` and whatever engine adapter executes them:
//! attribute values, request inputs, normalized result pages, change-log
//! (stream) records, and the closed engine error taxonomy.
// "DynamoDB" appears in virtually every doc comment in this crate.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]
#![allow(missing_docs)]

pub mod attribute_value;
pub mod error;
pub mod input;
pub mod output;
pub mod stream;
pub mod types;

pub use attribute_value::AttributeValue;
pub use error::{EngineError, EngineErrorKind, EngineResult};
