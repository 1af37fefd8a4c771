//! AWS SDK adapters for dynakit.
//!
//! [`DynamoDbTableEngine`] implements [`ItemEngine`](dynakit_core::ItemEngine)
//! over `aws-sdk-dynamodb`, and [`DynamoDbStreamsEngine`] implements
//! [`ChangeLogEngine`](dynakit_core::ChangeLogEngine) over
//! `aws-sdk-dynamodbstreams`. Both normalize SDK failures into
//! [`EngineError`](dynakit_model::EngineError).
#![allow(clippy::doc_markdown)]

pub mod config;
mod convert;
mod error;
mod streams;
mod table;

pub use config::AwsConfig;
pub use streams::DynamoDbStreamsEngine;
pub use table::DynamoDbTableEngine;
