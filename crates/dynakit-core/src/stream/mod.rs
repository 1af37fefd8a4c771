//! Change-log processing.
//!
//! [`StreamCursorProcessor`] walks every shard of a change log in turn, pulls
//! records through opaque cursors, and hands normalized batches to a
//! [`RecordHandler`]. Shards are processed one at a time.

mod budget;
mod processor;

use std::future::Future;

use async_trait::async_trait;
use dynakit_model::EngineError;
use dynakit_model::stream::StreamRecord;

pub use budget::RecordBudget;
pub use processor::{ProcessorState, StreamCursorProcessor, StreamRunSummary};

/// Errors that end a stream processing run.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The engine failed and the run was configured to stop.
    #[error("change log engine failed: {0}")]
    Engine(#[from] EngineError),
    /// The record handler failed and the run was configured to stop.
    #[error("record handler failed: {0:#}")]
    Handler(anyhow::Error),
    /// The configuration does not satisfy its invariants.
    #[error("invalid stream configuration: {0}")]
    InvalidConfig(String),
}

/// Consumer of record batches.
///
/// Any `Fn(Vec<StreamRecord>) -> impl Future<Output = anyhow::Result<()>>`
/// closure is a handler.
#[async_trait]
pub trait RecordHandler: Send + Sync {
    /// Process one batch. An error is treated according to `stop_on_error`.
    async fn handle(&self, records: Vec<StreamRecord>) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> RecordHandler for F
where
    F: Fn(Vec<StreamRecord>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, records: Vec<StreamRecord>) -> anyhow::Result<()> {
        self(records).await
    }
}
