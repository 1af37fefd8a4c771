//! Adapter traits for the remote engine.
//!
//! The core never performs I/O of its own; everything it needs from a
//! DynamoDB-compatible service goes through these two traits. Implementations
//! normalize failures into [`EngineError`](dynakit_model::EngineError).

use std::sync::Arc;

use async_trait::async_trait;
use dynakit_model::EngineResult;
use dynakit_model::input::{QueryInput, ScanInput, UpdateItemInput};
use dynakit_model::output::{ItemPage, UpdateItemOutput};
use dynakit_model::stream::{ChangeLogDescription, Cursor, RecordPage, StartingPosition};

/// Read access to a change log (a DynamoDB stream).
#[async_trait]
pub trait ChangeLogEngine: Send + Sync {
    /// List every shard of the log identified by `log_id`.
    async fn describe_change_log(&self, log_id: &str) -> EngineResult<ChangeLogDescription>;

    /// Obtain a cursor into `shard_id`.
    ///
    /// `Ok(None)` means the shard no longer exists (trimmed or expired).
    async fn get_cursor(
        &self,
        log_id: &str,
        shard_id: &str,
        position: &StartingPosition,
    ) -> EngineResult<Option<Cursor>>;

    /// Fetch at most `limit` records starting at `cursor`.
    async fn fetch_records(&self, cursor: &Cursor, limit: usize) -> EngineResult<RecordPage>;
}

/// Item-level operations on a table.
#[async_trait]
pub trait ItemEngine: Send + Sync {
    /// Run a `Query`.
    async fn query(&self, input: QueryInput) -> EngineResult<ItemPage>;

    /// Run a `Scan`.
    async fn scan(&self, input: ScanInput) -> EngineResult<ItemPage>;

    /// Run an `UpdateItem`.
    async fn update_item(&self, input: UpdateItemInput) -> EngineResult<UpdateItemOutput>;
}

#[async_trait]
impl<T: ChangeLogEngine + ?Sized> ChangeLogEngine for Arc<T> {
    async fn describe_change_log(&self, log_id: &str) -> EngineResult<ChangeLogDescription> {
        (**self).describe_change_log(log_id).await
    }

    async fn get_cursor(
        &self,
        log_id: &str,
        shard_id: &str,
        position: &StartingPosition,
    ) -> EngineResult<Option<Cursor>> {
        (**self).get_cursor(log_id, shard_id, position).await
    }

    async fn fetch_records(&self, cursor: &Cursor, limit: usize) -> EngineResult<RecordPage> {
        (**self).fetch_records(cursor, limit).await
    }
}

#[async_trait]
impl<T: ItemEngine + ?Sized> ItemEngine for Arc<T> {
    async fn query(&self, input: QueryInput) -> EngineResult<ItemPage> {
        (**self).query(input).await
    }

    async fn scan(&self, input: ScanInput) -> EngineResult<ItemPage> {
        (**self).scan(input).await
    }

    async fn update_item(&self, input: UpdateItemInput) -> EngineResult<UpdateItemOutput> {
        (**self).update_item(input).await
    }
}
