//! Sequential shard walker.
//!
//! ```text
//! Idle -> Describing -> (Iterating <-> Waiting)* -> Done | Failed
//! ```
//!
//! Each shard is drained in turn: acquire a cursor, fetch, hand the batch to
//! the handler, advance. An empty page means the shard is idle and is polled
//! again after `poll_interval`. The run ends when every shard is exhausted or
//! the record budget is spent.

use std::collections::HashMap;

use dynakit_model::EngineErrorKind;
use dynakit_model::stream::{RecordPage, Shard, StreamRecord};
use dynakit_model::types::StreamViewType;
use tracing::{debug, error, info, warn};

use super::budget::RecordBudget;
use super::{RecordHandler, StreamError};
use crate::config::StreamProcessingConfig;
use crate::engine::ChangeLogEngine;

/// Observable state of a [`StreamCursorProcessor`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProcessorState {
    /// Not started.
    #[default]
    Idle,
    /// Enumerating shards.
    Describing,
    /// Fetching or delivering records of a shard.
    Iterating {
        /// The shard being read.
        shard_id: String,
    },
    /// Sleeping before the next poll of a shard.
    Waiting {
        /// The shard being polled.
        shard_id: String,
    },
    /// Finished normally.
    Done,
    /// Aborted by an unrecovered error.
    Failed,
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamRunSummary {
    /// Records the handler accepted.
    pub records_processed: usize,
    /// Batches the handler accepted.
    pub batches: usize,
    /// Shards a cursor was requested for.
    pub shards_visited: usize,
    /// Shards read until the engine reported no further cursor.
    pub shards_exhausted: usize,
    /// Fetch, cursor and handler failures logged and retried.
    pub errors_recovered: usize,
}

/// Drives one change log through a [`RecordHandler`].
#[derive(Debug)]
pub struct StreamCursorProcessor<E> {
    engine: E,
    config: StreamProcessingConfig,
    state: ProcessorState,
}

enum ShardOutcome {
    Exhausted,
    BudgetSpent,
    Skipped,
}

impl<E: ChangeLogEngine> StreamCursorProcessor<E> {
    /// Create a processor; the configuration is validated here and fixed for
    /// every run.
    pub fn new(engine: E, config: StreamProcessingConfig) -> Result<Self, StreamError> {
        config.validate()?;
        Ok(Self {
            engine,
            config,
            state: ProcessorState::Idle,
        })
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &ProcessorState {
        &self.state
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &StreamProcessingConfig {
        &self.config
    }

    /// Process every shard of `log_id`, delivering batches to `handler`.
    ///
    /// Returns once all shards are exhausted or `max_records` records have been
    /// delivered. With `stop_on_error` unset, fetch and handler failures are
    /// logged and the same cursor is retried after `poll_interval`. A shard
    /// whose cursor or records are no longer available is skipped.
    pub async fn process_stream<H>(
        &mut self,
        log_id: &str,
        handler: &H,
    ) -> Result<StreamRunSummary, StreamError>
    where
        H: RecordHandler + ?Sized,
    {
        let result = self.run(log_id, handler).await;
        match &result {
            Ok(summary) => {
                self.state = ProcessorState::Done;
                info!(
                    log_id,
                    records = summary.records_processed,
                    batches = summary.batches,
                    shards = summary.shards_visited,
                    recovered = summary.errors_recovered,
                    "stream processing finished"
                );
            }
            Err(e) => {
                self.state = ProcessorState::Failed;
                error!(log_id, error = %e, "stream processing failed");
            }
        }
        result
    }

    async fn run<H>(&mut self, log_id: &str, handler: &H) -> Result<StreamRunSummary, StreamError>
    where
        H: RecordHandler + ?Sized,
    {
        self.state = ProcessorState::Describing;
        let description = self.engine.describe_change_log(log_id).await?;
        let view_type = description.view_type;
        let shards = order_shards(description.shards);
        info!(log_id, shards = shards.len(), ?view_type, "described change log");

        let budget = RecordBudget::new(self.config.max_records);
        let mut summary = StreamRunSummary::default();

        for shard in &shards {
            if budget.is_exhausted() {
                break;
            }
            summary.shards_visited += 1;
            match self
                .process_shard(
                    log_id,
                    &shard.shard_id,
                    view_type,
                    handler,
                    &budget,
                    &mut summary,
                )
                .await?
            {
                ShardOutcome::Exhausted => {
                    summary.shards_exhausted += 1;
                    info!(shard_id = %shard.shard_id, "shard exhausted");
                }
                ShardOutcome::BudgetSpent => {
                    info!(shard_id = %shard.shard_id, used = budget.used(), "record budget spent");
                    break;
                }
                ShardOutcome::Skipped => {}
            }
        }
        Ok(summary)
    }

    async fn process_shard<H>(
        &mut self,
        log_id: &str,
        shard_id: &str,
        view_type: Option<StreamViewType>,
        handler: &H,
        budget: &RecordBudget,
        summary: &mut StreamRunSummary,
    ) -> Result<ShardOutcome, StreamError>
    where
        H: RecordHandler + ?Sized,
    {
        self.state = ProcessorState::Iterating {
            shard_id: shard_id.to_owned(),
        };
        let cursor = self
            .engine
            .get_cursor(log_id, shard_id, &self.config.starting_position)
            .await;
        let mut cursor = match cursor {
            Ok(Some(cursor)) => cursor,
            Ok(None) => {
                warn!(shard_id, "shard no longer available, skipping");
                return Ok(ShardOutcome::Skipped);
            }
            Err(e) if e.kind == EngineErrorKind::ResourceNotFound => {
                warn!(shard_id, error = %e, "shard no longer available, skipping");
                return Ok(ShardOutcome::Skipped);
            }
            Err(e) => {
                self.recover(StreamError::Engine(e), shard_id, summary)?;
                return Ok(ShardOutcome::Skipped);
            }
        };
        info!(shard_id, %cursor, "processing shard");

        loop {
            if budget.is_exhausted() {
                return Ok(ShardOutcome::BudgetSpent);
            }
            self.state = ProcessorState::Iterating {
                shard_id: shard_id.to_owned(),
            };

            let limit = budget.fetch_limit(self.config.batch_size);
            let RecordPage {
                mut records,
                next_cursor,
            } = match self.engine.fetch_records(&cursor, limit).await {
                Ok(page) => page,
                Err(e) if e.kind == EngineErrorKind::ResourceNotFound => {
                    warn!(shard_id, error = %e, "shard records no longer available, skipping");
                    return Ok(ShardOutcome::Skipped);
                }
                Err(e) => {
                    self.recover(StreamError::Engine(e), shard_id, summary)?;
                    self.wait(shard_id).await;
                    continue;
                }
            };

            if records.is_empty() {
                let Some(next) = next_cursor else {
                    return Ok(ShardOutcome::Exhausted);
                };
                cursor = next;
                self.wait(shard_id).await;
                continue;
            }

            let granted = budget.reserve(records.len().min(limit));
            if granted == 0 {
                return Ok(ShardOutcome::BudgetSpent);
            }
            records.truncate(granted);
            // Records that omit their view type carry the log's.
            let batch: Vec<StreamRecord> = records
                .into_iter()
                .map(|mut raw| {
                    if let Some(data) = raw.dynamodb.as_mut() {
                        data.stream_view_type = data.stream_view_type.or(view_type);
                    }
                    StreamRecord::from(raw)
                })
                .collect();
            debug!(shard_id, records = batch.len(), "delivering batch");

            if let Err(e) = handler.handle(batch).await {
                budget.release(granted);
                self.recover(StreamError::Handler(e), shard_id, summary)?;
                self.wait(shard_id).await;
                continue;
            }
            summary.records_processed += granted;
            summary.batches += 1;

            match next_cursor {
                Some(next) => cursor = next,
                None => return Ok(ShardOutcome::Exhausted),
            }
        }
    }

    /// Apply the stop-or-continue policy to a failure.
    fn recover(
        &self,
        error: StreamError,
        shard_id: &str,
        summary: &mut StreamRunSummary,
    ) -> Result<(), StreamError> {
        if self.config.stop_on_error {
            return Err(error);
        }
        summary.errors_recovered += 1;
        warn!(shard_id, error = %error, "recoverable stream error, retrying after poll interval");
        Ok(())
    }

    async fn wait(&mut self, shard_id: &str) {
        self.state = ProcessorState::Waiting {
            shard_id: shard_id.to_owned(),
        };
        tokio::time::sleep(self.config.poll_interval).await;
    }
}

/// Order shards so that every parent present in the set precedes its children.
/// Otherwise the described order is kept.
fn order_shards(shards: Vec<Shard>) -> Vec<Shard> {
    let index: HashMap<&str, usize> = shards
        .iter()
        .enumerate()
        .map(|(i, s)| (s.shard_id.as_str(), i))
        .collect();

    let mut visited = vec![false; shards.len()];
    let mut order = Vec::with_capacity(shards.len());
    for start in 0..shards.len() {
        let mut lineage = Vec::new();
        let mut current = Some(start);
        while let Some(i) = current {
            if visited[i] {
                break;
            }
            visited[i] = true;
            lineage.push(i);
            current = shards[i]
                .parent_shard_id
                .as_deref()
                .and_then(|parent| index.get(parent).copied());
        }
        order.extend(lineage.into_iter().rev());
    }

    let mut slots: Vec<Option<Shard>> = shards.into_iter().map(Some).collect();
    order.into_iter().filter_map(|i| slots[i].take()).collect()
}
