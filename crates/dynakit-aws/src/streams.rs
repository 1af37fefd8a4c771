//! Change-log engine over DynamoDB Streams.

use async_trait::async_trait;
use aws_sdk_dynamodbstreams::Client;
use aws_sdk_dynamodbstreams::types::ShardIteratorType;
use dynakit_core::ChangeLogEngine;
use dynakit_model::stream::{ChangeLogDescription, Cursor, RecordPage, Shard, StartingPosition};
use dynakit_model::types::StreamViewType;
use dynakit_model::{EngineErrorKind, EngineResult};
use tracing::debug;

use crate::config::AwsConfig;
use crate::convert::from_stream_record;
use crate::error::from_sdk;

/// [`ChangeLogEngine`] backed by the DynamoDB Streams API.
///
/// `log_id` is the stream ARN.
#[derive(Debug, Clone)]
pub struct DynamoDbStreamsEngine {
    client: Client,
}

impl DynamoDbStreamsEngine {
    /// Wrap an existing client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from [`AwsConfig`].
    pub async fn from_config(config: &AwsConfig) -> Self {
        let sdk = config.load().await;
        Self::new(Client::new(&sdk))
    }
}

#[async_trait]
impl ChangeLogEngine for DynamoDbStreamsEngine {
    async fn describe_change_log(&self, log_id: &str) -> EngineResult<ChangeLogDescription> {
        let mut shards = Vec::new();
        let mut view_type = None;
        let mut start_shard_id = None;

        loop {
            let output = self
                .client
                .describe_stream()
                .stream_arn(log_id)
                .set_exclusive_start_shard_id(start_shard_id.take())
                .send()
                .await
                .map_err(from_sdk)?;
            let Some(description) = output.stream_description else {
                break;
            };

            if view_type.is_none() {
                view_type = description
                    .stream_view_type
                    .as_ref()
                    .and_then(|v| StreamViewType::from_wire(v.as_str()));
            }
            shards.extend(description.shards.unwrap_or_default().into_iter().filter_map(
                |shard| {
                    let mut converted = Shard::new(shard.shard_id?);
                    converted.parent_shard_id = shard.parent_shard_id;
                    Some(converted)
                },
            ));

            match description.last_evaluated_shard_id {
                Some(last) => start_shard_id = Some(last),
                None => break,
            }
        }

        debug!(log_id, shards = shards.len(), "described stream");
        Ok(ChangeLogDescription { shards, view_type })
    }

    async fn get_cursor(
        &self,
        log_id: &str,
        shard_id: &str,
        position: &StartingPosition,
    ) -> EngineResult<Option<Cursor>> {
        let result = self
            .client
            .get_shard_iterator()
            .stream_arn(log_id)
            .shard_id(shard_id)
            .shard_iterator_type(ShardIteratorType::from(position.iterator_type()))
            .set_sequence_number(position.sequence_number().map(ToOwned::to_owned))
            .send()
            .await;

        match result {
            Ok(output) => Ok(output.shard_iterator.map(Cursor::new)),
            Err(err) => {
                let err = from_sdk(err);
                if err.kind == EngineErrorKind::ResourceNotFound {
                    debug!(shard_id, error = %err, "shard iterator not available");
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn fetch_records(&self, cursor: &Cursor, limit: usize) -> EngineResult<RecordPage> {
        let output = self
            .client
            .get_records()
            .shard_iterator(cursor.as_str())
            .limit(i32::try_from(limit).unwrap_or(i32::MAX))
            .send()
            .await
            .map_err(from_sdk)?;

        let records = output
            .records
            .unwrap_or_default()
            .into_iter()
            .map(from_stream_record)
            .collect::<EngineResult<Vec<_>>>()?;

        Ok(RecordPage {
            records,
            next_cursor: output.next_shard_iterator.map(Cursor::new),
        })
    }
}
