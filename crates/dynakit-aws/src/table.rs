//! Item engine over the DynamoDB API.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::{ReturnValue, Select};
use dynakit_core::ItemEngine;
use dynakit_model::input::{QueryInput, ScanInput, UpdateItemInput};
use dynakit_model::output::{ItemPage, UpdateItemOutput};
use dynakit_model::stream::Item;
use dynakit_model::{EngineError, EngineResult};

use crate::config::AwsConfig;
use crate::convert::{from_table_item, to_table_item, to_table_value};
use crate::error::from_sdk;

/// [`ItemEngine`] backed by the DynamoDB API.
#[derive(Debug, Clone)]
pub struct DynamoDbTableEngine {
    client: Client,
}

impl DynamoDbTableEngine {
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

fn names(names: HashMap<String, String>) -> Option<HashMap<String, String>> {
    (!names.is_empty()).then_some(names)
}

fn page(
    items: Option<Vec<HashMap<String, aws_sdk_dynamodb::types::AttributeValue>>>,
    last_key: Option<HashMap<String, aws_sdk_dynamodb::types::AttributeValue>>,
    count: i32,
    scanned_count: i32,
) -> Result<ItemPage, EngineError> {
    Ok(ItemPage {
        items: items
            .unwrap_or_default()
            .into_iter()
            .map(from_table_item)
            .collect::<Result<Vec<Item>, _>>()?,
        last_key: last_key.map(from_table_item).transpose()?,
        count: usize::try_from(count).ok(),
        scanned_count: usize::try_from(scanned_count).ok(),
    })
}

#[async_trait]
impl ItemEngine for DynamoDbTableEngine {
    async fn query(&self, input: QueryInput) -> EngineResult<ItemPage> {
        let output = self
            .client
            .query()
            .table_name(input.table_name)
            .set_index_name(input.index_name)
            .key_condition_expression(input.key_condition_expression)
            .set_filter_expression(input.filter_expression)
            .set_projection_expression(input.projection_expression)
            .set_expression_attribute_names(names(input.expression_attribute_names))
            .set_expression_attribute_values(to_table_item(input.expression_attribute_values))
            .set_scan_index_forward(input.scan_index_forward)
            .set_limit(input.limit)
            .set_exclusive_start_key(to_table_item(input.exclusive_start_key))
            .set_select(input.select.map(|s| Select::from(s.as_str())))
            .set_consistent_read(input.consistent_read)
            .send()
            .await
            .map_err(from_sdk)?;

        page(
            output.items,
            output.last_evaluated_key,
            output.count,
            output.scanned_count,
        )
    }

    async fn scan(&self, input: ScanInput) -> EngineResult<ItemPage> {
        let output = self
            .client
            .scan()
            .table_name(input.table_name)
            .set_index_name(input.index_name)
            .set_filter_expression(input.filter_expression)
            .set_projection_expression(input.projection_expression)
            .set_expression_attribute_names(names(input.expression_attribute_names))
            .set_expression_attribute_values(to_table_item(input.expression_attribute_values))
            .set_limit(input.limit)
            .set_exclusive_start_key(to_table_item(input.exclusive_start_key))
            .set_segment(input.segment)
            .set_total_segments(input.total_segments)
            .set_select(input.select.map(|s| Select::from(s.as_str())))
            .set_consistent_read(input.consistent_read)
            .send()
            .await
            .map_err(from_sdk)?;

        page(
            output.items,
            output.last_evaluated_key,
            output.count,
            output.scanned_count,
        )
    }

    async fn update_item(&self, input: UpdateItemInput) -> EngineResult<UpdateItemOutput> {
        let output = self
            .client
            .update_item()
            .table_name(input.table_name)
            .set_key(Some(
                input
                    .key
                    .into_iter()
                    .map(|(k, v)| (k, to_table_value(v)))
                    .collect(),
            ))
            .update_expression(input.update_expression)
            .set_condition_expression(input.condition_expression)
            .set_expression_attribute_names(names(input.expression_attribute_names))
            .set_expression_attribute_values(to_table_item(input.expression_attribute_values))
            .set_return_values(input.return_values.map(|r| ReturnValue::from(r.as_str())))
            .send()
            .await
            .map_err(from_sdk)?;

        Ok(UpdateItemOutput {
            attributes: output
                .attributes
                .map(from_table_item)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}
