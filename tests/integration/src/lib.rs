//! Integration tests for dynakit against a DynamoDB-compatible server.
//!
//! These tests require a server at `localhost:4566` (override with
//! `DYNAKIT_ENDPOINT_URL`). They are marked `#[ignore]` so they don't run
//! during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! cargo test -p dynakit-integration -- --ignored
//! ```

use std::sync::Once;

use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType,
    StreamSpecification, StreamViewType,
};
use dynakit_aws::{AwsConfig, DynamoDbStreamsEngine, DynamoDbTableEngine};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the server.
fn endpoint_url() -> String {
    std::env::var("DYNAKIT_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:4566".to_owned())
}

/// Adapter configuration pointing at the local server.
#[must_use]
pub fn aws_config() -> AwsConfig {
    init_tracing();
    AwsConfig::default()
        .with_endpoint_url(endpoint_url())
        .with_credentials("test", "test")
}

/// Raw DynamoDB client, for fixtures the adapters don't cover.
pub async fn dynamodb_client() -> aws_sdk_dynamodb::Client {
    aws_sdk_dynamodb::Client::new(&aws_config().load().await)
}

/// Item engine pointing at the local server.
pub async fn table_engine() -> DynamoDbTableEngine {
    DynamoDbTableEngine::from_config(&aws_config()).await
}

/// Change-log engine pointing at the local server.
pub async fn streams_engine() -> DynamoDbStreamsEngine {
    DynamoDbStreamsEngine::from_config(&aws_config()).await
}

/// Generate a unique table name for a test.
#[must_use]
pub fn test_table_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Create a `pk`/`sk` string-keyed table with a `NEW_AND_OLD_IMAGES` stream.
///
/// Returns the table name and the stream ARN. Caller is responsible for cleanup.
pub async fn create_test_table(client: &aws_sdk_dynamodb::Client, prefix: &str) -> (String, String) {
    let name = test_table_name(prefix);
    let key = |attr: &str, key_type: KeyType| {
        KeySchemaElement::builder()
            .attribute_name(attr)
            .key_type(key_type)
            .build()
            .unwrap()
    };
    let definition = |attr: &str| {
        AttributeDefinition::builder()
            .attribute_name(attr)
            .attribute_type(ScalarAttributeType::S)
            .build()
            .unwrap()
    };

    let output = client
        .create_table()
        .table_name(&name)
        .key_schema(key("pk", KeyType::Hash))
        .key_schema(key("sk", KeyType::Range))
        .attribute_definitions(definition("pk"))
        .attribute_definitions(definition("sk"))
        .billing_mode(BillingMode::PayPerRequest)
        .stream_specification(
            StreamSpecification::builder()
                .stream_enabled(true)
                .stream_view_type(StreamViewType::NewAndOldImages)
                .build()
                .unwrap(),
        )
        .send()
        .await
        .unwrap_or_else(|e| panic!("failed to create table {name}: {e}"));

    let stream_arn = output
        .table_description()
        .and_then(|d| d.latest_stream_arn())
        .unwrap_or_else(|| panic!("table {name} has no stream"))
        .to_owned();
    (name, stream_arn)
}

/// Delete a table, ignoring errors.
pub async fn cleanup_table(client: &aws_sdk_dynamodb::Client, table_name: &str) {
    let _ = client.delete_table().table_name(table_name).send().await;
}

mod test_query;
mod test_scan;
mod test_stream;
mod test_update;
