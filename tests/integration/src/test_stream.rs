//! Stream processing against a running server.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use aws_sdk_dynamodb::types::AttributeValue as SdkValue;
    use dynakit_core::StreamProcessingConfig;
    use dynakit_core::stream::{ProcessorState, StreamCursorProcessor};
    use dynakit_model::stream::StreamRecord;
    use dynakit_model::types::OperationType;

    use crate::{cleanup_table, create_test_table, dynamodb_client, streams_engine};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_deliver_table_changes_in_order() {
        let client = dynamodb_client().await;
        let (table, stream_arn) = create_test_table(&client, "stream").await;
        for i in 0..5 {
            client
                .put_item()
                .table_name(&table)
                .item("pk", SdkValue::S("user#1".to_owned()))
                .item("sk", SdkValue::S(format!("event#{i}")))
                .send()
                .await
                .unwrap();
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = move |records: Vec<StreamRecord>| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().extend(records);
                Ok::<(), anyhow::Error>(())
            }
        };

        let config = StreamProcessingConfig::default()
            .with_batch_size(2)
            .with_max_records(5)
            .with_poll_interval(Duration::from_millis(100));
        let mut processor = StreamCursorProcessor::new(streams_engine().await, config).unwrap();
        let summary = tokio::time::timeout(
            Duration::from_secs(30),
            processor.process_stream(&stream_arn, &handler),
        )
        .await
        .expect("stream processing timed out")
        .unwrap();

        assert_eq!(summary.records_processed, 5);
        assert!(summary.batches >= 3);
        assert_eq!(processor.state(), &ProcessorState::Done);

        let seen = seen.lock().unwrap();
        let keys: Vec<&str> = seen
            .iter()
            .filter_map(|r| r.dynamodb.keys.get("sk").and_then(|v| v.as_s()))
            .collect();
        assert_eq!(keys, vec!["event#0", "event#1", "event#2", "event#3", "event#4"]);
        assert!(seen.iter().all(|r| r.event_name == Some(OperationType::Insert)));

        cleanup_table(&client, &table).await;
    }
}
