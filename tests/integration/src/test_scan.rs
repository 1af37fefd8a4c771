//! Scan builder round trips against a running server.

#[cfg(test)]
mod tests {
    use aws_sdk_dynamodb::types::AttributeValue as SdkValue;
    use dynakit_core::TableClient;
    use dynakit_core::expression::ScanBuilder;
    use dynakit_model::AttributeValue;

    use crate::{cleanup_table, create_test_table, dynamodb_client, table_engine};

    async fn seed(client: &aws_sdk_dynamodb::Client, table: &str) {
        for i in 0..6 {
            let mut request = client
                .put_item()
                .table_name(table)
                .item("pk", SdkValue::S(format!("user#{i}")))
                .item("sk", SdkValue::S("profile".to_owned()))
                .item("score", SdkValue::N((i * 10).to_string()));
            if i % 2 == 0 {
                request = request.item("email", SdkValue::S(format!("u{i}@example.com")));
            }
            request.send().await.unwrap();
        }
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_scan_with_combined_filters() {
        let client = dynamodb_client().await;
        let (table, _) = create_test_table(&client, "scan").await;
        seed(&client, &table).await;

        let items = TableClient::new(table_engine().await, &table);
        let builder = ScanBuilder::new()
            .attribute_exists("email")
            .unwrap()
            .filter_with_values(
                "score BETWEEN :lo AND :hi",
                [
                    (":lo", AttributeValue::from(10)),
                    (":hi", AttributeValue::from(40)),
                ],
            )
            .unwrap();

        let page = items.scan(&builder).await.unwrap();
        let mut users: Vec<String> = page
            .items
            .iter()
            .filter_map(|item| item["pk"].as_s().map(ToOwned::to_owned))
            .collect();
        users.sort();
        assert_eq!(users, vec!["user#2", "user#4"]);

        cleanup_table(&client, &table).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_cover_table_with_parallel_segments() {
        let client = dynamodb_client().await;
        let (table, _) = create_test_table(&client, "scan-parallel").await;
        seed(&client, &table).await;

        let items = TableClient::new(table_engine().await, &table);
        let mut total = 0;
        for segment in 0..3 {
            let builder = ScanBuilder::new().with_parallel_scan(3, segment).unwrap();
            total += items.scan(&builder).await.unwrap().items.len();
        }
        assert_eq!(total, 6);

        cleanup_table(&client, &table).await;
    }
}
