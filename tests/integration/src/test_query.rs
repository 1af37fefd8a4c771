//! Query builder round trips against a running server.

#[cfg(test)]
mod tests {
    use aws_sdk_dynamodb::types::AttributeValue as SdkValue;
    use dynakit_core::TableClient;
    use dynakit_core::expression::QueryBuilder;
    use dynakit_model::AttributeValue;

    use crate::{cleanup_table, create_test_table, dynamodb_client, table_engine};

    async fn seed(client: &aws_sdk_dynamodb::Client, table: &str) {
        let rows = [
            ("a#1", "20", "first-timer"),
            ("a#2", "35", "regular"),
            ("b#1", "41", "regular"),
        ];
        for (sk, age, label) in rows {
            client
                .put_item()
                .table_name(table)
                .item("pk", SdkValue::S("user#1".to_owned()))
                .item("sk", SdkValue::S(sk.to_owned()))
                .item("age", SdkValue::N(age.to_owned()))
                .item("status", SdkValue::S(label.to_owned()))
                .send()
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_query_by_partition_key_with_filter() {
        let client = dynamodb_client().await;
        let (table, _) = create_test_table(&client, "query").await;
        seed(&client, &table).await;

        let items = TableClient::new(table_engine().await, &table);
        let builder = QueryBuilder::new()
            .equals("pk", "user#1")
            .unwrap()
            .greater_than("age", 30)
            .unwrap()
            .equals("status", "regular")
            .unwrap()
            .select_fields(["sk", "status"])
            .unwrap();

        let page = items.query(&builder).await.unwrap();
        assert_eq!(page.count, Some(2));
        assert_eq!(page.scanned_count, Some(3));
        for item in &page.items {
            assert_eq!(item["status"], AttributeValue::from("regular"));
            assert!(!item.contains_key("age"));
        }

        cleanup_table(&client, &table).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_query_descending_with_limit() {
        let client = dynamodb_client().await;
        let (table, _) = create_test_table(&client, "query-desc").await;
        seed(&client, &table).await;

        let items = TableClient::new(table_engine().await, &table);
        let builder = QueryBuilder::new()
            .equals("pk", "user#1")
            .unwrap()
            .scan_forward(false)
            .with_limit(1)
            .unwrap();

        let page = items.query(&builder).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0]["sk"], AttributeValue::from("b#1"));
        assert!(page.has_more());

        cleanup_table(&client, &table).await;
    }
}
