//! Update compiler round trips against a running server.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use aws_sdk_dynamodb::types::AttributeValue as SdkValue;
    use dynakit_core::expression::{CompiledExpression, UpdateOperationBuilder};
    use dynakit_core::{Error, TableClient};
    use dynakit_model::types::ReturnValue;
    use dynakit_model::{AttributeValue, EngineErrorKind};

    use crate::{cleanup_table, create_test_table, dynamodb_client, table_engine};

    fn key() -> HashMap<String, AttributeValue> {
        HashMap::from([
            ("pk".to_owned(), AttributeValue::from("user#1")),
            ("sk".to_owned(), AttributeValue::from("profile")),
        ])
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_apply_every_clause() {
        let client = dynamodb_client().await;
        let (table, _) = create_test_table(&client, "update").await;
        client
            .put_item()
            .table_name(&table)
            .item("pk", SdkValue::S("user#1".to_owned()))
            .item("sk", SdkValue::S("profile".to_owned()))
            .item("visits", SdkValue::N("5".to_owned()))
            .item("nickname", SdkValue::S("old".to_owned()))
            .item("tags", SdkValue::Ss(vec!["a".to_owned(), "b".to_owned()]))
            .send()
            .await
            .unwrap();

        let items = TableClient::new(table_engine().await, &table);
        let updates = UpdateOperationBuilder::new()
            .set("status", "active")
            .unwrap()
            .remove("nickname")
            .unwrap()
            .decrement("visits", 2)
            .unwrap()
            .delete("tags", AttributeValue::Ss(vec!["a".to_owned()]))
            .unwrap()
            .append_to_list("history", "login")
            .unwrap();

        let output = items
            .update(key(), &updates, None, Some(ReturnValue::AllNew))
            .await
            .unwrap();

        let attrs = output.attributes;
        assert_eq!(attrs["status"], AttributeValue::from("active"));
        assert_eq!(attrs["visits"], AttributeValue::N("3".to_owned()));
        assert!(!attrs.contains_key("nickname"));
        assert_eq!(attrs["tags"], AttributeValue::Ss(vec!["b".to_owned()]));
        assert_eq!(
            attrs["history"],
            AttributeValue::L(vec![AttributeValue::from("login")])
        );

        cleanup_table(&client, &table).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_failed_condition() {
        let client = dynamodb_client().await;
        let (table, _) = create_test_table(&client, "update-cond").await;

        let items = TableClient::new(table_engine().await, &table);
        let updates = UpdateOperationBuilder::new().increment("visits", 1).unwrap();
        let condition = CompiledExpression::new("attribute_exists(#pk)").with_name("#pk", "pk");

        let err = items
            .update(key(), &updates, Some(&condition), None)
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::Engine(ref e) if e.kind == EngineErrorKind::ConditionalCheckFailed)
        );

        cleanup_table(&client, &table).await;
    }
}
