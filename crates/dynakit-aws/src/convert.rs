//! Conversions between the wire model and SDK types.

use std::collections::HashMap;

use bytes::Bytes;
use dynakit_model::stream::{Identity, Item, RawRecord, RawStreamData};
use dynakit_model::types::{OperationType, StreamViewType};
use dynakit_model::{AttributeValue, EngineError, EngineErrorKind};

/// Convert a value for a request.
pub(crate) fn to_table_value(value: AttributeValue) -> aws_sdk_dynamodb::types::AttributeValue {
    use aws_sdk_dynamodb::primitives::Blob;
    use aws_sdk_dynamodb::types::AttributeValue as Sdk;

    match value {
        AttributeValue::S(s) => Sdk::S(s),
        AttributeValue::N(n) => Sdk::N(n),
        AttributeValue::B(b) => Sdk::B(Blob::new(b.to_vec())),
        AttributeValue::Ss(ss) => Sdk::Ss(ss),
        AttributeValue::Ns(ns) => Sdk::Ns(ns),
        AttributeValue::Bs(bs) => Sdk::Bs(bs.into_iter().map(|b| Blob::new(b.to_vec())).collect()),
        AttributeValue::Bool(b) => Sdk::Bool(b),
        AttributeValue::Null(n) => Sdk::Null(n),
        AttributeValue::L(items) => Sdk::L(items.into_iter().map(to_table_value).collect()),
        AttributeValue::M(map) => Sdk::M(
            map.into_iter()
                .map(|(k, v)| (k, to_table_value(v)))
                .collect(),
        ),
    }
}

macro_rules! from_sdk_value {
    ($name:ident, $sdk:ty) => {
        pub(crate) fn $name(value: $sdk) -> Result<AttributeValue, EngineError> {
            type Sdk = $sdk;
            Ok(match value {
                Sdk::S(s) => AttributeValue::S(s),
                Sdk::N(n) => AttributeValue::N(n),
                Sdk::B(b) => AttributeValue::B(Bytes::from(b.into_inner())),
                Sdk::Ss(ss) => AttributeValue::Ss(ss),
                Sdk::Ns(ns) => AttributeValue::Ns(ns),
                Sdk::Bs(bs) => {
                    AttributeValue::Bs(bs.into_iter().map(|b| Bytes::from(b.into_inner())).collect())
                }
                Sdk::Bool(b) => AttributeValue::Bool(b),
                Sdk::Null(n) => AttributeValue::Null(n),
                Sdk::L(items) => {
                    AttributeValue::L(items.into_iter().map($name).collect::<Result<_, _>>()?)
                }
                Sdk::M(map) => AttributeValue::M(
                    map.into_iter()
                        .map(|(k, v)| $name(v).map(|v| (k, v)))
                        .collect::<Result<_, _>>()?,
                ),
                _ => {
                    return Err(EngineError::new(
                        EngineErrorKind::UnknownError,
                        "engine returned an attribute value of unknown type",
                    ));
                }
            })
        }
    };
}

// The two SDKs generate separate but identically shaped value types.
from_sdk_value!(from_table_value, aws_sdk_dynamodb::types::AttributeValue);
from_sdk_value!(from_stream_value, aws_sdk_dynamodbstreams::types::AttributeValue);

/// Convert an item for a request; empty maps become `None`.
pub(crate) fn to_table_item(
    item: Item,
) -> Option<HashMap<String, aws_sdk_dynamodb::types::AttributeValue>> {
    (!item.is_empty()).then(|| {
        item.into_iter()
            .map(|(k, v)| (k, to_table_value(v)))
            .collect()
    })
}

/// Convert an item from a response.
pub(crate) fn from_table_item(
    item: HashMap<String, aws_sdk_dynamodb::types::AttributeValue>,
) -> Result<Item, EngineError> {
    item.into_iter()
        .map(|(k, v)| from_table_value(v).map(|v| (k, v)))
        .collect()
}

fn from_stream_item(
    item: HashMap<String, aws_sdk_dynamodbstreams::types::AttributeValue>,
) -> Result<Item, EngineError> {
    item.into_iter()
        .map(|(k, v)| from_stream_value(v).map(|v| (k, v)))
        .collect()
}

/// Convert an SDK change-log record into the wire shape.
pub(crate) fn from_stream_record(
    record: aws_sdk_dynamodbstreams::types::Record,
) -> Result<RawRecord, EngineError> {
    let dynamodb = record
        .dynamodb
        .map(|data| -> Result<RawStreamData, EngineError> {
            Ok(RawStreamData {
                keys: data.keys.map(from_stream_item).transpose()?.unwrap_or_default(),
                new_image: data.new_image.map(from_stream_item).transpose()?,
                old_image: data.old_image.map(from_stream_item).transpose()?,
                sequence_number: data.sequence_number,
                size_bytes: data.size_bytes,
                stream_view_type: data
                    .stream_view_type
                    .and_then(|v| StreamViewType::from_wire(v.as_str())),
            })
        })
        .transpose()?;

    Ok(RawRecord {
        event_id: record.event_id,
        event_name: record
            .event_name
            .and_then(|op| OperationType::from_wire(op.as_str())),
        event_version: record.event_version,
        event_source: record.event_source,
        aws_region: record.aws_region,
        dynamodb,
        user_identity: record.user_identity.map(|identity| Identity {
            principal_id: identity.principal_id.unwrap_or_default(),
            kind: identity.r#type.unwrap_or_default(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use aws_sdk_dynamodbstreams::types as streams;

    use super::*;

    #[test]
    fn test_should_convert_nested_values_for_requests() {
        let value = AttributeValue::M(HashMap::from([
            ("tags".to_owned(), AttributeValue::Ss(vec!["a".to_owned()])),
            (
                "blob".to_owned(),
                AttributeValue::B(Bytes::from_static(b"\x00\x01")),
            ),
            (
                "history".to_owned(),
                AttributeValue::L(vec![AttributeValue::from(1), AttributeValue::Null(true)]),
            ),
        ]));

        let sdk = to_table_value(value.clone());
        let map = sdk.as_m().unwrap();
        assert_eq!(map["tags"].as_ss().unwrap(), &vec!["a".to_owned()]);
        assert_eq!(map["blob"].as_b().unwrap().as_ref(), b"\x00\x01");
        assert_eq!(from_table_value(sdk).unwrap(), value);
    }

    #[test]
    fn test_should_drop_empty_request_items() {
        assert!(to_table_item(Item::new()).is_none());
        let key = to_table_item(HashMap::from([("pk".to_owned(), AttributeValue::from("u1"))]));
        assert_eq!(key.unwrap()["pk"].as_s().unwrap(), "u1");
    }

    #[test]
    fn test_should_convert_stream_record() {
        let record = streams::Record::builder()
            .event_id("evt-1")
            .event_name(streams::OperationType::Modify)
            .event_source("aws:dynamodb")
            .aws_region("us-east-1")
            .dynamodb(
                streams::StreamRecord::builder()
                    .keys("pk", streams::AttributeValue::S("u1".to_owned()))
                    .new_image("pk", streams::AttributeValue::S("u1".to_owned()))
                    .new_image("age", streams::AttributeValue::N("31".to_owned()))
                    .sequence_number("100")
                    .size_bytes(24)
                    .stream_view_type(streams::StreamViewType::NewImage)
                    .build(),
            )
            .user_identity(
                streams::Identity::builder()
                    .principal_id("dynamodb.amazonaws.com")
                    .r#type("Service")
                    .build(),
            )
            .build();

        let raw = from_stream_record(record).unwrap();
        assert_eq!(raw.event_id.as_deref(), Some("evt-1"));
        assert_eq!(raw.event_name, Some(OperationType::Modify));
        let data = raw.dynamodb.unwrap();
        assert_eq!(data.keys["pk"], AttributeValue::from("u1"));
        assert_eq!(
            data.new_image.unwrap()["age"],
            AttributeValue::N("31".to_owned())
        );
        assert!(data.old_image.is_none());
        assert_eq!(data.sequence_number.as_deref(), Some("100"));
        assert_eq!(data.stream_view_type, Some(StreamViewType::NewImage));
        assert_eq!(raw.user_identity.unwrap().kind, "Service");
    }
}
