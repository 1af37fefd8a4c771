//! Change-log (stream) types.
//!
//! [`RawRecord`] mirrors the `GetRecords` wire shape (camelCase envelope,
//! PascalCase `dynamodb` body). [`StreamRecord`] is the flattened form record
//! handlers receive; every optional wire field has a concrete default there.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attribute_value::AttributeValue;
use crate::types::{OperationType, StreamViewType};

/// An item as a map of attribute name to value.
pub type Item = HashMap<String, AttributeValue>;

/// One partition of a change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Shard {
    /// The shard identifier.
    pub shard_id: String,
    /// The shard this one was split from, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_shard_id: Option<String>,
}

impl Shard {
    /// Create a shard without a parent.
    #[must_use]
    pub fn new(shard_id: impl Into<String>) -> Self {
        Self {
            shard_id: shard_id.into(),
            parent_shard_id: None,
        }
    }

    /// Set the parent shard id.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_shard_id = Some(parent.into());
        self
    }
}

/// Result of describing a change log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeLogDescription {
    /// Every shard of the log, in the order the engine listed them.
    pub shards: Vec<Shard>,
    /// What records carry, when the engine reports it.
    pub view_type: Option<StreamViewType>,
}

/// Where a freshly acquired cursor starts reading within a shard.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StartingPosition {
    /// Just after the most recent record.
    Latest,
    /// At the oldest untrimmed record.
    #[default]
    TrimHorizon,
    /// At the record with this sequence number.
    AtSequence(String),
    /// Just after the record with this sequence number.
    AfterSequence(String),
}

impl StartingPosition {
    /// The `ShardIteratorType` wire name.
    #[must_use]
    pub fn iterator_type(&self) -> &'static str {
        match self {
            Self::Latest => "LATEST",
            Self::TrimHorizon => "TRIM_HORIZON",
            Self::AtSequence(_) => "AT_SEQUENCE_NUMBER",
            Self::AfterSequence(_) => "AFTER_SEQUENCE_NUMBER",
        }
    }

    /// The sequence number, for the two sequence-anchored modes.
    #[must_use]
    pub fn sequence_number(&self) -> Option<&str> {
        match self {
            Self::AtSequence(seq) | Self::AfterSequence(seq) => Some(seq),
            Self::Latest | Self::TrimHorizon => None,
        }
    }
}

/// Opaque position marker within one shard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Wrap an engine-issued token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Tokens are long and carry no meaning for humans.
        let head: String = self.0.chars().take(16).collect();
        if head.len() < self.0.len() {
            write!(f, "{head}…")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// One page of records fetched with a cursor.
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    /// The records, in shard order.
    pub records: Vec<RawRecord>,
    /// Where to continue; `None` once the shard is closed and fully read.
    pub next_cursor: Option<Cursor>,
}

/// A change-log record in the `GetRecords` wire shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    #[serde(rename = "eventID", skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_name: Option<OperationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamodb: Option<RawStreamData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_identity: Option<Identity>,
}

/// The `dynamodb` body of a wire record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawStreamData {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub keys: Item,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_image: Option<Item>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_image: Option<Item>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_view_type: Option<StreamViewType>,
}

/// Who made the change, for service-originated records (e.g. TTL deletes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Identity {
    pub principal_id: String,
    #[serde(rename = "Type")]
    pub kind: String,
}

/// A normalized change-log record, as delivered to handlers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRecord {
    #[serde(rename = "eventID")]
    pub event_id: String,
    pub event_name: Option<OperationType>,
    pub event_version: String,
    pub event_source: String,
    pub aws_region: String,
    pub dynamodb: StreamRecordData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_identity: Option<Identity>,
}

/// The item-level part of a [`StreamRecord`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRecordData {
    pub keys: Item,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_image: Option<Item>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_image: Option<Item>,
    pub sequence_number: String,
    pub size_bytes: u64,
    pub view_type: StreamViewType,
}

impl From<RawRecord> for StreamRecord {
    fn from(raw: RawRecord) -> Self {
        let data = raw.dynamodb.unwrap_or_default();
        Self {
            event_id: raw.event_id.unwrap_or_default(),
            event_name: raw.event_name,
            event_version: raw.event_version.unwrap_or_default(),
            event_source: raw.event_source.unwrap_or_default(),
            aws_region: raw.aws_region.unwrap_or_default(),
            dynamodb: StreamRecordData {
                keys: data.keys,
                new_image: data.new_image,
                old_image: data.old_image,
                sequence_number: data.sequence_number.unwrap_or_default(),
                size_bytes: data
                    .size_bytes
                    .and_then(|n| u64::try_from(n).ok())
                    .unwrap_or(0),
                view_type: data.stream_view_type.unwrap_or_default(),
            },
            user_identity: raw.user_identity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIRE_RECORD: &str = r#"{
        "eventID": "c4ca4238a0b923820dcc509a6f75849b",
        "eventName": "MODIFY",
        "eventVersion": "1.1",
        "eventSource": "aws:dynamodb",
        "awsRegion": "us-east-1",
        "dynamodb": {
            "Keys": {"pk": {"S": "user#1"}},
            "NewImage": {"pk": {"S": "user#1"}, "age": {"N": "31"}},
            "OldImage": {"pk": {"S": "user#1"}, "age": {"N": "30"}},
            "SequenceNumber": "111",
            "SizeBytes": 26,
            "StreamViewType": "NEW_AND_OLD_IMAGES"
        },
        "userIdentity": {"PrincipalId": "dynamodb.amazonaws.com", "Type": "Service"}
    }"#;

    #[test]
    fn test_should_normalize_wire_record() {
        let raw: RawRecord = serde_json::from_str(WIRE_RECORD).unwrap();
        let record = StreamRecord::from(raw);

        assert_eq!(record.event_id, "c4ca4238a0b923820dcc509a6f75849b");
        assert_eq!(record.event_name, Some(OperationType::Modify));
        assert_eq!(record.aws_region, "us-east-1");
        assert_eq!(record.dynamodb.sequence_number, "111");
        assert_eq!(record.dynamodb.size_bytes, 26);
        assert_eq!(record.dynamodb.view_type, StreamViewType::NewAndOldImages);
        assert_eq!(
            record.dynamodb.new_image.as_ref().unwrap()["age"],
            AttributeValue::N("31".to_owned())
        );
        assert_eq!(record.user_identity.unwrap().kind, "Service");
    }

    #[test]
    fn test_should_fill_defaults_for_sparse_record() {
        let record = StreamRecord::from(RawRecord::default());
        assert!(record.event_id.is_empty());
        assert!(record.dynamodb.keys.is_empty());
        assert!(record.dynamodb.new_image.is_none());
        assert_eq!(record.dynamodb.view_type, StreamViewType::KeysOnly);
    }

    #[test]
    fn test_should_map_starting_positions() {
        let pos = StartingPosition::AfterSequence("42".to_owned());
        assert_eq!(pos.iterator_type(), "AFTER_SEQUENCE_NUMBER");
        assert_eq!(pos.sequence_number(), Some("42"));
        assert_eq!(StartingPosition::Latest.sequence_number(), None);
    }

    #[test]
    fn test_should_abbreviate_long_cursor() {
        let cursor = Cursor::new("arn:aws:dynamodb:us-east-1:000000000000:table/t/stream/x|1|AAAA");
        assert_eq!(cursor.to_string(), "arn:aws:dynamodb…");
        assert_eq!(Cursor::new("short").to_string(), "short");
    }
}
