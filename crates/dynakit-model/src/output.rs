//! Normalized engine results.
//!
//! Query and scan answers are folded into one [`ItemPage`] shape regardless of
//! which operation produced them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::attribute_value::AttributeValue;
use crate::stream::Item;

/// One page of a query or scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPage {
    /// Matching items; empty for `Select::Count`.
    #[serde(default)]
    pub items: Vec<Item>,

    /// Where the engine stopped; pass back as the start key to continue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_key: Option<Item>,

    /// Number of items returned after filtering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,

    /// Number of items evaluated before filtering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanned_count: Option<usize>,
}

impl ItemPage {
    /// Whether another page follows this one.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.last_key.as_ref().is_some_and(|k| !k.is_empty())
    }
}

/// Result of an `UpdateItem` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemOutput {
    /// Attributes as selected by the requested `ReturnValue`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, AttributeValue>,
}
