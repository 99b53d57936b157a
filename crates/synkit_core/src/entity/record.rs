//! Serialized entity form.

use crate::key::KeyPath;
use crate::value::WireValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The JSON projection of an [`Entity`](super::Entity).
///
/// ```json
/// {"kind": "Person", "key": "...", "version": 2, "id": 42,
///  "properties": {"age": {"type": "int", "value": 31}}}
/// ```
///
/// `name` / `id` are present only when the key carries one; an incomplete
/// key (id `0`) has neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Kind of the entity's own key element.
    pub kind: String,
    /// Encoded key.
    pub key: KeyPath,
    /// Last server-confirmed version.
    #[serde(default)]
    pub version: u64,
    /// Key name, if the key is named.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Numeric id, if the key has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Properties in wire form, keyed by name.
    #[serde(default)]
    pub properties: BTreeMap<String, WireValue>,
}

impl EntityRecord {
    /// Parses a record from JSON text.
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Parses a record from a JSON value.
    pub fn from_json_value(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}
