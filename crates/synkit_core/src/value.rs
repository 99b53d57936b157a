//! Typed property values.
//!
//! Every property of an [`Entity`](crate::Entity) is a [`Value`]. A value has
//! a stable type tag and a wire projection `{"type": tag, "value": raw}` in
//! which `raw` is always plain JSON: byte strings travel codec-encoded,
//! timestamps as formatted text, keys as their encoded string.

use crate::error::{CoreError, CoreResult};
use crate::key::KeyPath;
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Wire format for timestamps.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Alternate timestamp format accepted when parsing (`2010/7/4 9:05:00`).
pub const DATETIME_FORMAT_SLASHED: &str = "%Y/%m/%d %H:%M:%S";

/// Type tags as they appear on the wire.
pub mod tags {
    /// Plain text.
    pub const STRING: &str = "string";
    /// Opaque bytes.
    pub const BYTE_STRING: &str = "byte_string";
    /// Boolean.
    pub const BOOL: &str = "bool";
    /// Signed 64-bit integer.
    pub const INT: &str = "int";
    /// 64-bit float.
    pub const FLOAT: &str = "float";
    /// Timestamp.
    pub const DATETIME: &str = "gd:when";
    /// Reference to another entity.
    pub const KEY: &str = "key";
    /// User identity (email).
    pub const USER: &str = "user";
}

/// A non-empty list of values.
///
/// The list reports the type tag of its first element.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueList(Vec<Value>);

impl ValueList {
    /// Creates a list.
    ///
    /// # Errors
    ///
    /// Returns `UnknownValueType` for an empty sequence, since an empty list
    /// has no element type.
    pub fn new(values: Vec<Value>) -> CoreResult<Self> {
        if values.is_empty() {
            return Err(CoreError::unknown_value_type("empty list"));
        }
        Ok(Self(values))
    }

    /// Returns the first element.
    #[must_use]
    pub fn first(&self) -> &Value {
        // Non-empty by construction
        &self.0[0]
    }

    /// Returns the elements.
    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `false`, since a list holds at least one value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Consumes the list, returning its elements.
    #[must_use]
    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }
}

/// One typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Plain text.
    String(String),
    /// Opaque bytes, codec-encoded on the wire.
    ByteString(Vec<u8>),
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// Timestamp with whole-second precision.
    Datetime(NaiveDateTime),
    /// Homogeneous-by-convention list.
    List(ValueList),
    /// Reference to another entity.
    Key(KeyPath),
    /// User identity, stored as an email address.
    User(String),
}

/// The `{type, value}` wire projection of a [`Value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireValue {
    /// Type tag.
    #[serde(rename = "type")]
    pub type_tag: String,
    /// Wire-safe raw value.
    pub value: JsonValue,
}

impl WireValue {
    /// Reconstructs the typed value.
    ///
    /// # Errors
    ///
    /// See [`Value::from_wire`].
    pub fn to_value(&self) -> CoreResult<Value> {
        Value::from_wire(&self.type_tag, &self.value)
    }

    /// Returns the compact JSON text of `{"type", "value"}` with keys in
    /// lexical order, as used for content digests.
    pub fn to_json_string(&self) -> CoreResult<String> {
        let mut map = serde_json::Map::new();
        map.insert("type".to_string(), JsonValue::String(self.type_tag.clone()));
        map.insert("value".to_string(), self.value.clone());
        Ok(serde_json::to_string(&JsonValue::Object(map))?)
    }
}

impl Value {
    /// Creates a list value.
    ///
    /// # Errors
    ///
    /// Returns `UnknownValueType` if `values` is empty.
    pub fn list<I, V>(values: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        ValueList::new(values.into_iter().map(Into::into).collect()).map(Value::List)
    }

    /// Creates a timestamp value, truncated to whole seconds.
    #[must_use]
    pub fn datetime(when: NaiveDateTime) -> Self {
        Value::Datetime(when.with_nanosecond(0).unwrap_or(when))
    }

    /// Returns the stable type tag.
    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        match self {
            Value::String(_) => tags::STRING,
            Value::ByteString(_) => tags::BYTE_STRING,
            Value::Bool(_) => tags::BOOL,
            Value::Int(_) => tags::INT,
            Value::Float(_) => tags::FLOAT,
            Value::Datetime(_) => tags::DATETIME,
            Value::List(list) => list.first().type_tag(),
            Value::Key(_) => tags::KEY,
            Value::User(_) => tags::USER,
        }
    }

    /// Checks that the value has a wire form.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` for a NaN or infinite float, including one
    /// inside a list.
    pub fn validate(&self) -> CoreResult<()> {
        match self {
            Value::Float(f) if !f.is_finite() => Err(CoreError::invalid_value(
                tags::FLOAT,
                format!("{f} has no JSON representation"),
            )),
            Value::List(list) => list.as_slice().iter().try_for_each(Value::validate),
            _ => Ok(()),
        }
    }

    fn wire_raw(&self) -> JsonValue {
        match self {
            Value::String(s) | Value::User(s) => JsonValue::String(s.clone()),
            Value::ByteString(bytes) => JsonValue::String(synkit_codec::encode_bytes(bytes)),
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Datetime(when) => JsonValue::String(when.format(DATETIME_FORMAT).to_string()),
            Value::List(list) => JsonValue::Array(list.as_slice().iter().map(Value::wire_raw).collect()),
            Value::Key(key) => JsonValue::String(key.as_str().to_string()),
        }
    }

    /// Returns the `{type, value}` wire projection.
    #[must_use]
    pub fn to_wire(&self) -> WireValue {
        WireValue {
            type_tag: self.type_tag().to_string(),
            value: self.wire_raw(),
        }
    }

    /// Reconstructs a value from its wire projection.
    ///
    /// An array `raw` is a list whose elements are decoded with `type_tag`;
    /// elements that do not match the tag (mixed lists) are classified on
    /// their own.
    ///
    /// # Errors
    ///
    /// - `UnknownValueType` for an unknown tag or an empty array
    /// - `InvalidValue` if `raw` does not fit the tag
    pub fn from_wire(type_tag: &str, raw: &JsonValue) -> CoreResult<Self> {
        if let JsonValue::Array(items) = raw {
            let values = items
                .iter()
                .map(|item| Self::scalar_from_wire(type_tag, item).or_else(|_| classify(item)))
                .collect::<CoreResult<Vec<_>>>()?;
            return ValueList::new(values).map(Value::List);
        }
        Self::scalar_from_wire(type_tag, raw)
    }

    fn scalar_from_wire(type_tag: &str, raw: &JsonValue) -> CoreResult<Self> {
        let mismatch = || CoreError::invalid_value(type_tag, format!("unexpected raw value {raw}"));

        match type_tag {
            tags::STRING => raw
                .as_str()
                .map(|s| Value::String(s.to_string()))
                .ok_or_else(mismatch),
            tags::USER => raw
                .as_str()
                .map(|s| Value::User(s.to_string()))
                .ok_or_else(mismatch),
            tags::BYTE_STRING => {
                let text = raw.as_str().ok_or_else(mismatch)?;
                synkit_codec::decode_bytes(text)
                    .map(Value::ByteString)
                    .map_err(|e| CoreError::invalid_value(type_tag, e.to_string()))
            }
            tags::BOOL => raw.as_bool().map(Value::Bool).ok_or_else(mismatch),
            tags::INT => raw.as_i64().map(Value::Int).ok_or_else(mismatch),
            tags::FLOAT => raw.as_f64().map(Value::Float).ok_or_else(mismatch),
            tags::DATETIME => {
                let text = raw.as_str().ok_or_else(mismatch)?;
                parse_datetime(text)
                    .map(Value::Datetime)
                    .ok_or_else(|| CoreError::invalid_value(type_tag, format!("bad timestamp {text:?}")))
            }
            tags::KEY => {
                let text = raw.as_str().ok_or_else(mismatch)?;
                KeyPath::from_encoded(text)
                    .map(Value::Key)
                    .map_err(|e| CoreError::invalid_value(type_tag, e.to_string()))
            }
            other => Err(CoreError::unknown_value_type(other)),
        }
    }

    /// Returns the text of a `String` value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the bytes of a `ByteString` value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::ByteString(b) => Some(b),
            _ => None,
        }
    }

    /// Returns a `Bool` value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns an `Int` value.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns a `Float` value.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns a `Datetime` value.
    #[must_use]
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Datetime(when) => Some(*when),
            _ => None,
        }
    }

    /// Returns the elements of a `List` value.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(list) => Some(list.as_slice()),
            _ => None,
        }
    }

    /// Returns a `Key` value.
    #[must_use]
    pub fn as_key(&self) -> Option<&KeyPath> {
        match self {
            Value::Key(key) => Some(key),
            _ => None,
        }
    }

    /// Returns the email of a `User` value.
    #[must_use]
    pub fn as_user(&self) -> Option<&str> {
        match self {
            Value::User(email) => Some(email),
            _ => None,
        }
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, DATETIME_FORMAT_SLASHED))
        .ok()
}

/// Boxes a raw JSON value into a typed [`Value`].
///
/// - booleans become `Bool`
/// - integral numbers that fit `i64` become `Int`, other numbers `Float`
/// - strings become `String`
/// - arrays become `List`, each element classified in turn
/// - an object of exactly `{"type", "value"}` is read as a wire value
///
/// # Errors
///
/// Returns `UnknownValueType` for `null`, other objects and empty arrays.
pub fn classify(raw: &JsonValue) -> CoreResult<Value> {
    match raw {
        JsonValue::Bool(b) => Ok(Value::Bool(*b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Ok(Value::Int(i)),
            None => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| CoreError::unknown_value_type(format!("number {n}"))),
        },
        JsonValue::String(s) => Ok(Value::String(s.clone())),
        JsonValue::Array(items) => {
            let values = items.iter().map(classify).collect::<CoreResult<Vec<_>>>()?;
            ValueList::new(values).map(Value::List)
        }
        JsonValue::Object(map) => match (map.len(), map.get("type"), map.get("value")) {
            (2, Some(JsonValue::String(tag)), Some(value)) => Value::from_wire(tag, value),
            _ => Err(CoreError::unknown_value_type("object")),
        },
        JsonValue::Null => Err(CoreError::unknown_value_type("null")),
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::ByteString(bytes)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value::ByteString(bytes.to_vec())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(when: NaiveDateTime) -> Self {
        Value::datetime(when)
    }
}

impl From<KeyPath> for Value {
    fn from(key: KeyPath) -> Self {
        Value::Key(key)
    }
}

impl From<&KeyPath> for Value {
    fn from(key: &KeyPath) -> Self {
        Value::Key(key.clone())
    }
}

impl From<ValueList> for Value {
    fn from(list: ValueList) -> Self {
        Value::List(list)
    }
}
