//! Serde model of the JSON:API document the broker returns.
//!
//! # Design
//! Whether `data` holds one resource or a collection is decided by the JSON
//! shape alone: an array is a collection of objects, an object is a single
//! resource, anything else is rejected. `errors` is kept exactly as received
//! so a failure can be reported even when the rest of the document is
//! malformed; `ErrorObject` is a typed view over one of those values.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A decoded response document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PrimaryData>,

    /// The `errors` member as received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,

    /// Remaining top-level members (`links`, `included`, `jsonapi`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawEnvelope {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// The error sequence, if the document reports a failure.
    pub fn error_values(&self) -> Option<Vec<Value>> {
        self.errors.as_ref().and_then(error_values)
    }
}

/// Read an `errors` member as a sequence. `null` means no errors; a
/// non-array member counts as a single error.
pub fn error_values(errors: &Value) -> Option<Vec<Value>> {
    match errors {
        Value::Null => None,
        Value::Array(items) => Some(items.clone()),
        other => Some(vec![other.clone()]),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Collection(Vec<ResourceObject>),
    Single(ResourceObject),
}

impl<'de> Deserialize<'de> for PrimaryData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Array(items) => items
                .into_iter()
                .map(resource_object)
                .collect::<Result<Vec<_>, _>>()
                .map(PrimaryData::Collection)
                .map_err(de::Error::custom),
            value @ Value::Object(_) => resource_object(value)
                .map(PrimaryData::Single)
                .map_err(de::Error::custom),
            other => Err(de::Error::custom(format!(
                "`data` must be an object or an array, found {other}"
            ))),
        }
    }
}

fn resource_object(value: Value) -> Result<ResourceObject, String> {
    match value {
        Value::Object(_) => ResourceObject::deserialize(value).map_err(|e| e.to_string()),
        other => Err(format!("a resource must be an object, found {other}")),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// A JSON:API error object. Unknown members are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ErrorObject {
    pub fn with_detail(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..Self::default()
        }
    }

    /// Typed view of one raw error. Never fails: a member whose shape does
    /// not fit its field moves to `extra`, and an error that is not an
    /// object becomes the `detail` text.
    pub fn from_value(value: &Value) -> Self {
        let Value::Object(members) = value else {
            return match value {
                Value::String(text) => Self::with_detail(text.clone()),
                other => Self::with_detail(other.to_string()),
            };
        };

        let mut error = Self::default();
        for (key, member) in members {
            let placed = match key.as_str() {
                "id" => place(&mut error.id, scalar_text(member)),
                "status" => place(&mut error.status, scalar_text(member)),
                "code" => place(&mut error.code, scalar_text(member)),
                "title" => place(&mut error.title, member.as_str().map(str::to_string)),
                "detail" => place(&mut error.detail, member.as_str().map(str::to_string)),
                "source" => place(&mut error.source, non_null(member)),
                "meta" => place(&mut error.meta, non_null(member)),
                _ => false,
            };
            if !placed && !member.is_null() {
                error.extra.insert(key.clone(), member.clone());
            }
        }
        error
    }

    /// The most specific human-readable text available.
    pub fn message(&self) -> Option<&str> {
        self.detail.as_deref().or(self.title.as_deref())
    }
}

fn place<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    *slot = value;
    slot.is_some()
}

fn non_null(value: &Value) -> Option<Value> {
    (!value.is_null()).then(|| value.clone())
}

/// Strings as-is, numbers rendered as strings.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accepts strings and numbers, rendering numbers as strings. Brokers are not
/// always strict about `id`, `status` and `code` being strings.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_text(&value).map(Some).ok_or_else(|| {
            de::Error::custom(format!("expected a string or number, found {value}"))
        }),
    }
}
