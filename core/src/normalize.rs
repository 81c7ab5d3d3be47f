//! Flattening of JSON:API documents into UI-friendly results.
//!
//! Each resource becomes `{ "id": ..., <attributes...> }`; the `type`
//! wrapper is dropped. Attributes are laid over the resource id, so an
//! attribute named `id` replaces it. Normalization is a pure function of the
//! envelope: it never looks at HTTP status, and normalizing the same document
//! twice gives the same result.
//!
//! An `errors` member fails normalization before anything else in the
//! document is decoded, and the failure carries the errors as received.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::DEFAULT_UNEXPECTED_ERROR_MESSAGE;
use crate::envelope::{error_values, PrimaryData, RawEnvelope, ResourceObject};

/// Which optional parts of the document survive flattening.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Re-attach each resource's `relationships`.
    pub include_relationships: bool,
    /// Keep top-level members other than `data` and `meta`.
    pub include_extra_members: bool,
    /// Copy a single resource's `id` and `type` to the top level.
    pub lift_primary_identity: bool,
}

impl NormalizeOptions {
    /// `id` + attributes, plus top-level `meta`.
    pub fn flat() -> Self {
        Self::default()
    }

    /// Everything `flat` keeps, plus relationships, other top-level members
    /// and the primary resource's `id` and `type`.
    pub fn full() -> Self {
        Self {
            include_relationships: true,
            include_extra_members: true,
            lift_primary_identity: true,
        }
    }
}

/// A resource with its attributes lifted next to `id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlatResource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Value>,
}

impl FlatResource {
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FlatData {
    Single(FlatResource),
    Collection(Vec<FlatResource>),
}

/// The normalized document. Serializes without a `data` key when the source
/// had no primary data.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Normalized {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<FlatData>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,

    /// Id of a single primary resource, in full mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Type of a single primary resource, in full mode.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Normalized {
    pub fn is_empty(&self) -> bool {
        self.data.is_none()
            && self.meta.is_none()
            && self.id.is_none()
            && self.kind.is_none()
            && self.extra.is_empty()
    }

    pub fn single(&self) -> Option<&FlatResource> {
        match &self.data {
            Some(FlatData::Single(resource)) => Some(resource),
            _ => None,
        }
    }

    pub fn collection(&self) -> Option<&[FlatResource]> {
        match &self.data {
            Some(FlatData::Collection(items)) => Some(items),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum NormalizeError {
    /// The document carried an `errors` member. The values are exactly the
    /// ones in the document.
    #[error("document contains {} error object(s)", .0.len())]
    Api(Vec<Value>),

    /// There was no document at all.
    #[error("{message}")]
    UnexpectedEmptyResponse { message: String },

    /// The body is JSON but not a JSON:API document.
    #[error("malformed JSON:API document: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Flattens documents according to a fixed set of options.
#[derive(Debug, Clone)]
pub struct ResponseNormalizer {
    options: NormalizeOptions,
    empty_response_message: String,
}

impl Default for ResponseNormalizer {
    fn default() -> Self {
        Self::new(NormalizeOptions::flat())
    }
}

impl ResponseNormalizer {
    pub fn new(options: NormalizeOptions) -> Self {
        Self {
            options,
            empty_response_message: DEFAULT_UNEXPECTED_ERROR_MESSAGE.to_string(),
        }
    }

    /// Replace the message reported when there is no document, e.g. with a
    /// translated one.
    pub fn with_empty_response_message(mut self, message: impl Into<String>) -> Self {
        self.empty_response_message = message.into();
        self
    }

    pub fn options(&self) -> NormalizeOptions {
        self.options
    }

    pub fn empty_response_message(&self) -> &str {
        &self.empty_response_message
    }

    /// Normalize a decoded body. `null` counts as no document.
    pub fn normalize_value(&self, body: &Value) -> Result<Normalized, NormalizeError> {
        if body.is_null() {
            return self.normalize(None);
        }
        if let Some(errors) = body.get("errors").and_then(error_values) {
            return Err(NormalizeError::Api(errors));
        }
        let envelope = RawEnvelope::from_value(body).map_err(NormalizeError::Malformed)?;
        self.normalize(Some(&envelope))
    }

    pub fn normalize(&self, envelope: Option<&RawEnvelope>) -> Result<Normalized, NormalizeError> {
        let Some(envelope) = envelope else {
            return Err(NormalizeError::UnexpectedEmptyResponse {
                message: self.empty_response_message.clone(),
            });
        };

        if let Some(errors) = envelope.error_values() {
            return Err(NormalizeError::Api(errors));
        }

        let Some(data) = &envelope.data else {
            return Ok(Normalized::default());
        };

        let (id, kind) = match data {
            PrimaryData::Single(resource) if self.options.lift_primary_identity => {
                (resource.id.clone(), resource.kind.clone())
            }
            _ => (None, None),
        };

        let data = match data {
            PrimaryData::Single(resource) => FlatData::Single(self.flatten(resource)),
            PrimaryData::Collection(items) => {
                FlatData::Collection(items.iter().map(|item| self.flatten(item)).collect())
            }
        };

        let mut extra = if self.options.include_extra_members {
            envelope.extra.clone()
        } else {
            Map::new()
        };
        if self.options.lift_primary_identity {
            extra.remove("id");
            extra.remove("type");
        }

        Ok(Normalized {
            data: Some(data),
            meta: envelope.meta.clone(),
            id,
            kind,
            extra,
        })
    }

    fn flatten(&self, resource: &ResourceObject) -> FlatResource {
        let mut attributes = resource.attributes.clone().unwrap_or_default();
        let id = match attributes.remove("id") {
            Some(attribute) => attribute_id(attribute),
            None => resource.id.clone(),
        };
        let relationships = if self.options.include_relationships {
            attributes.remove("relationships");
            resource.relationships.clone()
        } else {
            None
        };

        FlatResource {
            id,
            attributes,
            relationships,
        }
    }
}

/// An `id` attribute in the form ids take: strings as-is, anything else as
/// JSON text, `null` as no id.
fn attribute_id(attribute: Value) -> Option<String> {
    match attribute {
        Value::Null => None,
        Value::String(id) => Some(id),
        other => Some(other.to_string()),
    }
}

/// Flatten with default options.
pub fn normalize(body: &Value) -> Result<Normalized, NormalizeError> {
    ResponseNormalizer::default().normalize_value(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_resource_is_flattened() {
        let body = json!({"data": {"id": "1", "type": "x", "attributes": {"name": "a"}}});
        let normalized = normalize(&body).unwrap();
        assert_eq!(normalized.to_value(), json!({"data": {"id": "1", "name": "a"}}));
        assert!(normalized.meta.is_none());
    }

    #[test]
    fn collection_keeps_order_and_meta() {
        let body = json!({
            "data": [
                {"id": "1", "attributes": {"name": "a"}},
                {"id": "2", "attributes": {"name": "b"}}
            ],
            "meta": {"total": 2}
        });
        let normalized = normalize(&body).unwrap();
        assert_eq!(
            normalized.to_value(),
            json!({
                "data": [{"id": "1", "name": "a"}, {"id": "2", "name": "b"}],
                "meta": {"total": 2}
            })
        );
        let items = normalized.collection().unwrap();
        assert_eq!(items[1].get("name"), Some(&json!("b")));
    }

    #[test]
    fn missing_or_null_data_yields_empty_result() {
        for body in [json!({}), json!({"data": null})] {
            let normalized = normalize(&body).unwrap();
            assert!(normalized.is_empty());
            assert_eq!(normalized.to_value(), json!({}));
        }
    }

    #[test]
    fn meta_without_data_is_dropped() {
        let normalized = normalize(&json!({"meta": {"deleted": "7"}})).unwrap();
        assert!(normalized.is_empty());
    }

    #[test]
    fn errors_take_precedence_over_data() {
        let body = json!({
            "data": {"id": "1", "attributes": {"name": "a"}},
            "errors": [{"status": "409", "detail": "conflict"}]
        });
        match normalize(&body) {
            Err(NormalizeError::Api(errors)) => {
                assert_eq!(Value::Array(errors), body["errors"]);
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn errors_win_over_malformed_data() {
        let body = json!({"errors": [{"detail": "boom"}], "data": "x"});
        match normalize(&body) {
            Err(NormalizeError::Api(errors)) => assert_eq!(errors, vec![json!({"detail": "boom"})]),
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn error_payload_is_the_sequence_as_received() {
        let errors = json!([
            {"status": 422, "id": null, "detail": "bad"},
            {"title": {"en": "Invalid"}, "status": true}
        ]);
        match normalize(&json!({ "errors": errors.clone() })) {
            Err(NormalizeError::Api(payload)) => assert_eq!(Value::Array(payload), errors),
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn typed_envelope_reports_errors_too() {
        let envelope = RawEnvelope::from_value(&json!({"errors": [{"code": 7}]})).unwrap();
        assert!(matches!(
            ResponseNormalizer::default().normalize(Some(&envelope)),
            Err(NormalizeError::Api(errors)) if errors == vec![json!({"code": 7})]
        ));
    }

    #[test]
    fn null_errors_member_is_no_error() {
        let normalized = normalize(&json!({"errors": null, "data": {"id": "1"}})).unwrap();
        assert_eq!(normalized.to_value(), json!({"data": {"id": "1"}}));
    }

    #[test]
    fn array_data_is_never_a_single_resource() {
        for data in [json!(["abc"]), json!([null])] {
            assert!(matches!(
                normalize(&json!({ "data": data })),
                Err(NormalizeError::Malformed(_))
            ));
        }
    }

    #[test]
    fn empty_errors_sequence_still_fails() {
        assert!(matches!(
            normalize(&json!({"errors": [], "data": []})),
            Err(NormalizeError::Api(errors)) if errors.is_empty()
        ));
    }

    #[test]
    fn null_envelope_reports_user_message() {
        match normalize(&Value::Null) {
            Err(NormalizeError::UnexpectedEmptyResponse { message }) => {
                assert!(!message.is_empty());
                assert_eq!(message, DEFAULT_UNEXPECTED_ERROR_MESSAGE);
            }
            other => panic!("expected empty-response error, got {other:?}"),
        }
    }

    #[test]
    fn empty_response_message_is_configurable() {
        let normalizer = ResponseNormalizer::default()
            .with_empty_response_message("Ocorreu um erro inesperado.");
        match normalizer.normalize(None) {
            Err(NormalizeError::UnexpectedEmptyResponse { message }) => {
                assert_eq!(message, "Ocorreu um erro inesperado.")
            }
            other => panic!("expected empty-response error, got {other:?}"),
        }
    }

    #[test]
    fn non_document_bodies_are_malformed() {
        assert!(matches!(normalize(&json!([1, 2])), Err(NormalizeError::Malformed(_))));
        assert!(matches!(
            normalize(&json!({"data": 3})),
            Err(NormalizeError::Malformed(_))
        ));
    }

    #[test]
    fn normalizing_twice_gives_identical_results() {
        let body = json!({
            "data": [{"id": "1", "type": "p", "attributes": {"name": "a", "tags": ["x"]}}],
            "meta": {"total": 1}
        });
        let envelope = RawEnvelope::from_value(&body).unwrap();
        let normalizer = ResponseNormalizer::new(NormalizeOptions::full());
        let first = normalizer.normalize(Some(&envelope)).unwrap();
        let second = normalizer.normalize(Some(&envelope)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn flat_mode_drops_relationships_and_links() {
        let body = json!({
            "data": {
                "id": "1",
                "attributes": {"name": "a"},
                "relationships": {"owner": {"data": {"type": "users", "id": "9"}}}
            },
            "links": {"self": "/projects/1"}
        });
        assert_eq!(normalize(&body).unwrap().to_value(), json!({"data": {"id": "1", "name": "a"}}));
    }

    #[test]
    fn full_mode_keeps_relationships_and_top_level_members() {
        let body = json!({
            "data": {
                "id": "1",
                "attributes": {"name": "a"},
                "relationships": {"owner": {"data": {"type": "users", "id": "9"}}}
            },
            "included": [{"type": "users", "id": "9", "attributes": {"email": "o@x"}}],
            "meta": {"version": 3}
        });
        let normalized = ResponseNormalizer::new(NormalizeOptions::full())
            .normalize_value(&body)
            .unwrap();
        assert_eq!(
            normalized.to_value(),
            json!({
                "data": {
                    "id": "1",
                    "name": "a",
                    "relationships": {"owner": {"data": {"type": "users", "id": "9"}}}
                },
                "meta": {"version": 3},
                "id": "1",
                "included": [{"type": "users", "id": "9", "attributes": {"email": "o@x"}}]
            })
        );
    }

    #[test]
    fn attribute_named_id_replaces_resource_id() {
        let body = json!({"data": {"id": "1", "attributes": {"id": "shadow", "name": "a"}}});
        let normalized = normalize(&body).unwrap();
        assert_eq!(normalized.single().unwrap().id.as_deref(), Some("shadow"));
        assert_eq!(normalized.to_value(), json!({"data": {"id": "shadow", "name": "a"}}));

        let body = json!({"data": [{"id": "1", "attributes": {"id": 9}}, {"id": "2", "attributes": {"id": null}}]});
        assert_eq!(normalize(&body).unwrap().to_value(), json!({"data": [{"id": "9"}, {}]}));
    }

    #[test]
    fn full_mode_lifts_primary_id_and_type() {
        let body = json!({
            "data": {"id": "1", "type": "projects", "attributes": {"name": "a"}},
            "id": "stale",
            "links": {"self": "/projects/1"}
        });
        let full = ResponseNormalizer::new(NormalizeOptions::full());
        let normalized = full.normalize_value(&body).unwrap();
        assert_eq!(normalized.id.as_deref(), Some("1"));
        assert_eq!(normalized.kind.as_deref(), Some("projects"));
        assert_eq!(
            normalized.to_value(),
            json!({
                "data": {"id": "1", "name": "a"},
                "id": "1",
                "type": "projects",
                "links": {"self": "/projects/1"}
            })
        );

        let collection = full
            .normalize_value(&json!({"data": [{"id": "1", "type": "projects"}]}))
            .unwrap();
        assert!(collection.id.is_none() && collection.kind.is_none());

        let flat = normalize(&body).unwrap();
        assert!(flat.id.is_none() && flat.kind.is_none());
    }

    #[test]
    fn missing_attributes_leave_only_id() {
        let normalized = normalize(&json!({"data": {"id": "5", "type": "p", "attributes": null}}))
            .unwrap();
        assert_eq!(normalized.to_value(), json!({"data": {"id": "5"}}));
    }
}
