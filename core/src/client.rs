//! Stateless request builder and response decoder for the broker.
//!
//! # Design
//! `BrokerClient` holds only the base URL. `build` turns a `RequestSpec`
//! into an `HttpRequest` and `parse` turns an `HttpResponse` into the
//! decoded body; the exchange itself happens elsewhere. All lifecycle state
//! (cancellation, timeouts) lives in the executor.

use serde_json::Value;

use crate::encode::encode_uri;
use crate::envelope::{error_values, ErrorObject};
use crate::error::{BrokerError, ConfigError};
use crate::http::{HttpRequest, HttpResponse};
use crate::spec::RequestSpec;

/// Media type of every request and response body.
pub const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

#[derive(Debug, Clone, Default)]
pub struct BrokerClient {
    base_url: Option<String>,
}

impl BrokerClient {
    pub fn new(base_url: Option<&str>) -> Self {
        Self {
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
        }
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Join `path` to the base URL, percent-encoding the result unless the
    /// path is already encoded.
    pub fn url_for(&self, path: &str, already_encoded: bool) -> Result<String, ConfigError> {
        let base = self
            .base_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::MissingBaseUrl)?;
        let joined = format!("{base}/{}", path.trim_start_matches('/'));
        Ok(if already_encoded {
            joined
        } else {
            encode_uri(&joined)
        })
    }

    /// Build the wire request. The timeout is validated first so a missing
    /// timeout is reported even when nothing else is configured.
    pub fn build(&self, spec: &RequestSpec, bearer_token: &str) -> Result<HttpRequest, BrokerError> {
        spec.timeout()?;
        let url = self.url_for(&spec.path, spec.path_already_encoded)?;

        let body = match &spec.body {
            Some(body) if spec.method.carries_body() && !body.is_null() => {
                Some(serde_json::to_string(body).map_err(BrokerError::Serialization)?)
            }
            _ => None,
        };

        Ok(HttpRequest {
            method: spec.method,
            url,
            headers: vec![
                ("Content-Type".to_string(), JSON_API_MEDIA_TYPE.to_string()),
                ("Authorization".to_string(), format!("Bearer {bearer_token}")),
            ],
            body,
        })
    }

    /// Decode the body and map non-2xx statuses to `BrokerError::Api`.
    ///
    /// An empty body decodes to `Value::Null`.
    pub fn parse(&self, response: &HttpResponse) -> Result<Value, BrokerError> {
        let body = decode_body(response)?;
        if response.is_success() {
            return Ok(body);
        }
        Err(BrokerError::Api {
            status: response.status,
            errors: errors_of(&body),
            body,
        })
    }
}

fn decode_body(response: &HttpResponse) -> Result<Value, BrokerError> {
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body).map_err(|source| BrokerError::Decode {
        status: response.status,
        source,
    })
}

/// Typed views of the `errors` member of a failed response; empty when the
/// body has none.
fn errors_of(body: &Value) -> Vec<ErrorObject> {
    body.get("errors")
        .and_then(error_values)
        .map(|errors| errors.iter().map(ErrorObject::from_value).collect())
        .unwrap_or_default()
}
