//! Description of a single broker call.

use std::time::Duration;

use serde_json::Value;

use crate::error::ConfigError;
use crate::http::HttpMethod;

/// A path relative to the base URL, and whether it is already
/// percent-encoded. Plain strings convert to paths that still need encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPath {
    pub path: String,
    pub already_encoded: bool,
}

impl RequestPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            already_encoded: false,
        }
    }

    /// A path whose percent-escapes are sent as they are.
    pub fn encoded(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            already_encoded: true,
        }
    }
}

impl From<&str> for RequestPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for RequestPath {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

impl From<&String> for RequestPath {
    fn from(path: &String) -> Self {
        Self::new(path.as_str())
    }
}

/// One call: verb, relative path, optional body and a mandatory timeout.
///
/// There is no default timeout: a spec built without one fails
/// with `ConfigError::MissingTimeout` before anything is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
    pub timeout_ms: Option<u64>,
    pub path_already_encoded: bool,
}

impl RequestSpec {
    pub fn new(method: HttpMethod, path: impl Into<RequestPath>) -> Self {
        let RequestPath {
            path,
            already_encoded,
        } = path.into();
        Self {
            method,
            path,
            body: None,
            timeout_ms: None,
            path_already_encoded: already_encoded,
        }
    }

    pub fn get(path: impl Into<RequestPath>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<RequestPath>, body: Value) -> Self {
        Self::new(HttpMethod::Post, path).body(body)
    }

    pub fn patch(path: impl Into<RequestPath>, body: Value) -> Self {
        Self::new(HttpMethod::Patch, path).body(body)
    }

    pub fn delete(path: impl Into<RequestPath>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Set the body. Only POST and PATCH transmit it.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Skip percent-encoding because `path` is already encoded.
    pub fn path_already_encoded(mut self, encoded: bool) -> Self {
        self.path_already_encoded = encoded;
        self
    }

    /// The validated timeout.
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        match self.timeout_ms {
            None => Err(ConfigError::MissingTimeout),
            Some(0) => Err(ConfigError::InvalidTimeout),
            Some(ms) => Ok(Duration::from_millis(ms)),
        }
    }
}
