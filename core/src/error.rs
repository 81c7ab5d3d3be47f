//! Error types for the broker client.
//!
//! # Design
//! Every operation returns `Result<_, BrokerError>`. The variants keep the
//! failure kinds a caller acts on apart: configuration mistakes are raised
//! before any network activity, transport failures and timeouts are worth
//! retrying, cancellations are not, and API failures carry the broker's own
//! `errors` sequence for display.

use std::fmt;
use std::time::Duration;

use serde_json::Value;

use crate::envelope::ErrorObject;
use crate::transport::TransportError;

/// Why an in-flight request was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// `abort_pending_request` was called.
    Aborted,
    /// A newer request on the same executor replaced it.
    Superseded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Aborted => f.write_str("aborted"),
            CancelReason::Superseded => f.write_str("superseded by a newer request"),
        }
    }
}

/// Caller or configuration mistakes.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("the request timeout is required")]
    MissingTimeout,

    #[error("the request timeout must be positive")]
    InvalidTimeout,

    #[error("no broker base URL is configured")]
    MissingBaseUrl,

    #[error("invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(thiserror::Error, Debug)]
pub enum BrokerError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("failed to serialize request body: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("network error: {0}")]
    Network(#[from] TransportError),

    #[error("request timed out after {} ms", .after.as_millis())]
    Timeout { after: Duration },

    #[error("request cancelled: {reason}")]
    Cancelled { reason: CancelReason },

    #[error("failed to decode response body (HTTP {status}): {source}")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    /// The broker answered with an `errors` sequence, or with a non-2xx
    /// status. `body` is the decoded response as received.
    #[error("broker rejected the request (HTTP {status}): {}", summarize(.errors))]
    Api {
        status: u16,
        errors: Vec<ErrorObject>,
        body: Value,
    },

    /// A successful exchange produced no envelope at all.
    #[error("{}", summarize(.errors))]
    UnexpectedEmptyResponse { errors: Vec<ErrorObject> },
}

impl BrokerError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BrokerError::Cancelled { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, BrokerError::Timeout { .. })
    }

    /// Network failures and timeouts may succeed if the caller tries again.
    /// Nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BrokerError::Network(_) | BrokerError::Timeout { .. })
    }

    /// The error objects a UI would display, if this failure carries any.
    pub fn api_errors(&self) -> Option<&[ErrorObject]> {
        match self {
            BrokerError::Api { errors, .. } | BrokerError::UnexpectedEmptyResponse { errors } => {
                Some(errors)
            }
            _ => None,
        }
    }
}

fn summarize(errors: &[ErrorObject]) -> String {
    let messages: Vec<&str> = errors.iter().filter_map(ErrorObject::message).collect();
    if messages.is_empty() {
        format!("{} error object(s)", errors.len())
    } else {
        messages.join("; ")
    }
}
