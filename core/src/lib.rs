//! Client core for a JSON:API broker gateway.
//!
//! # Overview
//! Issues one request at a time against a JSON:API backend and flattens the
//! documents it returns into a UI-friendly shape.
//!
//! # Design
//! - `BrokerClient` is stateless: it builds `HttpRequest` values and decodes
//!   `HttpResponse` values without touching the network (host-does-IO).
//! - `RequestExecutor` owns the request lifecycle: the single pending-request
//!   slot, cancellation, the timeout, and the `Transport` doing the exchange.
//! - `ResponseNormalizer` is a pure function from a decoded document to a
//!   `Normalized` result.
//! - Every operation returns `Result<_, BrokerError>`.
//!
//! ```ignore
//! use broker_core::{BrokerConfig, RequestExecutor, StaticToken};
//!
//! let executor = RequestExecutor::with_reqwest(
//!     BrokerConfig::new("https://broker.example.com/api"),
//!     StaticToken::new(session_token),
//! )?;
//! let projects = executor.get("projects?page[size]=20", 10_000).await?;
//! ```

pub mod client;
pub mod config;
pub mod credentials;
pub mod encode;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod http;
pub mod normalize;
pub mod spec;
pub mod transport;

pub use client::{BrokerClient, JSON_API_MEDIA_TYPE};
pub use config::BrokerConfig;
pub use credentials::{CredentialProvider, StaticToken};
pub use envelope::{ErrorObject, PrimaryData, RawEnvelope, ResourceObject};
pub use error::{BrokerError, CancelReason, ConfigError};
pub use executor::RequestExecutor;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use normalize::{
    normalize, FlatData, FlatResource, NormalizeError, NormalizeOptions, Normalized,
    ResponseNormalizer,
};
pub use spec::{RequestPath, RequestSpec};
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use transport::{Transport, TransportError};
