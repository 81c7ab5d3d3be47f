//! Single-slot request executor.
//!
//! # Design
//! A `RequestExecutor` runs at most one request at a time. Starting a request
//! installs a fresh `PendingRequest` (cancellation token + deadline) in the
//! executor's slot and cancels whatever was there before, so a superseded
//! call resolves with `BrokerError::Cancelled` instead of stale data.
//!
//! Each call holds an `InFlight` guard that clears the slot when the call
//! ends, on every path including the caller dropping the future. The guard
//! only clears the slot if it still holds the call's own request id, so a
//! superseded call finishing late can never clear its successor.
//!
//! The slot lock is never held across an await.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::BrokerClient;
use crate::config::BrokerConfig;
use crate::credentials::CredentialProvider;
use crate::envelope::ErrorObject;
use crate::error::{BrokerError, CancelReason};
use crate::normalize::{NormalizeError, NormalizeOptions, Normalized, ResponseNormalizer};
use crate::spec::{RequestPath, RequestSpec};
use crate::transport::Transport;

/// Bookkeeping for the request currently occupying the slot.
#[derive(Debug)]
struct PendingRequest {
    id: u64,
    token: CancellationToken,
    reason: Arc<OnceLock<CancelReason>>,
    deadline: Instant,
}

impl PendingRequest {
    fn cancel(self, reason: CancelReason) {
        // First reason wins if the token is cancelled twice.
        let _ = self.reason.set(reason);
        self.token.cancel();
    }
}

/// The calling side of a `PendingRequest`.
struct InFlight<'a> {
    slot: &'a Mutex<Option<PendingRequest>>,
    id: u64,
    token: CancellationToken,
    reason: Arc<OnceLock<CancelReason>>,
    deadline: Instant,
}

impl InFlight<'_> {
    fn cancel_reason(&self) -> CancelReason {
        self.reason.get().copied().unwrap_or(CancelReason::Aborted)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut slot = lock(self.slot);
        if slot.as_ref().is_some_and(|pending| pending.id == self.id) {
            *slot = None;
        }
    }
}

fn lock(slot: &Mutex<Option<PendingRequest>>) -> MutexGuard<'_, Option<PendingRequest>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A decoded 2xx exchange.
struct Exchange {
    status: u16,
    body: Value,
}

/// Issues broker requests, one at a time.
///
/// Raw entry points (`get_raw`, `post_raw`, ...) resolve with the decoded
/// body. Normalized entry points (`get`, `post`, ...) additionally flatten it
/// through a [`ResponseNormalizer`]. Paths are percent-encoded unless passed
/// as [`RequestPath::encoded`].
pub struct RequestExecutor {
    client: BrokerClient,
    normalizer: ResponseNormalizer,
    credentials: Arc<dyn CredentialProvider>,
    transport: Arc<dyn Transport>,
    pending: Mutex<Option<PendingRequest>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("client", &self.client)
            .field("normalizer", &self.normalizer)
            .field("pending", &self.has_pending_request())
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    pub fn new(
        config: BrokerConfig,
        credentials: impl CredentialProvider + 'static,
        transport: impl Transport + 'static,
    ) -> Self {
        Self {
            client: BrokerClient::new(config.base_url.as_deref()),
            normalizer: ResponseNormalizer::new(NormalizeOptions::flat())
                .with_empty_response_message(config.unexpected_error_message),
            credentials: Arc::new(credentials),
            transport: Arc::new(transport),
            pending: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// An executor using [`ReqwestTransport`](crate::transport::ReqwestTransport).
    #[cfg(feature = "reqwest")]
    pub fn with_reqwest(
        config: BrokerConfig,
        credentials: impl CredentialProvider + 'static,
    ) -> Result<Self, crate::transport::TransportError> {
        Ok(Self::new(
            config,
            credentials,
            crate::transport::ReqwestTransport::new()?,
        ))
    }

    /// Choose which optional parts normalized calls keep.
    pub fn with_normalize_options(mut self, options: NormalizeOptions) -> Self {
        let message = self.normalizer.empty_response_message().to_string();
        self.normalizer = ResponseNormalizer::new(options).with_empty_response_message(message);
        self
    }

    /// Supply or replace the base URL.
    pub fn set_base_url(&mut self, base_url: impl AsRef<str>) {
        self.client = BrokerClient::new(Some(base_url.as_ref()));
    }

    pub fn base_url(&self) -> Option<&str> {
        self.client.base_url()
    }

    pub fn has_pending_request(&self) -> bool {
        lock(&self.pending).is_some()
    }

    /// Cancel the in-flight request, if any. Calling this with nothing in
    /// flight does nothing.
    pub fn abort_pending_request(&self) {
        let pending = lock(&self.pending).take();
        if let Some(pending) = pending {
            debug!(request_id = pending.id, "aborting pending broker request");
            pending.cancel(CancelReason::Aborted);
        }
    }

    pub async fn get_raw(
        &self,
        path: impl Into<RequestPath>,
        timeout_ms: u64,
    ) -> Result<Value, BrokerError> {
        self.send_raw(RequestSpec::get(path).timeout_ms(timeout_ms)).await
    }

    pub async fn post_raw<B: Serialize + ?Sized>(
        &self,
        path: impl Into<RequestPath>,
        body: &B,
        timeout_ms: u64,
    ) -> Result<Value, BrokerError> {
        let spec = RequestSpec::post(path, to_body(body)?).timeout_ms(timeout_ms);
        self.send_raw(spec).await
    }

    pub async fn patch_raw<B: Serialize + ?Sized>(
        &self,
        path: impl Into<RequestPath>,
        body: &B,
        timeout_ms: u64,
    ) -> Result<Value, BrokerError> {
        let spec = RequestSpec::patch(path, to_body(body)?).timeout_ms(timeout_ms);
        self.send_raw(spec).await
    }

    pub async fn delete_raw(
        &self,
        path: impl Into<RequestPath>,
        timeout_ms: u64,
    ) -> Result<Value, BrokerError> {
        self.send_raw(RequestSpec::delete(path).timeout_ms(timeout_ms)).await
    }

    pub async fn get(
        &self,
        path: impl Into<RequestPath>,
        timeout_ms: u64,
    ) -> Result<Normalized, BrokerError> {
        self.send(RequestSpec::get(path).timeout_ms(timeout_ms)).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: impl Into<RequestPath>,
        body: &B,
        timeout_ms: u64,
    ) -> Result<Normalized, BrokerError> {
        let spec = RequestSpec::post(path, to_body(body)?).timeout_ms(timeout_ms);
        self.send(spec).await
    }

    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        path: impl Into<RequestPath>,
        body: &B,
        timeout_ms: u64,
    ) -> Result<Normalized, BrokerError> {
        let spec = RequestSpec::patch(path, to_body(body)?).timeout_ms(timeout_ms);
        self.send(spec).await
    }

    pub async fn delete(
        &self,
        path: impl Into<RequestPath>,
        timeout_ms: u64,
    ) -> Result<Normalized, BrokerError> {
        self.send(RequestSpec::delete(path).timeout_ms(timeout_ms)).await
    }

    /// Run `spec` and return the decoded body of a 2xx response.
    pub async fn send_raw(&self, spec: RequestSpec) -> Result<Value, BrokerError> {
        Ok(self.dispatch(spec).await?.body)
    }

    /// Run `spec` and normalize the decoded body of a 2xx response.
    pub async fn send(&self, spec: RequestSpec) -> Result<Normalized, BrokerError> {
        let Exchange { status, body } = self.dispatch(spec).await?;
        self.normalizer
            .normalize_value(&body)
            .map_err(|err| match err {
                NormalizeError::Api(errors) => BrokerError::Api {
                    status,
                    errors: errors.iter().map(ErrorObject::from_value).collect(),
                    body,
                },
                NormalizeError::UnexpectedEmptyResponse { message } => {
                    BrokerError::UnexpectedEmptyResponse {
                        errors: vec![ErrorObject::with_detail(message)],
                    }
                }
                NormalizeError::Malformed(source) => BrokerError::Decode { status, source },
            })
    }

    async fn dispatch(&self, spec: RequestSpec) -> Result<Exchange, BrokerError> {
        let timeout = spec.timeout()?;
        let request = self
            .client
            .build(&spec, &self.credentials.bearer_token())?;
        let method = request.method;
        let url = request.url.clone();

        let in_flight = self.begin(timeout);
        debug!(request_id = in_flight.id, %method, %url, "dispatching broker request");

        let outcome = tokio::select! {
            biased;
            _ = in_flight.token.cancelled() => {
                let reason = in_flight.cancel_reason();
                debug!(request_id = in_flight.id, %reason, "broker request cancelled");
                Err(BrokerError::Cancelled { reason })
            }
            response = self.transport.send(request) => response.map_err(|err| {
                warn!(request_id = in_flight.id, %method, %url, error = %err, "broker request failed");
                BrokerError::Network(err)
            }),
            _ = tokio::time::sleep_until(in_flight.deadline) => {
                warn!(
                    request_id = in_flight.id,
                    %method,
                    %url,
                    timeout_ms = timeout.as_millis() as u64,
                    "broker request timed out"
                );
                in_flight.token.cancel();
                Err(BrokerError::Timeout { after: timeout })
            }
        };
        drop(in_flight);

        let response = outcome?;
        debug!(%method, %url, status = response.status, "broker request completed");
        let body = self.client.parse(&response)?;
        Ok(Exchange {
            status: response.status,
            body,
        })
    }

    /// Install a new pending request, cancelling the one it replaces.
    fn begin(&self, timeout: Duration) -> InFlight<'_> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let pending = PendingRequest {
            id,
            token: CancellationToken::new(),
            reason: Arc::new(OnceLock::new()),
            deadline: Instant::now() + timeout,
        };
        let in_flight = InFlight {
            slot: &self.pending,
            id,
            token: pending.token.clone(),
            reason: Arc::clone(&pending.reason),
            deadline: pending.deadline,
        };

        let previous = lock(&self.pending).replace(pending);
        if let Some(previous) = previous {
            warn!(
                request_id = previous.id,
                superseded_by = id,
                "superseding in-flight broker request"
            );
            previous.cancel(CancelReason::Superseded);
        }
        in_flight
    }
}

fn to_body<B: Serialize + ?Sized>(body: &B) -> Result<Value, BrokerError> {
    serde_json::to_value(body).map_err(BrokerError::Serialization)
}
