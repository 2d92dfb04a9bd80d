//! Shared HTTP transport for registry calls
//!
//! Every outbound request goes through [`HttpTransport::send`], which:
//! - bounds the number of requests in flight ([`MAX_CONCURRENT_REQUESTS`])
//! - applies a per-request timeout
//! - retries 5xx responses and connection failures with exponential backoff
//! - stops immediately when the run's [`CancellationToken`] fires
//!
//! Timeouts and cancellation surface as [`MmmError::Timeout`] / [`MmmError::Cancelled`]
//! and are never retried.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::constants::{
    MAX_BACKOFF_DELAY_MS, MAX_CONCURRENT_REQUESTS, MAX_HTTP_RETRIES, STARTING_BACKOFF_DELAY_MS,
};
use crate::core::MmmError;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("mmm-cli/", env!("CARGO_PKG_VERSION"));

/// Retry-aware, cancellable HTTP transport shared by all registry clients.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
    max_retries: usize,
}

// Outcome of one attempt, split so the retry condition can tell them apart
enum Attempt {
    Retryable(MmmError),
    Fatal(MmmError),
}

impl Attempt {
    fn into_error(self) -> MmmError {
        match self {
            Self::Retryable(e) | Self::Fatal(e) => e,
        }
    }
}

impl HttpTransport {
    /// Build a transport bound to `cancel`.
    pub fn new(cancel: CancellationToken) -> Result<Self, MmmError> {
        let client = Client::builder().user_agent(USER_AGENT).build().map_err(|e| {
            MmmError::Other {
                message: format!("Failed to create HTTP client: {e}"),
            }
        })?;

        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(MAX_CONCURRENT_REQUESTS)),
            cancel,
            max_retries: MAX_HTTP_RETRIES,
        })
    }

    /// Override the number of retries for 5xx and connection failures.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Send a request built by `build`, retrying transient failures.
    ///
    /// `build` is called once per attempt. Any response below 500 is returned to the
    /// caller, which decides what 404 or 403 mean for its endpoint.
    pub async fn send<F>(
        &self,
        platform: &str,
        operation: &str,
        timeout: Duration,
        build: F,
    ) -> Result<Response, MmmError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        // from_millis(10) grows 10, 100, 1000..., the factor scales the first delay
        let strategy = ExponentialBackoff::from_millis(10)
            .factor(STARTING_BACKOFF_DELAY_MS / 10)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS))
            .take(self.max_retries);

        let mut attempt = 0usize;
        RetryIf::spawn(
            strategy,
            || {
                attempt += 1;
                let request = build(&self.client).timeout(timeout);
                self.attempt(platform, operation, attempt, request)
            },
            |e: &Attempt| matches!(e, Attempt::Retryable(_)),
        )
        .await
        .map_err(Attempt::into_error)
    }

    async fn attempt(
        &self,
        platform: &str,
        operation: &str,
        attempt: usize,
        request: RequestBuilder,
    ) -> Result<Response, Attempt> {
        if self.cancel.is_cancelled() {
            return Err(Attempt::Fatal(MmmError::Cancelled));
        }

        let _permit = tokio::select! {
            () = self.cancel.cancelled() => return Err(Attempt::Fatal(MmmError::Cancelled)),
            permit = self.permits.acquire() => permit.map_err(|e| {
                Attempt::Fatal(MmmError::Other { message: e.to_string() })
            })?,
        };

        debug!(platform, operation, attempt, "Sending registry request");

        let result = tokio::select! {
            () = self.cancel.cancelled() => return Err(Attempt::Fatal(MmmError::Cancelled)),
            result = request.send() => result,
        };

        match result {
            Ok(response) if response.status().is_server_error() => {
                warn!(platform, operation, attempt, status = %response.status(), "Registry returned server error");
                Err(Attempt::Retryable(MmmError::transient(
                    platform,
                    operation,
                    format!("unexpected status {}", response.status()),
                )))
            }
            Ok(response) => Ok(response),
            Err(e) if e.is_timeout() => Err(Attempt::Fatal(MmmError::Timeout {
                operation: format!("{platform} {operation}"),
            })),
            Err(e) if e.is_connect() => {
                warn!(platform, operation, attempt, error = %e, "Registry connection failed");
                Err(Attempt::Retryable(MmmError::transient(platform, operation, e)))
            }
            Err(e) => Err(Attempt::Fatal(MmmError::transient(platform, operation, e))),
        }
    }
}

/// Decode a JSON body, mapping failures to [`MmmError::TransientApi`].
pub async fn decode_json<T: DeserializeOwned>(
    response: Response,
    platform: &str,
    operation: &str,
) -> Result<T, MmmError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| MmmError::transient(platform, operation, e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| MmmError::transient(platform, operation, format!("invalid response: {e}")))
}

/// Error for a response whose status the caller did not expect.
#[must_use]
pub fn unexpected_status(platform: &str, operation: &str, status: StatusCode) -> MmmError {
    MmmError::transient(platform, operation, format!("unexpected status {status}"))
}
