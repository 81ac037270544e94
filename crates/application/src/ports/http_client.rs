//! HTTP Client port

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use verdant_domain::{RequestSpec, ResponseSpec};

/// Transport-level failures.
///
/// These are connectivity problems, not HTTP error statuses: a 4xx/5xx
/// response is a successful `execute` carrying that status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpClientError {
    /// The request URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The request did not complete within the timeout.
    #[error("request timed out after {timeout_ms} ms")]
    Timeout {
        /// The timeout that elapsed
        timeout_ms: u64,
    },

    /// The host name could not be resolved.
    #[error("could not resolve {host}: {message}")]
    DnsError {
        /// Host that failed to resolve
        host: String,
        /// Resolver message
        message: String,
    },

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The redirect limit was exceeded.
    #[error("too many redirects (max {max})")]
    TooManyRedirects {
        /// Redirect limit
        max: usize,
    },

    /// The request body was rejected before sending.
    #[error("invalid body: {0}")]
    InvalidBody(String),

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

/// Port for executing HTTP requests.
///
/// Implementations attach the session's cookies to every request
/// (credentialed requests) and never retry on their own.
pub trait HttpClient: Send + Sync {
    /// Executes an HTTP request and returns the response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails due to network issues,
    /// timeout, or other transport problems. HTTP error statuses are
    /// returned as responses.
    fn execute(
        &self,
        request: &RequestSpec,
    ) -> impl Future<Output = Result<ResponseSpec, HttpClientError>> + Send;
}

/// Cancels the requests observing its [`CancellationReceiver`]s.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    sender: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    /// Creates a token and its first receiver.
    #[allow(clippy::new_ret_no_self)]
    #[must_use]
    pub fn new() -> (Self, CancellationReceiver) {
        let (sender, receiver) = watch::channel(false);
        (
            Self {
                sender: Arc::new(sender),
            },
            CancellationReceiver { receiver },
        )
    }

    /// Signals cancellation to every receiver.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Creates another receiver for this token.
    #[must_use]
    pub fn receiver(&self) -> CancellationReceiver {
        CancellationReceiver {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Observes a [`CancellationToken`].
#[derive(Debug, Clone)]
pub struct CancellationReceiver {
    receiver: watch::Receiver<bool>,
}

impl CancellationReceiver {
    /// Resolves when the token is cancelled.
    ///
    /// If the token is dropped without cancelling, this never resolves.
    pub async fn cancelled(&mut self) {
        let closed = self.receiver.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }

    /// Returns true if the token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }
}
