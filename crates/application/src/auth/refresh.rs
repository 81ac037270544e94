//! Single-flight exchange of the session cookie for a new access token.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info, warn};
use verdant_domain::{AccessToken, RequestSpec, SessionCredential};

use super::endpoint::{ApiBase, REFRESH_PATH};
use super::error::AuthError;
use super::token_store::TokenStore;
use super::ERROR_SNIPPET_CHARS;
use crate::ports::HttpClient;

type RefreshOutcome = Result<AccessToken, AuthError>;
type InFlightRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Body of a successful refresh response.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    access: Option<String>,
}

/// The refresh currently running, tagged so that only its own task can
/// clear it.
struct InFlight {
    id: u64,
    handle: InFlightRefresh,
}

#[derive(Default)]
struct RefreshSlot {
    next_id: u64,
    current: Option<InFlight>,
}

/// Clears the slot when the refresh task ends, however it ends.
///
/// Held by the spawned task, so a panic or a runtime shutdown drops it
/// as well and a later caller starts a fresh refresh.
struct SlotRelease {
    slot: Arc<Mutex<RefreshSlot>>,
    id: u64,
}

impl Drop for SlotRelease {
    fn drop(&mut self) {
        let released = self
            .slot
            .lock()
            .current
            .take_if(|running| running.id == self.id);
        // The handle may be the last owner of the task future; drop it unlocked.
        drop(released);
    }
}

/// Obtains new access tokens from the refresh endpoint.
///
/// At most one refresh is in flight per coordinator. Callers that ask for
/// a refresh while one is running wait for that one and receive the same
/// outcome. The exchange runs as its own task, so it completes and updates
/// the token store even if every waiter goes away.
pub struct RefreshCoordinator<C> {
    client: Arc<C>,
    store: TokenStore,
    endpoint: String,
    credential: SessionCredential,
    in_flight: Arc<Mutex<RefreshSlot>>,
}

impl<C: HttpClient + 'static> RefreshCoordinator<C> {
    /// Creates a coordinator writing refreshed tokens into `store`.
    #[must_use]
    pub fn new(
        client: Arc<C>,
        base: &ApiBase,
        store: TokenStore,
        credential: SessionCredential,
    ) -> Self {
        Self {
            client,
            store,
            endpoint: base.resolve(REFRESH_PATH),
            credential,
            in_flight: Arc::new(Mutex::new(RefreshSlot::default())),
        }
    }

    /// Returns true while a refresh is in flight.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.in_flight.lock().current.is_some()
    }

    /// Exchanges the session credential for a new access token.
    ///
    /// Joins the refresh already in flight, if any. On success the token
    /// is written to the store before any waiter sees it.
    ///
    /// # Errors
    ///
    /// - [`AuthError::RefreshFailed`] if the server rejects the session
    /// - [`AuthError::RefreshEmpty`] if a 2xx response has no usable token
    /// - [`AuthError::Transport`] on connectivity failures
    /// - [`AuthError::RefreshAborted`] if the refresh task panicked or was
    ///   cancelled; the next call starts over
    pub async fn refresh(&self) -> RefreshOutcome {
        let handle = {
            let mut slot = self.in_flight.lock();
            if let Some(running) = &slot.current {
                debug!("joining in-flight token refresh");
                running.handle.clone()
            } else {
                slot.next_id += 1;
                let id = slot.next_id;
                let handle = self.prepare(id);
                slot.current = Some(InFlight {
                    id,
                    handle: handle.clone(),
                });
                handle
            }
        };
        handle.await
    }

    /// Builds the refresh handle for slot entry `id`.
    ///
    /// Nothing runs until the handle is first polled, which happens after
    /// the slot lock is released. The first poll spawns the exchange.
    fn prepare(&self, id: u64) -> InFlightRefresh {
        let client = Arc::clone(&self.client);
        let store = self.store.clone();
        let release = SlotRelease {
            slot: Arc::clone(&self.in_flight),
            id,
        };
        let request = self.refresh_request();

        async move {
            debug!(endpoint = %request.url, "starting token refresh");
            let task = tokio::spawn(async move {
                let outcome = exchange(client.as_ref(), &request).await;
                match &outcome {
                    Ok(token) => {
                        store.set(token.clone()).await;
                        info!(token = %token.preview(), "access token refreshed");
                    }
                    Err(e) => warn!(error = %e, "token refresh failed"),
                }
                drop(release);
                outcome
            });

            task.await.unwrap_or_else(|e| {
                warn!(error = %e, "token refresh task did not finish");
                Err(AuthError::RefreshAborted(e.to_string()))
            })
        }
        .boxed()
        .shared()
    }

    fn refresh_request(&self) -> RequestSpec {
        let request =
            RequestSpec::post(&self.endpoint).with_header("Content-Type", "application/json");
        match self.credential.cookie_header() {
            Some(cookie) => request.with_header("Cookie", cookie),
            None => request,
        }
    }
}

async fn exchange<C: HttpClient>(client: &C, request: &RequestSpec) -> RefreshOutcome {
    let response = client.execute(request).await?;

    if !response.is_success() {
        return Err(AuthError::RefreshFailed {
            status: response.status,
            body: response.body_snippet(ERROR_SNIPPET_CHARS),
        });
    }

    let body: RefreshResponse = response.json().map_err(|_| AuthError::RefreshEmpty)?;
    body.access
        .and_then(|access| AccessToken::new(access).ok())
        .ok_or(AuthError::RefreshEmpty)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::ports::HttpClientError;
    use crate::testing::{ScriptedHttpClient, TEST_BASE};
    use futures::future::join_all;
    use pretty_assertions::assert_eq;

    fn coordinator(
        client: &Arc<ScriptedHttpClient>,
    ) -> (RefreshCoordinator<ScriptedHttpClient>, TokenStore) {
        let store = TokenStore::new();
        let coordinator = RefreshCoordinator::new(
            Arc::clone(client),
            &ApiBase::new(TEST_BASE),
            store.clone(),
            SessionCredential::Ambient,
        );
        (coordinator, store)
    }

    #[tokio::test]
    async fn refresh_stores_and_returns_token() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.respond(REFRESH_PATH, 200, r#"{"access":"T1"}"#);
        let (coordinator, store) = coordinator(&client);

        let token = coordinator.refresh().await.unwrap();

        assert_eq!(token.as_str(), "T1");
        assert_eq!(store.get().await, Some(token));
        assert!(!coordinator.is_refreshing());

        let sent = client.requests_to(REFRESH_PATH);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, verdant_domain::HttpMethod::Post);
        assert_eq!(sent[0].headers.get("content-type"), Some("application/json"));
        assert_eq!(sent[0].body, None);
    }

    #[tokio::test]
    async fn concurrent_refreshes_share_one_network_call() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.respond(REFRESH_PATH, 200, r#"{"access":"T1"}"#);
        let gate = client.gate(REFRESH_PATH);
        let (coordinator, _store) = coordinator(&client);

        let calls: Vec<_> = (0..8).map(|_| coordinator.refresh()).collect();
        let (outcomes, ()) = tokio::join!(join_all(calls), async {
            tokio::task::yield_now().await;
            gate.add_permits(1);
        });

        assert_eq!(client.calls_to(REFRESH_PATH), 1);
        assert_eq!(outcomes.len(), 8);
        for outcome in outcomes {
            assert_eq!(outcome.unwrap().as_str(), "T1");
        }
    }

    #[tokio::test]
    async fn concurrent_waiters_share_one_failure() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.respond(REFRESH_PATH, 401, r#"{"detail":"Token is invalid or expired"}"#);
        let gate = client.gate(REFRESH_PATH);
        let (coordinator, store) = coordinator(&client);

        let calls: Vec<_> = (0..4).map(|_| coordinator.refresh()).collect();
        let (outcomes, ()) = tokio::join!(join_all(calls), async {
            tokio::task::yield_now().await;
            gate.add_permits(1);
        });

        assert_eq!(client.calls_to(REFRESH_PATH), 1);
        let expected = AuthError::RefreshFailed {
            status: 401,
            body: r#"{"detail":"Token is invalid or expired"}"#.to_string(),
        };
        for outcome in outcomes {
            assert_eq!(outcome, Err(expected.clone()));
        }
        assert_eq!(store.get().await, None);
    }

    #[tokio::test]
    async fn failed_refresh_allows_a_new_attempt() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.respond(REFRESH_PATH, 500, "boom");
        client.respond(REFRESH_PATH, 200, r#"{"access":"T2"}"#);
        let (coordinator, store) = coordinator(&client);

        assert!(matches!(
            coordinator.refresh().await,
            Err(AuthError::RefreshFailed { status: 500, .. })
        ));
        assert!(!coordinator.is_refreshing());

        assert_eq!(coordinator.refresh().await.unwrap().as_str(), "T2");
        assert_eq!(client.calls_to(REFRESH_PATH), 2);
        assert_eq!(store.get().await.unwrap().as_str(), "T2");
    }

    #[tokio::test]
    async fn each_refresh_after_completion_hits_the_network() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.respond(REFRESH_PATH, 200, r#"{"access":"T1"}"#);
        client.respond(REFRESH_PATH, 200, r#"{"access":"T2"}"#);
        let (coordinator, store) = coordinator(&client);

        assert_eq!(coordinator.refresh().await.unwrap().as_str(), "T1");
        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.refresh().await.unwrap().as_str(), "T2");

        assert_eq!(client.calls_to(REFRESH_PATH), 2);
        assert_eq!(store.get().await.unwrap().as_str(), "T2");
    }

    #[tokio::test]
    async fn crashed_refresh_task_does_not_block_later_refreshes() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.crash(REFRESH_PATH);
        client.respond(REFRESH_PATH, 200, r#"{"access":"T1"}"#);
        let (coordinator, store) = coordinator(&client);

        let first = coordinator.refresh().await;

        assert!(matches!(first, Err(AuthError::RefreshAborted(_))));
        assert!(!coordinator.is_refreshing());
        assert_eq!(store.get().await, None);

        assert_eq!(coordinator.refresh().await.unwrap().as_str(), "T1");
        assert_eq!(client.calls_to(REFRESH_PATH), 2);
        assert_eq!(store.get().await.unwrap().as_str(), "T1");
    }

    #[tokio::test]
    async fn crash_is_shared_by_every_waiter_then_cleared() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.crash(REFRESH_PATH);
        client.respond(REFRESH_PATH, 200, r#"{"access":"T1"}"#);
        let gate = client.gate(REFRESH_PATH);
        let (coordinator, _store) = coordinator(&client);

        let calls: Vec<_> = (0..3).map(|_| coordinator.refresh()).collect();
        let (outcomes, ()) = tokio::join!(join_all(calls), async {
            tokio::task::yield_now().await;
            gate.add_permits(1);
        });

        assert_eq!(client.calls_to(REFRESH_PATH), 1);
        assert!(
            outcomes
                .iter()
                .all(|o| matches!(o, Err(AuthError::RefreshAborted(_))))
        );

        assert_eq!(coordinator.refresh().await.unwrap().as_str(), "T1");
        assert_eq!(client.calls_to(REFRESH_PATH), 2);
    }

    #[tokio::test]
    async fn rejected_session_reports_status_and_truncated_body() {
        let client = Arc::new(ScriptedHttpClient::new());
        let long_body = "x".repeat(1000);
        client.respond(REFRESH_PATH, 400, &long_body);
        let (coordinator, _store) = coordinator(&client);

        match coordinator.refresh().await {
            Err(AuthError::RefreshFailed { status, body }) => {
                assert_eq!(status, 400);
                assert_eq!(body.len(), ERROR_SNIPPET_CHARS);
            }
            other => panic!("expected RefreshFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_or_blank_access_is_refresh_empty() {
        for body in [r"{}", r#"{"access":""}"#, r#"{"access":null}"#, "not json"] {
            let client = Arc::new(ScriptedHttpClient::new());
            client.respond(REFRESH_PATH, 200, body);
            let (coordinator, store) = coordinator(&client);

            assert_eq!(coordinator.refresh().await, Err(AuthError::RefreshEmpty), "body: {body}");
            assert_eq!(store.get().await, None);
        }
    }

    #[tokio::test]
    async fn transport_failure_passes_through() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.fail(REFRESH_PATH, HttpClientError::ConnectionFailed("refused".to_string()));
        let (coordinator, _store) = coordinator(&client);

        assert_eq!(
            coordinator.refresh().await,
            Err(AuthError::Transport(HttpClientError::ConnectionFailed(
                "refused".to_string()
            )))
        );
    }

    #[tokio::test]
    async fn explicit_credential_is_sent_as_cookie() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.respond(REFRESH_PATH, 200, r#"{"access":"T1"}"#);
        let coordinator = RefreshCoordinator::new(
            Arc::clone(&client),
            &ApiBase::new(TEST_BASE),
            TokenStore::new(),
            SessionCredential::RefreshCookie("r-123".to_string()),
        );

        coordinator.refresh().await.unwrap();

        let sent = client.requests_to(REFRESH_PATH);
        assert_eq!(sent[0].headers.get("cookie"), Some("refresh_token=r-123"));
    }

    #[tokio::test]
    async fn refresh_completes_after_waiter_is_dropped() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.respond(REFRESH_PATH, 200, r#"{"access":"T1"}"#);
        let gate = client.gate(REFRESH_PATH);
        let (coordinator, store) = coordinator(&client);

        let abandoned = tokio::time::timeout(
            std::time::Duration::from_millis(10),
            coordinator.refresh(),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(coordinator.is_refreshing());

        gate.add_permits(1);
        crate::testing::wait_for_token(&store).await;
        assert_eq!(store.get().await.unwrap().as_str(), "T1");
        assert_eq!(client.calls_to(REFRESH_PATH), 1);
    }
}
