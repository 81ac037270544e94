//! Scripted HTTP transport for unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use verdant_domain::{RequestSpec, ResponseSpec};

use crate::auth::TokenStore;
use crate::ports::{HttpClient, HttpClientError};

/// Base URL the scripted client strips before matching routes.
pub const TEST_BASE: &str = "http://api.test";

enum Scripted {
    Reply(Result<ResponseSpec, HttpClientError>),
    Crash,
}

/// Answers requests from per-path queues and records what was sent.
///
/// Paths are matched after stripping [`TEST_BASE`], query string
/// included. An unscripted path answers 404.
#[derive(Default)]
pub struct ScriptedHttpClient {
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    sent: Mutex<Vec<RequestSpec>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for `path`.
    pub fn respond(&self, path: &str, status: u16, body: &str) {
        let response = ResponseSpec::new(
            status,
            HashMap::from([("content-type".to_string(), "application/json".to_string())]),
            body.as_bytes().to_vec(),
            Duration::from_millis(1),
        );
        self.push(path, Scripted::Reply(Ok(response)));
    }

    /// Queues a transport failure for `path`.
    pub fn fail(&self, path: &str, error: HttpClientError) {
        self.push(path, Scripted::Reply(Err(error)));
    }

    /// Queues a panic inside `execute` for `path`.
    pub fn crash(&self, path: &str) {
        self.push(path, Scripted::Crash);
    }

    /// Holds every request to `path` until a permit is added to the
    /// returned semaphore.
    pub fn gate(&self, path: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates.lock().insert(path.to_string(), Arc::clone(&gate));
        gate
    }

    /// All requests in the order they reached the transport.
    pub fn requests(&self) -> Vec<RequestSpec> {
        self.sent.lock().clone()
    }

    /// Requests sent to `path`.
    pub fn requests_to(&self, path: &str) -> Vec<RequestSpec> {
        self.requests()
            .into_iter()
            .filter(|r| route_key(&r.url) == path)
            .collect()
    }

    /// Number of requests sent to `path`.
    pub fn calls_to(&self, path: &str) -> usize {
        self.requests_to(path).len()
    }

    fn push(&self, path: &str, scripted: Scripted) {
        self.routes
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(scripted);
    }
}

fn route_key(url: &str) -> &str {
    url.strip_prefix(TEST_BASE).unwrap_or(url)
}

impl HttpClient for ScriptedHttpClient {
    fn execute(
        &self,
        request: &RequestSpec,
    ) -> impl Future<Output = Result<ResponseSpec, HttpClientError>> + Send {
        let request = request.clone();
        async move {
            self.sent.lock().push(request.clone());
            let key = route_key(&request.url).to_string();

            let gate = self.gates.lock().get(&key).cloned();
            if let Some(gate) = gate {
                let _permit = gate.acquire().await.expect("gate closed");
            }

            let next = self
                .routes
                .lock()
                .get_mut(&key)
                .and_then(VecDeque::pop_front);
            match next {
                Some(Scripted::Reply(reply)) => reply,
                Some(Scripted::Crash) => panic!("transport crashed on {key}"),
                None => Ok(ResponseSpec::new(
                    404,
                    HashMap::new(),
                    format!("no scripted response for {key}").into_bytes(),
                    Duration::ZERO,
                )),
            }
        }
    }
}

/// Waits until a background refresh has written a token.
pub async fn wait_for_token(store: &TokenStore) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while store.get().await.is_none() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("token was never stored");
}
