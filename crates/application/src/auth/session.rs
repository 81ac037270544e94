//! Authenticated requests against the portal API.

use std::sync::Arc;

use tracing::{debug, info, warn};
use verdant_domain::{
    AccessToken, Header, Headers, HttpMethod, LoginCredentials, RequestBody, RequestSpec,
    ResponseSpec, SessionCredential,
};

use super::ERROR_SNIPPET_CHARS;
use super::endpoint::{ApiBase, LOGIN_PATH, LOGOUT_PATH};
use super::error::AuthError;
use super::refresh::RefreshCoordinator;
use super::token_store::TokenStore;
use crate::ports::{CancellationReceiver, HttpClient, HttpClientError};

/// One logical request issued through an [`AuthSession`].
///
/// `path` is relative to the API base unless it is an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Path relative to the API base, or an absolute URL
    pub path: String,
    /// Caller headers; any `Authorization` header is replaced
    pub headers: Headers,
    /// Request body
    pub body: Option<RequestBody>,
}

impl ApiRequest {
    /// Creates a request without headers or body.
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// Creates a POST request.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(Header::new(name, value));
        self
    }

    fn to_spec(&self, base: &ApiBase, token: &AccessToken) -> RequestSpec {
        let mut headers = self.headers.clone();
        headers.set("Authorization", token.authorization_header());
        RequestSpec {
            method: self.method,
            url: base.resolve(&self.path),
            headers,
            body: self.body.clone(),
        }
    }
}

/// Owns the access-token lifecycle for one client.
///
/// Share it with `Arc`; all requests issued through one session share its
/// token and its single in-flight refresh.
pub struct AuthSession<C> {
    client: Arc<C>,
    base: ApiBase,
    credential: SessionCredential,
    store: TokenStore,
    refresher: RefreshCoordinator<C>,
}

impl<C: HttpClient + 'static> AuthSession<C> {
    /// Creates a session with an empty token store.
    #[must_use]
    pub fn new(client: Arc<C>, base: ApiBase, credential: SessionCredential) -> Self {
        let store = TokenStore::new();
        let refresher = RefreshCoordinator::new(
            Arc::clone(&client),
            &base,
            store.clone(),
            credential.clone(),
        );
        Self {
            client,
            base,
            credential,
            store,
            refresher,
        }
    }

    /// The session's token store.
    #[must_use]
    pub const fn token_store(&self) -> &TokenStore {
        &self.store
    }

    /// The API base URL requests are resolved against.
    #[must_use]
    pub const fn api_base(&self) -> &ApiBase {
        &self.base
    }

    /// Returns the cached token, or refreshes if none is cached.
    ///
    /// # Errors
    ///
    /// Propagates refresh failures.
    pub async fn valid_token(&self) -> Result<AccessToken, AuthError> {
        if let Some(token) = self.store.get().await {
            return Ok(token);
        }
        debug!("no cached access token, refreshing");
        self.refresher.refresh().await
    }

    /// Performs `request` with a bearer token.
    ///
    /// If the server answers 401, the token is cleared, a new one is
    /// obtained and the request is sent exactly once more. The second
    /// response is returned whatever its status.
    ///
    /// # Errors
    ///
    /// - Refresh failures abort the attempt ([`AuthError::RefreshFailed`],
    ///   [`AuthError::RefreshEmpty`])
    /// - Transport failures are returned unchanged ([`AuthError::Transport`])
    pub async fn fetch(&self, request: ApiRequest) -> Result<ResponseSpec, AuthError> {
        let token = self.valid_token().await?;
        let response = self.send(&request, &token).await?;

        if !response.is_unauthorized() {
            return Ok(response);
        }

        warn!(path = %request.path, "access token rejected, refreshing and retrying once");
        self.store.clear_if_current(&token).await;
        let fresh = self.valid_token().await?;
        self.send(&request, &fresh).await
    }

    /// Like [`fetch`](Self::fetch), abandoned when `cancel` fires.
    ///
    /// Cancelling never stops a refresh that has already started; it
    /// completes and stores its token for later requests.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Transport(HttpClientError::Cancelled)` if
    /// cancelled, otherwise as [`fetch`](Self::fetch).
    pub async fn fetch_with_cancellation(
        &self,
        request: ApiRequest,
        mut cancel: CancellationReceiver,
    ) -> Result<ResponseSpec, AuthError> {
        tokio::select! {
            result = self.fetch(request) => result,
            () = cancel.cancelled() => {
                debug!("authenticated request cancelled");
                Err(AuthError::Transport(HttpClientError::Cancelled))
            }
        }
    }

    /// Signs in with email and password, then obtains an access token.
    ///
    /// The server answers a successful sign-in by setting the refresh
    /// cookie; the refresh that follows presents it. Any cached token is
    /// dropped first.
    ///
    /// # Errors
    ///
    /// - [`AuthError::LoginFailed`] if the credentials are rejected
    /// - Refresh failures after a successful sign-in
    /// - [`AuthError::Transport`] on connectivity failures
    pub async fn sign_in(&self, login: &LoginCredentials) -> Result<AccessToken, AuthError> {
        let request = RequestSpec::post(self.base.resolve(LOGIN_PATH))
            .with_body(RequestBody::json_value(login)?);
        debug!(url = %request.url, email = %login.email, "signing in");
        let response = self.client.execute(&request).await?;

        if !response.is_success() {
            return Err(AuthError::LoginFailed {
                status: response.status,
                body: response.body_snippet(ERROR_SNIPPET_CHARS),
            });
        }

        self.store.clear().await;
        let token = self.refresher.refresh().await?;
        info!(email = %login.email, "signed in");
        Ok(token)
    }

    /// Ends the session on the server, then forgets the cached token.
    ///
    /// The sign-out call is authenticated like any other request. The
    /// cached token is cleared whatever the server answers.
    ///
    /// # Errors
    ///
    /// - [`AuthError::LogoutFailed`] if the server refuses the sign-out
    /// - Refresh and transport failures while reaching the endpoint
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let mut request = ApiRequest::post(LOGOUT_PATH);
        if let Some(cookie) = self.credential.cookie_header() {
            request = request.with_header("Cookie", cookie);
        }
        let outcome = self.fetch(request).await;
        self.store.clear().await;

        let response = outcome?;
        if !response.is_success() {
            return Err(AuthError::LogoutFailed {
                status: response.status,
                body: response.body_snippet(ERROR_SNIPPET_CHARS),
            });
        }
        info!("signed out");
        Ok(())
    }

    async fn send(
        &self,
        request: &ApiRequest,
        token: &AccessToken,
    ) -> Result<ResponseSpec, AuthError> {
        let spec = request.to_spec(&self.base, token);
        debug!(method = %spec.method, url = %spec.url, "sending authenticated request");
        Ok(self.client.execute(&spec).await?)
    }
}
