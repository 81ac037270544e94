//! Social directory use case.
//!
//! Typed access to the user search and friendship endpoints. Every call
//! goes through the authenticated session, so it shares the session's
//! token and refresh.

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use verdant_domain::{ResponseSpec, UserSummary};

use crate::auth::{ApiRequest, AuthSession, ERROR_SNIPPET_CHARS};
use crate::error::{ApplicationError, ApplicationResult};
use crate::ports::{CancellationReceiver, HttpClient};

const MY_FRIENDS_PATH: &str = "/api/friends/";
const FRIEND_REQUESTS_PATH: &str = "/api/friend-requests/";

#[derive(Debug, Deserialize)]
struct IsFriendResponse {
    is_friend: bool,
}

/// Use case for searching users and managing friendships.
pub struct SocialDirectory<C> {
    session: Arc<AuthSession<C>>,
}

impl<C: HttpClient + 'static> SocialDirectory<C> {
    /// Creates a new `SocialDirectory` over `session`.
    #[must_use]
    pub const fn new(session: Arc<AuthSession<C>>) -> Self {
        Self { session }
    }

    /// Searches users by name. A blank query returns no users and sends
    /// no request.
    ///
    /// # Errors
    /// - [`ApplicationError::UnexpectedStatus`] on a non-2xx answer
    /// - [`ApplicationError::InvalidResponse`] if the body is not a user list
    /// - [`ApplicationError::Auth`] on refresh or transport failures
    pub async fn search_users(&self, query: &str) -> ApplicationResult<Vec<UserSummary>> {
        self.search(query, None).await
    }

    /// Like [`search_users`](Self::search_users), abandoned when `cancel`
    /// fires.
    ///
    /// # Errors
    /// Returns [`ApplicationError::Cancelled`] if cancelled, otherwise as
    /// [`search_users`](Self::search_users).
    pub async fn search_users_with_cancellation(
        &self,
        query: &str,
        cancel: CancellationReceiver,
    ) -> ApplicationResult<Vec<UserSummary>> {
        self.search(query, Some(cancel)).await
    }

    /// Lists the friends of `user_id`.
    ///
    /// # Errors
    /// As [`search_users`](Self::search_users).
    pub async fn friends_of(&self, user_id: u64) -> ApplicationResult<Vec<UserSummary>> {
        let response = self
            .send(ApiRequest::get(format!("/users/{user_id}/friends/")), None)
            .await?;
        decode(&response)
    }

    /// Lists the friends of the signed-in user.
    ///
    /// # Errors
    /// As [`search_users`](Self::search_users).
    pub async fn my_friends(&self) -> ApplicationResult<Vec<UserSummary>> {
        let response = self.send(ApiRequest::get(MY_FRIENDS_PATH), None).await?;
        decode(&response)
    }

    /// Lists users who follow the signed-in user without being followed back.
    ///
    /// # Errors
    /// As [`search_users`](Self::search_users).
    pub async fn friend_requests(&self) -> ApplicationResult<Vec<UserSummary>> {
        let response = self
            .send(ApiRequest::get(FRIEND_REQUESTS_PATH), None)
            .await?;
        decode(&response)
    }

    /// Follows `user_id`. Following someone who sent a request accepts it.
    ///
    /// # Errors
    /// - [`ApplicationError::UnexpectedStatus`] on a non-2xx answer
    /// - [`ApplicationError::Auth`] on refresh or transport failures
    pub async fn follow(&self, user_id: u64) -> ApplicationResult<()> {
        self.post_action(user_id, "follow").await
    }

    /// Stops following `user_id`.
    ///
    /// # Errors
    /// As [`follow`](Self::follow).
    pub async fn unfollow(&self, user_id: u64) -> ApplicationResult<()> {
        self.post_action(user_id, "unfollow").await
    }

    /// Removes the friendship with `user_id` in both directions.
    ///
    /// # Errors
    /// As [`follow`](Self::follow).
    pub async fn unfriend(&self, user_id: u64) -> ApplicationResult<()> {
        self.post_action(user_id, "unfriend").await
    }

    /// Rejects the friend request from `user_id`.
    ///
    /// # Errors
    /// As [`follow`](Self::follow).
    pub async fn reject(&self, user_id: u64) -> ApplicationResult<()> {
        self.post_action(user_id, "reject").await
    }

    /// Returns whether `user_id` and `target_id` are friends.
    ///
    /// # Errors
    /// As [`search_users`](Self::search_users).
    pub async fn is_friend(&self, user_id: u64, target_id: u64) -> ApplicationResult<bool> {
        let query = encode_query(&[("target_id", target_id.to_string().as_str())])?;
        let response = self
            .send(
                ApiRequest::get(format!("/users/{user_id}/is-friend/?{query}")),
                None,
            )
            .await?;
        let body: IsFriendResponse = decode(&response)?;
        Ok(body.is_friend)
    }

    async fn search(
        &self,
        query: &str,
        cancel: Option<CancellationReceiver>,
    ) -> ApplicationResult<Vec<UserSummary>> {
        let query = query.trim();
        if query.is_empty() {
            debug!("blank user search, skipping request");
            return Ok(Vec::new());
        }

        let encoded = encode_query(&[("search", query)])?;
        let response = self
            .send(ApiRequest::get(format!("/users/search/?{encoded}")), cancel)
            .await?;
        decode(&response)
    }

    async fn post_action(&self, user_id: u64, action: &str) -> ApplicationResult<()> {
        let request = ApiRequest::post(format!("/users/{user_id}/{action}/"))
            .with_header("Content-Type", "application/json");
        self.send(request, None).await?;
        debug!(user_id, action, "social action accepted");
        Ok(())
    }

    async fn send(
        &self,
        request: ApiRequest,
        cancel: Option<CancellationReceiver>,
    ) -> ApplicationResult<ResponseSpec> {
        let result = match cancel {
            Some(cancel) => self.session.fetch_with_cancellation(request, cancel).await,
            None => self.session.fetch(request).await,
        };
        let response = result.map_err(|e| {
            if e.is_cancelled() {
                ApplicationError::Cancelled
            } else {
                ApplicationError::Auth(e)
            }
        })?;

        if !response.is_success() {
            return Err(ApplicationError::UnexpectedStatus {
                status: response.status,
                body: response.body_snippet(ERROR_SNIPPET_CHARS),
            });
        }
        Ok(response)
    }
}

fn encode_query(pairs: &[(&str, &str)]) -> ApplicationResult<String> {
    serde_urlencoded::to_string(pairs).map_err(|e| ApplicationError::InvalidQuery(e.to_string()))
}

fn decode<T: DeserializeOwned>(response: &ResponseSpec) -> ApplicationResult<T> {
    response
        .json()
        .map_err(|e| ApplicationError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::auth::{ApiBase, AuthError, REFRESH_PATH};
    use crate::ports::CancellationToken;
    use crate::testing::{ScriptedHttpClient, TEST_BASE};
    use pretty_assertions::assert_eq;
    use verdant_domain::{AccessToken, HttpMethod, SessionCredential};

    const ROSA_AND_IVY: &str = r#"[
        {"id":2,"username":"rosa","first_name":"Rosa","last_name":"Canina"},
        {"id":3,"username":"ivy","first_name":"","last_name":""}
    ]"#;

    async fn directory(client: &Arc<ScriptedHttpClient>) -> SocialDirectory<ScriptedHttpClient> {
        let session = AuthSession::new(
            Arc::clone(client),
            ApiBase::new(TEST_BASE),
            SessionCredential::Ambient,
        );
        session
            .token_store()
            .set(AccessToken::new("T0").unwrap())
            .await;
        SocialDirectory::new(Arc::new(session))
    }

    #[tokio::test]
    async fn search_encodes_query_and_parses_users() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.respond("/users/search/?search=rosa+c%26b", 200, ROSA_AND_IVY);
        let directory = directory(&client).await;

        let users = directory.search_users("  rosa c&b ").await.unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].display_name(), "Rosa Canina");
        assert_eq!(users[1].display_name(), "ivy");
        let sent = &client.requests()[0];
        assert_eq!(sent.method, HttpMethod::Get);
        assert_eq!(sent.headers.get("authorization"), Some("Bearer T0"));
    }

    #[tokio::test]
    async fn blank_search_sends_nothing() {
        let client = Arc::new(ScriptedHttpClient::new());
        let directory = directory(&client).await;

        assert_eq!(directory.search_users("   ").await.unwrap(), Vec::new());
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn cancelled_search_reports_cancelled() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.respond("/users/search/?search=fern", 200, "[]");
        let _gate = client.gate("/users/search/?search=fern");
        let directory = directory(&client).await;
        let (token, receiver) = CancellationToken::new();

        let (result, ()) = tokio::join!(
            directory.search_users_with_cancellation("fern", receiver),
            async {
                tokio::task::yield_now().await;
                token.cancel();
            }
        );

        assert!(matches!(result, Err(ApplicationError::Cancelled)));
    }

    #[tokio::test]
    async fn friend_lists_hit_their_endpoints() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.respond("/users/9/friends/", 200, ROSA_AND_IVY);
        client.respond(MY_FRIENDS_PATH, 200, "[]");
        client.respond(FRIEND_REQUESTS_PATH, 200, r#"[{"id":4,"username":"moss"}]"#);
        let directory = directory(&client).await;

        assert_eq!(directory.friends_of(9).await.unwrap().len(), 2);
        assert!(directory.my_friends().await.unwrap().is_empty());
        let requests = directory.friend_requests().await.unwrap();
        assert_eq!(requests[0].username, "moss");
        assert_eq!(requests[0].first_name, None);
    }

    #[tokio::test]
    async fn actions_post_to_user_endpoints() {
        let client = Arc::new(ScriptedHttpClient::new());
        for path in [
            "/users/5/follow/",
            "/users/5/unfollow/",
            "/users/5/unfriend/",
            "/users/5/reject/",
        ] {
            client.respond(path, 200, r#"{"detail":"ok"}"#);
        }
        let directory = directory(&client).await;

        directory.follow(5).await.unwrap();
        directory.unfollow(5).await.unwrap();
        directory.unfriend(5).await.unwrap();
        directory.reject(5).await.unwrap();

        let sent = client.requests();
        assert_eq!(sent.len(), 4);
        for request in sent {
            assert_eq!(request.method, HttpMethod::Post);
            assert_eq!(request.headers.get("content-type"), Some("application/json"));
            assert_eq!(request.body, None);
        }
    }

    #[tokio::test]
    async fn is_friend_reads_flag() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.respond("/users/1/is-friend/?target_id=2", 200, r#"{"is_friend":true}"#);
        client.respond("/users/1/is-friend/?target_id=3", 200, r#"{"is_friend":false}"#);
        let directory = directory(&client).await;

        assert!(directory.is_friend(1, 2).await.unwrap());
        assert!(!directory.is_friend(1, 3).await.unwrap());
    }

    #[tokio::test]
    async fn non_success_is_unexpected_status() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.respond("/users/5/follow/", 400, r#"{"detail":"You cannot follow yourself."}"#);
        let directory = directory(&client).await;

        match directory.follow(5).await {
            Err(ApplicationError::UnexpectedStatus { status, body }) => {
                assert_eq!(status, 400);
                assert_eq!(body, r#"{"detail":"You cannot follow yourself."}"#);
            }
            other => panic!("expected UnexpectedStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.respond(MY_FRIENDS_PATH, 200, r#"{"results":[]}"#);
        let directory = directory(&client).await;

        assert!(matches!(
            directory.my_friends().await,
            Err(ApplicationError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_once_for_social_calls() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.respond(MY_FRIENDS_PATH, 401, "");
        client.respond(MY_FRIENDS_PATH, 200, "[]");
        client.respond(REFRESH_PATH, 200, r#"{"access":"T1"}"#);
        let directory = directory(&client).await;

        assert!(directory.my_friends().await.unwrap().is_empty());

        let sent = client.requests_to(MY_FRIENDS_PATH);
        assert_eq!(sent[1].headers.get("authorization"), Some("Bearer T1"));
        assert_eq!(client.calls_to(REFRESH_PATH), 1);
    }

    #[tokio::test]
    async fn refresh_failure_surfaces_as_auth_error() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.respond(REFRESH_PATH, 401, "");
        let session = AuthSession::new(
            Arc::clone(&client),
            ApiBase::new(TEST_BASE),
            SessionCredential::Ambient,
        );
        let directory = SocialDirectory::new(Arc::new(session));

        assert!(matches!(
            directory.my_friends().await,
            Err(ApplicationError::Auth(AuthError::RefreshFailed { status: 401, .. }))
        ));
    }
}
