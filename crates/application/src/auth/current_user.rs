//! Current-user fetcher.

use serde::Deserialize;
use verdant_domain::CurrentUser;

use super::endpoint::ME_PATH;
use super::error::AuthError;
use super::session::{ApiRequest, AuthSession};
use super::ERROR_SNIPPET_CHARS;
use crate::ports::HttpClient;

/// Body of `/api/auth/me/`; every field is optional so that shape
/// problems surface as [`AuthError::MeFetchEmpty`] instead of a decoder
/// error.
#[derive(Debug, Default, Deserialize)]
struct MeResponse {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    fullname: Option<String>,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default)]
    avatar_photo: Option<String>,
}

impl<C: HttpClient + 'static> AuthSession<C> {
    /// Retrieves the identity of the authenticated user.
    ///
    /// The result is never cached; every call hits the API.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MeFetchFailed`] on a non-2xx response
    /// - [`AuthError::MeFetchEmpty`] if the response has no username
    /// - any error of [`AuthSession::fetch`]
    pub async fn fetch_current_user(&self) -> Result<CurrentUser, AuthError> {
        let response = self.fetch(ApiRequest::get(ME_PATH)).await?;

        if !response.is_success() {
            return Err(AuthError::MeFetchFailed {
                status: response.status,
                body: response.body_snippet(ERROR_SNIPPET_CHARS),
            });
        }

        let body: MeResponse = response.json().map_err(|_| AuthError::MeFetchEmpty)?;
        let username = body.username.ok_or(AuthError::MeFetchEmpty)?;
        let mut user = CurrentUser::new(username)
            .map_err(|_| AuthError::MeFetchEmpty)?
            .with_email(body.email);
        user.id = body.id;
        user.fullname = body.fullname;
        user.bio = body.bio;
        user.avatar_photo = body.avatar_photo;
        Ok(user)
    }
}
