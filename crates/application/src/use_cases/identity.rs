//! Resolve identity use case.
//!
//! Decides whether the user is signed in by asking the API, and keeps the
//! persisted username in step with the answer.

use std::sync::Arc;

use tracing::{info, warn};
use verdant_domain::{CurrentUser, LoginCredentials, StoredIdentity};

use crate::auth::{AuthError, AuthSession};
use crate::error::ApplicationResult;
use crate::ports::{Clock, HttpClient, IdentityRepository};

/// Outcome of resolving the identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityState {
    /// The session is valid and belongs to this user.
    SignedIn(CurrentUser),
    /// The session is gone; the user has to sign in again.
    SignedOut,
}

impl IdentityState {
    /// Returns the username when signed in.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::SignedIn(user) => Some(&user.username),
            Self::SignedOut => None,
        }
    }
}

/// Use case for resolving and persisting the signed-in identity.
pub struct ResolveIdentity<C, R, K> {
    session: Arc<AuthSession<C>>,
    repository: R,
    clock: K,
}

impl<C, R, K> ResolveIdentity<C, R, K>
where
    C: HttpClient + 'static,
    R: IdentityRepository,
    K: Clock,
{
    /// Creates a new `ResolveIdentity` use case.
    #[must_use]
    pub const fn new(session: Arc<AuthSession<C>>, repository: R, clock: K) -> Self {
        Self {
            session,
            repository,
            clock,
        }
    }

    /// Fetches the current user and updates the stored identity.
    ///
    /// A rejected refresh session, or a current-user request that is still
    /// unauthorized after the retry, means the user is signed out: the
    /// token and the stored identity are cleared and `SignedOut` is
    /// returned instead of an error.
    ///
    /// # Errors
    /// - Transport failures and unexpected API answers
    /// - Failures writing the stored identity
    pub async fn execute(&self) -> ApplicationResult<IdentityState> {
        match self.session.fetch_current_user().await {
            Ok(user) => {
                let identity = StoredIdentity::for_user(&user, self.clock.now());
                self.repository.save(&identity).await?;
                info!(username = %user.username, "identity resolved");
                Ok(IdentityState::SignedIn(user))
            }
            Err(e) if means_signed_out(&e) => {
                warn!(error = %e, "session rejected, treating user as signed out");
                self.forget().await?;
                Ok(IdentityState::SignedOut)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Signs in with email and password, then resolves and stores the
    /// identity.
    ///
    /// # Errors
    /// - [`AuthError::LoginFailed`] for rejected credentials
    /// - Everything [`execute`](Self::execute) returns
    pub async fn sign_in(&self, login: &LoginCredentials) -> ApplicationResult<IdentityState> {
        self.session.sign_in(login).await?;
        self.execute().await
    }

    /// Ends the session on the server and forgets the access token and the
    /// stored identity.
    ///
    /// Local state is cleared even when the server cannot be reached or
    /// refuses; the result then is `false`.
    ///
    /// # Errors
    /// Returns an error if the stored identity cannot be removed.
    pub async fn sign_out(&self) -> ApplicationResult<bool> {
        let revoked = match self.session.sign_out().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "server sign-out failed, clearing local session only");
                false
            }
        };
        self.repository.clear().await?;
        Ok(revoked)
    }

    /// Returns the stored identity without contacting the API.
    ///
    /// # Errors
    /// Returns an error if the stored identity cannot be read.
    pub async fn cached(&self) -> ApplicationResult<Option<StoredIdentity>> {
        Ok(self.repository.load().await?)
    }

    async fn forget(&self) -> ApplicationResult<()> {
        self.session.token_store().clear().await;
        self.repository.clear().await?;
        Ok(())
    }
}

const fn means_signed_out(error: &AuthError) -> bool {
    error.is_session_rejected() || matches!(error, AuthError::MeFetchFailed { status: 401, .. })
}
