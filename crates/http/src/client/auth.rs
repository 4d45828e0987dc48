//! Authentication API client methods

use super::persistence::StoredSession;
use super::session::LogoutReason;
use super::{ApiRequest, ClientError, LOGIN_PATH, LOGOUT_PATH, PongdangClient, SIGNUP_PATH};
use crate::types::{LoginRequest, LoginResponse, SessionTokenRequest, SignupRequest, TokenPair};
use chrono::Utc;
use pongdang_core::UserProfile;
use tracing::info;

impl PongdangClient {
    /// Log in and store the resulting session.
    ///
    /// The access-token lifetime comes from the server configuration, which
    /// is fetched first if this client has not loaded it yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is unavailable, the backend
    /// rejects the credentials, or the session cannot be stored
    pub async fn login(&self, user_id: &str, password: &str) -> Result<UserProfile, ClientError> {
        let config = self.runtime_config().await?;

        let request = ApiRequest::post(LOGIN_PATH).json(&LoginRequest {
            user_id: user_id.to_string(),
            password: password.to_string(),
        })?;
        let response: LoginResponse = self.execute(&request).await?;

        self.session
            .set_session(
                response.profile.clone(),
                response.token.access_token,
                response.token.refresh_token,
                Some(config.access_token_ttl()),
            )
            .await?;
        Ok(response.profile)
    }

    /// Register a new account; it stays in the waiting state until approved
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the registration
    pub async fn signup(&self, signup: &SignupRequest) -> Result<(), ClientError> {
        let request = ApiRequest::post(SIGNUP_PATH).json(signup)?;
        self.execute_empty(&request).await
    }

    /// Log out: notify the backend, wipe local state, tell subscribers.
    ///
    /// Returns `false` if another logout was already running. The logout gate
    /// stays closed until [`SessionManager::settle_logout`](super::session::SessionManager::settle_logout)
    /// is awaited.
    ///
    /// # Errors
    ///
    /// Returns an error only if the local session could not be wiped; a
    /// failed server notification is logged and ignored
    pub async fn logout(&self) -> Result<bool, ClientError> {
        let performed = self
            .session
            .clear_session(LogoutReason::UserInitiated, |session| async move {
                self.notify_logout(&session).await
            })
            .await?;
        if performed {
            info!("Logged out");
        }
        Ok(performed)
    }

    /// Tell the backend a session is ending. Goes straight to the wire: a
    /// logout never triggers a reissue.
    pub(crate) async fn notify_logout(&self, session: &StoredSession) -> Result<(), ClientError> {
        let request = ApiRequest::post(LOGOUT_PATH).json(&SessionTokenRequest {
            user_id: session.profile.user_id.clone(),
            token: TokenPair {
                access_token: session.access_token.clone(),
                refresh_token: session.refresh_token.clone(),
            },
        })?;

        let response = self
            .transmit(&request, session.live_access_token(Utc::now()))
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            Err(ClientError::from_status(status, message))
        }
    }
}
