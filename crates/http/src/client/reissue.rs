//! Access-token reissue
//!
//! Concurrent callers that hit an authorization failure with the same stale
//! token share one round trip: the first one through the session's reissue
//! guard talks to the backend, the rest find a different token in the store
//! when they get the guard and just replay.

use super::error::{ClientError, ReissueError};
use super::{ApiRequest, PongdangClient, REISSUE_PATH};
use crate::types::{ReissueResponse, SessionTokenRequest, TokenPair};
use pongdang_core::ReissueSettings;
use reqwest::StatusCode;
use tracing::{debug, info};

/// Which responses mean "the access token is no longer accepted"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFailurePolicy {
    statuses: Vec<StatusCode>,
    body_marker: Option<String>,
}

impl AuthFailurePolicy {
    pub fn new(statuses: impl IntoIterator<Item = StatusCode>, body_marker: Option<String>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
            body_marker,
        }
    }

    pub fn requires_reissue(&self, status: StatusCode, body: &str) -> bool {
        self.statuses.contains(&status)
            && self
                .body_marker
                .as_deref()
                .is_none_or(|marker| body.contains(marker))
    }
}

impl Default for AuthFailurePolicy {
    fn default() -> Self {
        Self::from(&ReissueSettings::default())
    }
}

impl From<&ReissueSettings> for AuthFailurePolicy {
    fn from(settings: &ReissueSettings) -> Self {
        Self::new(
            settings
                .statuses
                .iter()
                .filter_map(|code| StatusCode::from_u16(*code).ok()),
            settings.body_marker.clone(),
        )
    }
}

impl PongdangClient {
    /// Make sure the stored access token is newer than `stale`, reissuing it
    /// if nobody else has. The new token's lifetime comes from the server
    /// configuration, fetched here if this client has not loaded it yet.
    pub(crate) async fn reissue(&self, stale: Option<&str>) -> Result<(), ReissueError> {
        let _guard = self.session.reissue_guard().await;

        if let Some(current) = self.session.access_token().await {
            if Some(current.as_str()) != stale {
                debug!("Access token already reissued by a concurrent request");
                return Ok(());
            }
        }

        let session = self
            .session
            .current_session()
            .await?
            .ok_or(ReissueError::NoSession)?;
        if session.refresh_token.is_empty() {
            return Err(ReissueError::MissingRefreshToken);
        }

        let ttl = self
            .runtime_config()
            .await
            .map_err(|e| match e {
                ClientError::CancelledByLogout => ReissueError::Cancelled,
                other => ReissueError::Config(other.to_string()),
            })?
            .access_token_ttl();

        let body = SessionTokenRequest {
            user_id: session.profile.user_id,
            token: TokenPair {
                access_token: session.access_token,
                refresh_token: session.refresh_token,
            },
        };
        let request = ApiRequest::post(REISSUE_PATH)
            .json(&body)
            .map_err(|e| ReissueError::Encode(e.to_string()))?;

        let response = self
            .transmit(&request, None)
            .await
            .map_err(|e| match e {
                ClientError::Request(e) => ReissueError::Request(e),
                _ => ReissueError::Cancelled,
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            return Err(ReissueError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        let token = serde_json::from_str::<ReissueResponse>(&text)
            .map_err(|e| ReissueError::MalformedResponse(e.to_string()))?
            .token
            .unwrap_or_default();
        let access_token = token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ReissueError::MalformedResponse("missing token.accessToken".into()))?;

        self.session
            .update_access_token(access_token, Some(ttl), token.refresh_token)
            .await?;
        info!("Access token reissued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_contract_is_forbidden_without_marker() {
        let policy = AuthFailurePolicy::default();
        assert!(policy.requires_reissue(StatusCode::FORBIDDEN, ""));
        assert!(!policy.requires_reissue(StatusCode::UNAUTHORIZED, ""));
        assert!(!policy.requires_reissue(StatusCode::INTERNAL_SERVER_ERROR, ""));
    }

    #[test]
    fn body_marker_must_be_present() {
        let policy = AuthFailurePolicy::new(
            [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN],
            Some("Invalid token".into()),
        );
        assert!(policy.requires_reissue(StatusCode::UNAUTHORIZED, "error: Invalid token"));
        assert!(!policy.requires_reissue(StatusCode::FORBIDDEN, "role too low"));
    }

    #[test]
    fn built_from_settings() {
        let policy = AuthFailurePolicy::from(&ReissueSettings {
            statuses: vec![401],
            body_marker: None,
        });
        assert!(policy.requires_reissue(StatusCode::UNAUTHORIZED, "anything"));
        assert!(!policy.requires_reissue(StatusCode::FORBIDDEN, "anything"));
    }
}
