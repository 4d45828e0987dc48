//! Pongdang HTTP client
//!
//! Every call goes through [`PongdangClient::send`], which attaches the
//! current access token, refuses requests while a logout is running and, on
//! an authorization failure, reissues the access token once and replays the
//! request.

pub mod auth;
pub mod config;
pub mod error;
pub mod menus;
pub mod persistence;
pub mod reissue;
pub mod session;
pub mod users;

use error::{ClientError, ReissueError};
use pongdang_core::{ClientSettings, RuntimeConfig};
use reissue::AuthFailurePolicy;
use reqwest::{Client, ClientBuilder, Method, header};
use serde::Serialize;
use session::{LogoutReason, SessionManager};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

pub const LOGIN_PATH: &str = "/users/login";
pub const SIGNUP_PATH: &str = "/users/signup";
pub const LOGOUT_PATH: &str = "/users/logout";
pub const REISSUE_PATH: &str = "/users/reissue";

/// Description of a backend call, kept so the call can be rebuilt for a replay
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialized
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    fn is_logout(&self) -> bool {
        self.path == LOGOUT_PATH
    }

    fn is_reissue(&self) -> bool {
        self.path == REISSUE_PATH
    }

    /// Login and signup have no session to refresh
    fn is_credential_exchange(&self) -> bool {
        self.path == LOGIN_PATH || self.path == SIGNUP_PATH
    }
}

/// Per-call interceptor state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// The call already went through one reissue and replay
    pub retried: bool,
}

/// Pongdang API client
#[derive(Clone)]
pub struct PongdangClient {
    client: Client,
    base_url: Arc<str>,
    session: Arc<SessionManager>,
    policy: Arc<AuthFailurePolicy>,
    runtime_config: Arc<OnceCell<RuntimeConfig>>,
}

impl PongdangClient {
    /// Create a new client builder
    pub fn builder() -> PongdangClientBuilder {
        PongdangClientBuilder::default()
    }

    /// Build a client from loaded settings around an existing session manager
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed
    pub fn from_settings(
        settings: &ClientSettings,
        session: Arc<SessionManager>,
    ) -> Result<Self, ClientError> {
        let mut builder = Self::builder()
            .base_url(&settings.base_url)
            .session(session)
            .auth_failure_policy(AuthFailurePolicy::from(&settings.reissue));
        if let Some(timeout) = settings.timeout() {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub const fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Send a request through the interceptors
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::CancelledByLogout`] if a logout is under way,
    /// or the backend/network error of the (possibly replayed) call
    pub async fn send(&self, request: &ApiRequest) -> Result<reqwest::Response, ClientError> {
        self.send_with_context(request, RequestContext::default()).await
    }

    /// Send a request and decode its JSON body
    ///
    /// # Errors
    ///
    /// See [`Self::send`]; also fails if the body does not decode into `T`
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// Send a request whose response body is irrelevant
    ///
    /// # Errors
    ///
    /// See [`Self::send`]
    pub async fn execute_empty(&self, request: &ApiRequest) -> Result<(), ClientError> {
        self.send(request).await.map(drop)
    }

    /// Send with an explicit context. A context with `retried` set never
    /// triggers a reissue.
    ///
    /// # Errors
    ///
    /// See [`Self::send`]
    pub async fn send_with_context(
        &self,
        request: &ApiRequest,
        mut context: RequestContext,
    ) -> Result<reqwest::Response, ClientError> {
        loop {
            let token = self.session.access_token().await;
            let response = self.transmit(request, token.as_deref()).await?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            if !self.policy.requires_reissue(status, &message) {
                return Err(ClientError::from_status(status, message));
            }
            let error = ClientError::from_status(status, message);

            if self.session.is_logging_out() {
                return Err(ClientError::CancelledByLogout);
            }
            if request.is_reissue() {
                warn!("Reissue endpoint rejected the session, logging out");
                self.force_logout().await;
                return Err(error);
            }
            if context.retried || request.is_credential_exchange() {
                return Err(error);
            }

            context.retried = true;
            if let Err(cause) = self.reissue(token.as_deref()).await {
                if matches!(cause, ReissueError::Cancelled) || self.session.is_logging_out() {
                    debug!(path = %request.path, "Reissue abandoned, logout under way");
                    return Err(ClientError::CancelledByLogout);
                }
                warn!(path = %request.path, "Token reissue failed: {cause}");
                self.force_logout().await;
                return Err(error);
            }
            debug!(path = %request.path, "Replaying after reissue");
        }
    }

    /// Put a request on the wire. This is the only place that touches the
    /// network, and it refuses everything but the logout call while a
    /// logout is running.
    async fn transmit(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ClientError> {
        if self.session.is_logging_out() && !request.is_logout() {
            debug!(path = %request.path, "Refusing request during logout");
            return Err(ClientError::CancelledByLogout);
        }

        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method.clone(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        debug!(method = %request.method, path = %request.path, "Dispatching");
        Ok(builder.send().await?)
    }

    async fn force_logout(&self) {
        if let Err(e) = self
            .session
            .clear_session(LogoutReason::SessionExpired, |session| async move {
                self.notify_logout(&session).await
            })
            .await
        {
            warn!("Forced logout could not clear local session: {e}");
        }
    }
}

impl std::fmt::Debug for PongdangClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PongdangClient")
            .field("base_url", &self.base_url)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Builder for PongdangClient
#[derive(Default)]
pub struct PongdangClientBuilder {
    base_url: Option<String>,
    session: Option<Arc<SessionManager>>,
    policy: Option<AuthFailurePolicy>,
    timeout: Option<Duration>,
}

impl PongdangClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the session manager shared with the rest of the application
    pub fn session(mut self, session: Arc<SessionManager>) -> Self {
        self.session = Some(session);
        self
    }

    /// Set the backend's "please reissue" contract
    pub fn auth_failure_policy(mut self, policy: AuthFailurePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Set the request timeout
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or session is missing, or the HTTP
    /// client cannot be constructed
    pub fn build(self) -> Result<PongdangClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;
        let session = self
            .session
            .ok_or_else(|| ClientError::Configuration("session manager is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/');

        let mut client_builder = ClientBuilder::new();
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }
        client_builder =
            client_builder.user_agent(concat!("pongdang-client/", env!("CARGO_PKG_VERSION")));

        Ok(PongdangClient {
            client: client_builder.build()?,
            base_url: Arc::from(base_url),
            session,
            policy: Arc::new(self.policy.unwrap_or_default()),
            runtime_config: Arc::new(OnceCell::new()),
        })
    }
}
