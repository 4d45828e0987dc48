//! Server configuration client methods

use super::{ApiRequest, ClientError, PongdangClient};
use pongdang_core::{RoleOption, RuntimeConfig, SystemConfigEntry};

const CONFIG_PATH: &str = "/config/getConfig";

impl PongdangClient {
    /// Server configuration, fetched on first use and cached for the life of
    /// this client (and its clones). Nothing is persisted and there are no
    /// fallback defaults: a failed fetch leaves the cache empty.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigUnavailable`] if the fetch fails, or
    /// [`ClientError::CancelledByLogout`] while a logout is under way
    pub async fn runtime_config(&self) -> Result<RuntimeConfig, ClientError> {
        self.runtime_config
            .get_or_try_init(|| self.fetch_runtime_config())
            .await
            .cloned()
    }

    /// Straight to the wire and without a token: this also runs inside a
    /// reissue, which must not start another one.
    async fn fetch_runtime_config(&self) -> Result<RuntimeConfig, ClientError> {
        let response = self
            .transmit(&ApiRequest::get(CONFIG_PATH), None)
            .await
            .map_err(|e| match e {
                ClientError::CancelledByLogout => e,
                other => ClientError::ConfigUnavailable(other.to_string()),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::ConfigUnavailable(format!(
                "{CONFIG_PATH} answered {status}"
            )));
        }
        response
            .json()
            .await
            .map_err(|e| ClientError::ConfigUnavailable(e.to_string()))
    }

    /// Entries of one system configuration group, e.g. `role`
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails
    pub async fn system_config(&self, kind: &str) -> Result<Vec<SystemConfigEntry>, ClientError> {
        self.execute(&ApiRequest::get(format!("/config/get/systemConfig/{kind}")))
            .await
    }

    /// Role choices offered by the backend
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails
    pub async fn role_options(&self) -> Result<Vec<RoleOption>, ClientError> {
        let entries = self.system_config("role").await?;
        Ok(entries.iter().map(RoleOption::from).collect())
    }
}
