//! Client settings: defaults, optional settings file, `PONGDANG_*` environment

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix, e.g. `PONGDANG_BASE_URL`, `PONGDANG_REISSUE__STATUSES`
pub const ENV_PREFIX: &str = "PONGDANG";

/// Settings for the authenticated API client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Backend origin, without trailing slash
    pub base_url: String,

    /// Per-request timeout in seconds (0 disables the timeout)
    pub timeout_secs: u64,

    /// How long the logout-in-progress gate stays closed after a logout
    pub logout_grace_ms: u64,

    /// What the backend answers when an access token must be reissued
    pub reissue: ReissueSettings,

    /// Where the CLI keeps the session file and logs
    pub data_dir: PathBuf,
}

/// Backend contract for "access token invalid, please reissue"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReissueSettings {
    /// Status codes that trigger a reissue
    pub statuses: Vec<u16>,

    /// If set, the error body must also contain this text
    pub body_marker: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 30,
            logout_grace_ms: 500,
            reissue: ReissueSettings::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for ReissueSettings {
    fn default() -> Self {
        Self {
            statuses: vec![403],
            body_marker: None,
        }
    }
}

impl ClientSettings {
    /// Load settings from defaults, an optional file and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a value cannot be parsed,
    /// or the resulting settings are invalid
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("base_url", defaults.base_url)?
            .set_default("timeout_secs", defaults.timeout_secs)?
            .set_default("logout_grace_ms", defaults.logout_grace_ms)?
            .set_default(
                "reissue.statuses",
                defaults
                    .reissue
                    .statuses
                    .iter()
                    .map(|s| i64::from(*s))
                    .collect::<Vec<_>>(),
            )?
            .set_default("data_dir", defaults.data_dir.to_string_lossy().to_string())?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("reissue.statuses")
                    .try_parsing(true),
            )
            .build()?;

        let mut loaded: Self = settings.try_deserialize()?;
        loaded.base_url = loaded.base_url.trim_end_matches('/').to_string();
        loaded.validate()?;
        Ok(loaded)
    }

    /// Check invariants the client relies on
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] describing the first problem found
    pub fn validate(&self) -> CoreResult<()> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| CoreError::invalid_config(format!("base_url '{}': {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CoreError::invalid_config(format!(
                "base_url must be http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.reissue.statuses.is_empty() {
            return Err(CoreError::invalid_config(
                "reissue.statuses must name at least one status code",
            ));
        }
        if let Some(status) = self
            .reissue
            .statuses
            .iter()
            .find(|s| !(400..500).contains(*s))
        {
            return Err(CoreError::invalid_config(format!(
                "reissue.statuses must be client errors (4xx), got {status}"
            )));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub const fn logout_grace(&self) -> Duration {
        Duration::from_millis(self.logout_grace_ms)
    }

    pub fn session_file(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pongdang")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let settings = ClientSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.reissue.statuses, vec![403]);
        assert_eq!(settings.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
base_url = "https://api.pongdang.example/"
timeout_secs = 0

[reissue]
statuses = [401, 403]
body_marker = "Invalid token"
"#
        )
        .unwrap();

        let settings = ClientSettings::load(Some(file.path())).unwrap();
        assert_eq!(settings.base_url, "https://api.pongdang.example");
        assert_eq!(settings.timeout(), None);
        assert_eq!(settings.reissue.statuses, vec![401, 403]);
        assert_eq!(settings.reissue.body_marker.as_deref(), Some("Invalid token"));
        assert_eq!(settings.logout_grace_ms, 500);
    }

    #[test]
    fn rejects_non_client_error_status() {
        let settings = ClientSettings {
            reissue: ReissueSettings {
                statuses: vec![500],
                body_marker: None,
            },
            ..ClientSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(CoreError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn rejects_bad_base_url() {
        let settings = ClientSettings {
            base_url: "ftp://example.com".into(),
            ..ClientSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
