//! CLI configuration utilities

use anyhow::{Context, Result};
use pongdang_core::ClientSettings;
use pongdang_http::{FileSessionStore, PongdangClient, SessionManager};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

const SETTINGS_FILE: &str = "config.toml";

/// Load client settings.
///
/// An explicit `config_file` must exist. Otherwise `<data_dir>/config.toml`
/// is used when present. `data_dir` from the command line wins over the
/// settings file and environment.
pub fn load_settings(config_file: Option<&Path>, data_dir: Option<PathBuf>) -> Result<ClientSettings> {
    let default_file = data_dir
        .clone()
        .unwrap_or_else(|| ClientSettings::default().data_dir)
        .join(SETTINGS_FILE);

    let file = match config_file {
        Some(path) => Some(path.to_path_buf()),
        None => default_file.exists().then_some(default_file),
    };

    let mut settings = ClientSettings::load(file.as_deref())
        .with_context(|| format!("loading settings from {}", describe(file.as_deref())))?;
    if let Some(dir) = data_dir {
        settings.data_dir = dir;
    }
    Ok(settings)
}

/// Client backed by the session file under the data directory
pub fn build_client(settings: &ClientSettings) -> Result<PongdangClient> {
    let store = FileSessionStore::new(settings.session_file());
    info!(path = %store.path().display(), "Using session file");
    let session = Arc::new(SessionManager::new(
        Arc::new(store),
        settings.logout_grace(),
    ));
    Ok(PongdangClient::from_settings(settings, session)?)
}

fn describe(file: Option<&Path>) -> String {
    file.map_or_else(
        || "defaults and environment".to_string(),
        |path| path.display().to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_up_settings_file_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            "base_url = \"https://club.example.com/api/\"\n",
        )
        .unwrap();

        let settings = load_settings(None, Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(settings.base_url, "https://club.example.com/api");
        assert_eq!(settings.data_dir, dir.path());
        assert_eq!(settings.session_file(), dir.path().join("session.json"));
    }

    #[test]
    fn explicit_settings_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_settings(Some(&missing), Some(dir.path().to_path_buf())).is_err());
    }
}
