use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::conversation::Session;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";
pub const DEFAULT_USER_ID: &str = "demo-user";
pub const DEFAULT_SESSION_ID: &str = "session-1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub base_url: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Apply `COPILOT_*` environment overrides on top of the file values
    pub fn from_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("COPILOT_BASE_URL") {
            self.base_url = Some(url);
        }
        if let Some(user_id) = get("COPILOT_USER_ID") {
            self.user_id = Some(user_id);
        }
        if let Some(session_id) = get("COPILOT_SESSION_ID") {
            self.session_id = Some(session_id);
        }
        if let Some(secs) = get("COPILOT_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()) {
            self.timeout_secs = Some(secs);
        }
        self
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn user_id(&self) -> &str {
        self.user_id.as_deref().unwrap_or(DEFAULT_USER_ID)
    }

    pub fn session_id(&self) -> &str {
        self.session_id.as_deref().unwrap_or(DEFAULT_SESSION_ID)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS).max(1))
    }

    pub fn session(&self) -> Session {
        Session {
            user_id: self.user_id().to_string(),
            session_id: self.session_id().to_string(),
        }
    }

    /// Persist edited correlation ids, keeping the rest of the file as loaded
    pub fn save_session(path: &Path, session: &Session) -> Result<()> {
        let mut config = Self::load_from(path).unwrap_or_else(|_| Self::new());
        config.user_id = Some(session.user_id.clone());
        config.session_id = Some(session.session_id.clone());
        config.save_to(path)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("copilot").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.base_url(), "http://localhost:8001");
        assert_eq!(config.user_id(), "demo-user");
        assert_eq!(config.session_id(), "session-1");
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            base_url: Some("https://copilot.example/".to_string()),
            user_id: Some("alice".to_string()),
            session_id: None,
            timeout_secs: Some(5),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.base_url(), "https://copilot.example");
        assert_eq!(loaded.session_id(), "session-1");
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "user_id": "bob" }"#).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.user_id(), "bob");
        assert_eq!(loaded.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("COPILOT_BASE_URL", "http://gateway:9000"),
            ("COPILOT_SESSION_ID", "session-7"),
            ("COPILOT_USER_ID", "  "),
            ("COPILOT_TIMEOUT_SECS", "abc"),
        ]);
        let config = Config {
            user_id: Some("from-file".to_string()),
            timeout_secs: Some(10),
            ..Config::new()
        }
        .with_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.base_url(), "http://gateway:9000");
        assert_eq!(config.session_id(), "session-7");
        assert_eq!(config.user_id(), "from-file");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_save_session_keeps_other_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        Config {
            base_url: Some("http://gateway:9000".to_string()),
            ..Config::new()
        }
        .save_to(&path)
        .unwrap();

        let session = Session {
            user_id: "carol".to_string(),
            session_id: "session-9".to_string(),
        };
        Config::save_session(&path, &session).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.base_url(), "http://gateway:9000");
        assert_eq!(loaded.session(), session);
    }

    #[test]
    fn test_session_from_config() {
        let config = Config {
            session_id: Some("s-42".to_string()),
            ..Config::new()
        };
        let session = config.session();
        assert_eq!(session.user_id, "demo-user");
        assert_eq!(session.session_id, "s-42");
    }
}
