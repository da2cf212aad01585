use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::NotifierError;

/// Shortest allowed interval between Gmail queries
pub const MIN_CHECK_INTERVAL_SECS: u64 = 10;

/// Gmail caps `messages.list` pages at this size
pub const MAX_PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Google OAuth client secret downloaded from the Cloud Console
    #[serde(default = "default_credentials_path")]
    pub gmail_credentials_path: PathBuf,

    /// Where the OAuth token cache is written after the consent flow
    #[serde(default = "default_token_path")]
    pub gmail_token_path: PathBuf,

    /// How often to query the inbox (seconds)
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Page size of the unread query. Bounds the reported new-mail count.
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    #[serde(default = "default_reachy_host")]
    pub reachy_host: String,

    #[serde(default = "default_reachy_port")]
    pub reachy_port: u16,

    /// Text-to-speech endpoint; speech is only logged when unset
    #[serde(default)]
    pub tts_url: Option<String>,

    /// File holding the last seen message id across restarts
    #[serde(default)]
    pub state_path: Option<PathBuf>,

    /// Log gestures instead of moving the robot
    #[serde(default)]
    pub demo_mode: bool,

    /// Upper bound for any single collaborator call (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("credentials.json")
}

fn default_token_path() -> PathBuf {
    PathBuf::from("token.json")
}

fn default_check_interval() -> u64 {
    60
}

fn default_max_results() -> u32 {
    20
}

fn default_reachy_host() -> String {
    "localhost".to_string()
}

fn default_reachy_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            gmail_credentials_path: default_credentials_path(),
            gmail_token_path: default_token_path(),
            check_interval_secs: default_check_interval(),
            max_results: default_max_results(),
            reachy_host: default_reachy_host(),
            reachy_port: default_reachy_port(),
            tts_url: None,
            state_path: None,
            demo_mode: false,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl NotifierConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            gmail_credentials_path: non_empty("GMAIL_CREDENTIALS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.gmail_credentials_path),
            gmail_token_path: non_empty("GMAIL_TOKEN_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.gmail_token_path),
            check_interval_secs: match non_empty("CHECK_INTERVAL") {
                Some(v) => v
                    .trim()
                    .parse()
                    .context("CHECK_INTERVAL must be a valid number of seconds")?,
                None => defaults.check_interval_secs,
            },
            max_results: match non_empty("MAX_RESULTS") {
                Some(v) => v
                    .trim()
                    .parse()
                    .context("MAX_RESULTS must be a valid number")?,
                None => defaults.max_results,
            },
            reachy_host: non_empty("REACHY_IP").unwrap_or(defaults.reachy_host),
            reachy_port: match non_empty("REACHY_PORT") {
                Some(v) => v.trim().parse().context("REACHY_PORT must be a valid port")?,
                None => defaults.reachy_port,
            },
            tts_url: non_empty("TTS_URL"),
            state_path: non_empty("STATE_PATH").map(PathBuf::from),
            demo_mode: non_empty("DEMO_MODE")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.demo_mode),
            request_timeout_secs: match non_empty("REQUEST_TIMEOUT") {
                Some(v) => v
                    .trim()
                    .parse()
                    .context("REQUEST_TIMEOUT must be a valid number of seconds")?,
                None => defaults.request_timeout_secs,
            },
        })
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: NotifierConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Reject settings that would make the polling loop misbehave.
    ///
    /// Does not touch the filesystem; see [`NotifierConfig::require_credentials`].
    pub fn validate(&self) -> Result<(), NotifierError> {
        if self.check_interval_secs < MIN_CHECK_INTERVAL_SECS {
            return Err(NotifierError::config(format!(
                "check interval must be at least {} seconds to avoid rate limiting, got {}",
                MIN_CHECK_INTERVAL_SECS, self.check_interval_secs
            )));
        }

        if self.max_results == 0 || self.max_results > MAX_PAGE_SIZE {
            return Err(NotifierError::config(format!(
                "max results must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.max_results
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(NotifierError::config("request timeout must be positive"));
        }

        Ok(())
    }

    pub fn require_credentials(&self) -> Result<(), NotifierError> {
        if !self.gmail_credentials_path.exists() {
            return Err(NotifierError::config(format!(
                "Gmail credentials file not found at {}. Download it from the Google Cloud Console.",
                self.gmail_credentials_path.display()
            )));
        }
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reachy_base_url(&self) -> String {
        format!("http://{}:{}", self.reachy_host, self.reachy_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = NotifierConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, NotifierConfig::default());
        assert_eq!(config.check_interval(), Duration::from_secs(60));
        assert_eq!(config.reachy_base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_env_values_override_defaults() {
        let config = NotifierConfig::from_lookup(lookup_from(&[
            ("CHECK_INTERVAL", "30"),
            ("MAX_RESULTS", "50"),
            ("REACHY_IP", "reachy.local"),
            ("REACHY_PORT", "50055"),
            ("TTS_URL", "http://localhost:5002/speak"),
            ("STATE_PATH", "/var/lib/notifier/state.json"),
            ("DEMO_MODE", "true"),
        ]))
        .unwrap();

        assert_eq!(config.check_interval_secs, 30);
        assert_eq!(config.max_results, 50);
        assert_eq!(config.reachy_base_url(), "http://reachy.local:50055");
        assert_eq!(config.tts_url.as_deref(), Some("http://localhost:5002/speak"));
        assert_eq!(
            config.state_path,
            Some(PathBuf::from("/var/lib/notifier/state.json"))
        );
        assert!(config.demo_mode);
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config =
            NotifierConfig::from_lookup(lookup_from(&[("TTS_URL", "  "), ("CHECK_INTERVAL", "")]))
                .unwrap();
        assert_eq!(config.tts_url, None);
        assert_eq!(config.check_interval_secs, 60);
    }

    #[test]
    fn test_unparseable_interval_is_an_error() {
        let result = NotifierConfig::from_lookup(lookup_from(&[("CHECK_INTERVAL", "soon")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_interval_below_minimum_is_rejected() {
        let config = NotifierConfig {
            check_interval_secs: 5,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at least 10 seconds"));
    }

    #[test]
    fn test_page_size_bounds() {
        let zero = NotifierConfig {
            max_results: 0,
            ..Default::default()
        };
        let huge = NotifierConfig {
            max_results: 501,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
        assert!(huge.validate().is_err());
        assert!(NotifierConfig::default().validate().is_ok());
    }

    #[test]
    fn test_missing_credentials_file() {
        let config = NotifierConfig {
            gmail_credentials_path: PathBuf::from("/nonexistent/credentials.json"),
            ..Default::default()
        };
        assert!(matches!(
            config.require_credentials(),
            Err(NotifierError::Config(_))
        ));
    }

    #[test]
    fn test_load_toml_with_partial_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notifier.toml");
        std::fs::write(
            &path,
            r#"
check_interval_secs = 120
reachy_host = "192.168.1.42"
demo_mode = true
"#,
        )
        .unwrap();

        let config = NotifierConfig::load(&path).unwrap();
        assert_eq!(config.check_interval_secs, 120);
        assert_eq!(config.reachy_host, "192.168.1.42");
        assert!(config.demo_mode);
        assert_eq!(config.max_results, 20);
        assert_eq!(config.gmail_token_path, PathBuf::from("token.json"));
    }
}
