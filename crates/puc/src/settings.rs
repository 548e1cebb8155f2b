use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use puc_core::{DEFAULT_BRANCH, DEFAULT_CHECK_PERIOD_HOURS, DEFAULT_THROTTLED_CHECK_PERIOD_HOURS};

use crate::error::AppError;
use crate::service_kind::ServiceKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Authentication {
    /// Personal access token (GitHub, GitLab, GiTea).
    Token(String),
    /// OAuth consumer credentials (BitBucket).
    OAuth {
        consumer_key: String,
        consumer_secret: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerSettings {
    /// Repository URL or JSON metadata URL.
    #[serde(default)]
    pub metadata_url: String,

    /// Plugin main file, or any path inside an installed theme.
    #[serde(default)]
    pub artifact_path: PathBuf,

    #[serde(default)]
    pub slug: Option<String>,

    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default = "default_check_period")]
    pub check_period_hours: u64,

    #[serde(default)]
    pub throttle_redundant_checks: bool,

    #[serde(default = "default_throttled_check_period")]
    pub throttled_check_period_hours: u64,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default)]
    pub authentication: Option<Authentication>,

    #[serde(default)]
    pub plugin_dirs: Vec<PathBuf>,

    #[serde(default)]
    pub theme_root: Option<PathBuf>,

    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,

    /// Forces a host type instead of guessing it from `metadata_url`.
    #[serde(default)]
    pub service: Option<ServiceKind>,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_check_period() -> u64 {
    DEFAULT_CHECK_PERIOD_HOURS
}

fn default_throttled_check_period() -> u64 {
    DEFAULT_THROTTLED_CHECK_PERIOD_HOURS
}

fn default_http_timeout() -> u64 {
    10
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for CheckerSettings {
    fn default() -> Self {
        Self {
            metadata_url: String::new(),
            artifact_path: PathBuf::new(),
            slug: None,
            branch: default_branch(),
            check_period_hours: default_check_period(),
            throttle_redundant_checks: false,
            throttled_check_period_hours: default_throttled_check_period(),
            http_timeout_secs: default_http_timeout(),
            authentication: None,
            plugin_dirs: Vec::new(),
            theme_root: None,
            state_dir: None,
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
            service: None,
        }
    }
}

impl CheckerSettings {
    /// Load settings from `path`. A missing or corrupt file yields defaults.
    pub fn load(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|error| {
            log::warn!("Ignoring unreadable settings {}: {error}", path.display());
            Self::default()
        })
    }

    /// # Errors
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| AppError::settings(path, e))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Fail early on settings without which no check can run.
    ///
    /// # Errors
    /// Returns [`AppError::MissingSetting`] naming the first empty key.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.metadata_url.trim().is_empty() {
            return Err(AppError::MissingSetting("metadata_url"));
        }
        if self.artifact_path.as_os_str().is_empty() {
            return Err(AppError::MissingSetting("artifact_path"));
        }
        Ok(())
    }

    pub fn access_token(&self) -> Option<String> {
        match &self.authentication {
            Some(Authentication::Token(token)) => Some(token.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults_match_expected_periods() {
        let settings = CheckerSettings::default();

        assert_eq!(settings.branch, "master");
        assert_eq!(settings.check_period_hours, 12);
        assert_eq!(settings.throttled_check_period_hours, 72);
        assert!(!settings.throttle_redundant_checks);
        assert_eq!(settings.http_timeout_secs, 10);
        assert_eq!(settings.max_log_size_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let settings: CheckerSettings = serde_json::from_value(json!({
            "metadata_url": "https://github.com/acme/widget",
            "artifact_path": "/srv/wp-content/plugins/widget/widget.php",
            "service": "github"
        }))
        .expect("settings JSON should deserialize");

        assert_eq!(settings.branch, "master");
        assert_eq!(settings.check_period_hours, 12);
        assert_eq!(settings.service, Some(ServiceKind::GitHub));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn authentication_forms() {
        let token: CheckerSettings =
            serde_json::from_value(json!({ "authentication": { "token": "abc" } })).expect("token form");
        let oauth: CheckerSettings = serde_json::from_value(json!({
            "authentication": { "oauth": { "consumer_key": "k", "consumer_secret": "s" } }
        }))
        .expect("oauth form");

        assert_eq!(token.access_token().as_deref(), Some("abc"));
        assert_eq!(oauth.access_token(), None);
        assert_eq!(
            oauth.authentication,
            Some(Authentication::OAuth {
                consumer_key: "k".to_string(),
                consumer_secret: "s".to_string(),
            })
        );
    }

    #[test]
    fn corrupt_file_loads_defaults_and_save_round_trips() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("config").join("settings.json");

        assert_eq!(CheckerSettings::load(&path).branch, "master");

        std::fs::create_dir_all(path.parent().expect("has parent")).expect("create dir");
        std::fs::write(&path, "{broken").expect("write corrupt settings");
        assert_eq!(CheckerSettings::load(&path).check_period_hours, 12);

        let settings = CheckerSettings {
            metadata_url: "https://example.com/info.json".to_string(),
            check_period_hours: 0,
            ..CheckerSettings::default()
        };
        settings.save(&path).expect("save settings");
        let loaded = CheckerSettings::load(&path);
        assert_eq!(loaded.metadata_url, "https://example.com/info.json");
        assert_eq!(loaded.check_period_hours, 0);
    }

    #[test]
    fn validate_names_missing_keys() {
        let settings = CheckerSettings::default();
        assert!(matches!(
            settings.validate(),
            Err(AppError::MissingSetting("metadata_url"))
        ));

        let settings = CheckerSettings {
            metadata_url: "https://example.com/info.json".to_string(),
            ..CheckerSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(AppError::MissingSetting("artifact_path"))
        ));
    }
}
