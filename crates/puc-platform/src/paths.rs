use std::path::{Path, PathBuf};
use thiserror::Error;

pub const APP_DIR_NAME: &str = "puc";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AppPathsError {
    #[error("Could not determine config directory")]
    ConfigDirUnavailable,
    #[error("Could not determine data directory")]
    DataDirUnavailable,
}

/// Where the checker keeps its settings, per-artifact state and log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub state_dir: PathBuf,
}

impl AppPaths {
    /// Build application paths for the current platform.
    ///
    /// State lives in the platform state directory where one exists (XDG on
    /// Linux) and under the data directory elsewhere.
    ///
    /// # Errors
    /// Returns an error when the user config or data directory cannot be
    /// determined.
    pub fn new() -> Result<Self, AppPathsError> {
        let config_dir = dirs::config_dir()
            .ok_or(AppPathsError::ConfigDirUnavailable)?
            .join(APP_DIR_NAME);
        let data_dir = dirs::data_dir()
            .ok_or(AppPathsError::DataDirUnavailable)?
            .join(APP_DIR_NAME);
        let state_dir = dirs::state_dir()
            .map_or_else(|| data_dir.join("state"), |dir| dir.join(APP_DIR_NAME));

        Ok(Self {
            config_dir,
            data_dir,
            state_dir,
        })
    }

    /// Everything below a single directory, for portable installs and tests.
    #[must_use]
    pub fn under(root: &Path) -> Self {
        Self {
            config_dir: root.join("config"),
            data_dir: root.join("data"),
            state_dir: root.join("state"),
        }
    }

    /// Use `state_dir` instead of the platform default.
    #[must_use]
    pub fn with_state_dir(mut self, state_dir: PathBuf) -> Self {
        self.state_dir = state_dir;
        self
    }

    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("debug.log")
    }

    /// Ensure all application directories exist on disk.
    ///
    /// # Errors
    /// Returns an error if any directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.state_dir)?;
        Ok(())
    }
}
