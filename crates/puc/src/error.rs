use std::path::PathBuf;

use puc_backend::BackendError;
use puc_core::CheckError;
use puc_platform::AppPathsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Could not read settings {path}: {details}")]
    Settings { path: PathBuf, details: String },

    #[error("Missing setting: {0}")]
    MissingSetting(&'static str),

    #[error(transparent)]
    Paths(#[from] AppPathsError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Check(#[from] CheckError),

    #[error("{kind}: {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
    },
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl AppError {
    pub fn settings(path: impl Into<PathBuf>, details: impl ToString) -> Self {
        Self::Settings {
            path: path.into(),
            details: details.to_string(),
        }
    }
}
