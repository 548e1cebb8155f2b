use std::path::PathBuf;

use puc_backend::BackendError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("\"{path}\" is neither a plugin nor a theme")]
    UnknownArtifact { path: PathBuf },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Could not {action} update state at {path}: {source}")]
    State {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CheckError {
    pub fn unknown_artifact(path: impl Into<PathBuf>) -> Self {
        Self::UnknownArtifact { path: path.into() }
    }
}
