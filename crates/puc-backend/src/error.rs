use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Network error during {operation} ({stage}): {details}")]
    NetworkError {
        operation: &'static str,
        stage: NetworkStage,
        details: String,
    },

    #[error("{operation} failed with HTTP status {status}")]
    HttpStatus { operation: &'static str, status: u16 },

    #[error("{operation} returned an empty response")]
    EmptyResponse { operation: &'static str },

    #[error("Could not decode {operation} content: {details}")]
    Decode {
        operation: &'static str,
        details: String,
    },

    #[error("Operation not supported by this host: {operation}")]
    Unsupported { operation: &'static str },

    #[error("Invalid {host} repository URL: \"{url}\"")]
    InvalidRepositoryUrl { host: &'static str, url: String },

    #[error("Invalid URL: \"{url}\"")]
    InvalidUrl { url: String },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStage {
    #[error("request")]
    Request,
    #[error("response parse")]
    ResponseParse,
}

impl BackendError {
    pub fn network_request(operation: &'static str, details: impl Into<String>) -> Self {
        Self::NetworkError {
            operation,
            stage: NetworkStage::Request,
            details: details.into(),
        }
    }

    pub fn network_request_from<E>(operation: &'static str, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::network_request(operation, error.to_string())
    }

    pub fn network_parse(operation: &'static str, details: impl Into<String>) -> Self {
        Self::NetworkError {
            operation,
            stage: NetworkStage::ResponseParse,
            details: details.into(),
        }
    }

    pub fn network_parse_from<E>(operation: &'static str, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::network_parse(operation, error.to_string())
    }

    pub fn invalid_repository_url(host: &'static str, url: impl Into<String>) -> Self {
        Self::InvalidRepositoryUrl {
            host,
            url: url.into(),
        }
    }

    /// Whether the error means "the remote has nothing there" rather than a
    /// failure worth reporting.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::HttpStatus { status: 404, .. })
    }
}
