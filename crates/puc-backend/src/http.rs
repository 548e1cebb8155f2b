//! Thin GET-only HTTP layer shared by every repository client.
//!
//! Each call is a single request bounded by the client timeout. Nothing here
//! retries; callers decide whether a failure matters through [`absorb`].

use std::time::Duration;

use base64::Engine as _;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::de::DeserializeOwned;

use crate::error::BackendError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything except unreserved characters is escaped, so `/` in a branch
/// name or a namespaced project id stays inside one segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Build the configured client. If that fails, requests still go out, but
/// without the timeout or user agent.
fn finish_client(builder: reqwest::ClientBuilder) -> reqwest::Client {
    builder.build().unwrap_or_else(|error| {
        log::warn!("Could not configure HTTP client, using defaults without a timeout: {error}");
        reqwest::Client::new()
    })
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    headers: Vec<(&'static str, String)>,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl ApiClient {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let client = finish_client(
            reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(format!("puc/{}", env!("CARGO_PKG_VERSION"))),
        );

        Self {
            client,
            headers: Vec::new(),
        }
    }

    /// Add a header sent with every request made by this client.
    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// GET `url` and return the raw body of a `200 OK` response.
    ///
    /// # Errors
    /// Returns an error on transport failure, on any status other than 200,
    /// or when the body is empty.
    pub async fn get_bytes(&self, operation: &'static str, url: &str) -> Result<Vec<u8>, BackendError> {
        let mut request = self.client.get(url);
        for (name, value) in &self.headers {
            request = request.header(*name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::network_request_from(operation, e))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(BackendError::HttpStatus {
                operation,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| BackendError::network_parse_from(operation, e))?;

        if body.is_empty() {
            return Err(BackendError::EmptyResponse { operation });
        }

        Ok(body.to_vec())
    }

    /// GET `url` and deserialize the JSON body.
    ///
    /// # Errors
    /// Same as [`ApiClient::get_bytes`], plus a decode error for invalid JSON.
    pub async fn get_json<T>(&self, operation: &'static str, url: &str) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        let body = self.get_bytes(operation, url).await?;
        serde_json::from_slice(&body).map_err(|e| BackendError::Decode {
            operation,
            details: e.to_string(),
        })
    }
}

/// Turn a failed lookup into "no result", logging it on the way.
///
/// A 404 is an expected miss and is only logged at debug level.
pub fn absorb<T>(operation: &str, result: Result<T, BackendError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) if error.is_not_found() => {
            log::debug!("{operation}: nothing found ({error})");
            None
        }
        Err(error) => {
            log::warn!("{operation}: {error}");
            None
        }
    }
}

/// Append query parameters to `url`, keeping any it already has.
///
/// # Errors
/// Returns an error if `url` is not an absolute URL.
pub fn with_query(url: &str, params: &[(&str, &str)]) -> Result<String, BackendError> {
    if params.is_empty() {
        return Ok(url.to_string());
    }

    let mut parsed = url::Url::parse(url).map_err(|_| BackendError::InvalidUrl {
        url: url.to_string(),
    })?;
    parsed.query_pairs_mut().extend_pairs(params);
    Ok(parsed.into())
}

/// Percent-encode `value` for use as a single URL path segment.
#[must_use]
pub fn encode_path_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Decode a base64 file body as returned by the GitHub, GitLab and GiTea
/// content APIs, which wrap the payload at 60 or 76 columns.
///
/// # Errors
/// Returns a decode error when the payload is not valid base64.
pub fn decode_base64_content(operation: &'static str, content: &str) -> Result<Vec<u8>, BackendError> {
    let compact: String = content.chars().filter(|ch| !ch.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| BackendError::Decode {
            operation,
            details: e.to_string(),
        })
}
