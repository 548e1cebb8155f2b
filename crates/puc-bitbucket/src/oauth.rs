//! OAuth 1.0a request signing (HMAC-SHA1, consumer credentials only).

use base64::Engine as _;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha1::Sha1;

use puc_backend::BackendError;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters stay as they are.
const OAUTH_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE).to_string()
}

#[derive(Clone)]
pub struct OAuthSigner {
    consumer_key: String,
    consumer_secret: String,
}

impl std::fmt::Debug for OAuthSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSigner")
            .field("consumer_key", &self.consumer_key)
            .finish_non_exhaustive()
    }
}

impl OAuthSigner {
    #[must_use]
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
        }
    }

    /// Return `url` with the OAuth parameters and signature merged into its
    /// query string, using a fresh nonce and the current time.
    ///
    /// # Errors
    /// Returns [`BackendError::InvalidUrl`] if `url` cannot be parsed.
    pub fn sign(&self, url: &str, method: &str) -> Result<String, BackendError> {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        self.sign_with(url, method, &nonce, &timestamp)
    }

    fn sign_with(
        &self,
        url: &str,
        method: &str,
        nonce: &str,
        timestamp: &str,
    ) -> Result<String, BackendError> {
        let mut parsed = url::Url::parse(url).map_err(|_| BackendError::InvalidUrl {
            url: url.to_string(),
        })?;

        let mut params: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(key, value)| (encode(&key), encode(&value)))
            .collect();
        for (key, value) in [
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp),
            ("oauth_version", "1.0"),
        ] {
            params.push((encode(key), encode(value)));
        }
        params.sort();

        parsed.set_query(None);
        parsed.set_fragment(None);
        let base_url = parsed.to_string();

        let base_string = format!(
            "{}&{}&{}",
            method.to_ascii_uppercase(),
            encode(&base_url),
            encode(&join_params(&params))
        );
        let signing_key = format!("{}&", encode(&self.consumer_secret));

        let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes()).map_err(|e| {
            BackendError::Decode {
                operation: "oauth_sign",
                details: e.to_string(),
            }
        })?;
        mac.update(base_string.as_bytes());
        let signature =
            base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        params.push(("oauth_signature".to_string(), encode(&signature)));
        params.sort();

        Ok(format!("{base_url}?{}", join_params(&params)))
    }
}

fn join_params(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}
