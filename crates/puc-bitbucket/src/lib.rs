mod client;
mod oauth;

pub use client::{BITBUCKET_API_BASE, BitBucketClient};
pub use oauth::OAuthSigner;

pub use puc_backend::{BackendError, ClientCapabilities, Reference, RepositoryClient};
