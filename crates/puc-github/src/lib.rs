mod client;

pub use client::{GITHUB_API_BASE, GitHubClient};

pub use puc_backend::{BackendError, ClientCapabilities, Reference, RepositoryClient};
