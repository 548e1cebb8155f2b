mod client;

pub use client::GitLabClient;

pub use puc_backend::{BackendError, ClientCapabilities, Reference, RepositoryClient};
