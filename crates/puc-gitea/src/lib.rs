mod client;

pub use client::GiteaClient;

pub use puc_backend::{BackendError, ClientCapabilities, Reference, RepositoryClient};
