//! Shared building blocks for the update checker: the repository-client and
//! update-source capability traits, the descriptor types they produce, the
//! GET-only HTTP helper and version ordering.

mod changelog;
mod error;
pub mod http;
mod location;
mod markdown;
mod traits;
mod types;
pub mod version;

pub use changelog::{CHANGELOG_NAMES, find_changelog_name};
pub use error::{BackendError, NetworkStage};
pub use http::{ApiClient, absorb};
pub use location::RepositoryLocation;
pub use markdown::render_markdown;
pub use traits::{ClientCapabilities, InstalledArtifact, RepositoryClient, UpdateSource};
pub use types::{
    ArtifactKind, CHANGELOG_SECTION, CheckState, DESCRIPTION_SECTION, Reference, ReferenceKind,
    UpdateDescriptor,
};
pub use version::{compare_versions, is_newer_version, looks_like_version};
