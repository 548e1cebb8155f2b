use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;

use crate::changelog::find_changelog_name;
use crate::error::BackendError;
use crate::markdown::render_markdown;
use crate::types::{ArtifactKind, Reference, UpdateDescriptor};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientCapabilities {
    /// The host has a native "release" concept.
    pub supports_releases: bool,
    /// `get_tag` is implemented.
    pub supports_tag_lookup: bool,
    /// Download URLs need credentials added before use.
    pub signs_download_urls: bool,
}

/// Read access to one remote repository.
///
/// Network failures are absorbed by implementations and reported as `None`;
/// only [`RepositoryClient::get_tag`] can fail, and only when the host client
/// does not implement it.
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> ClientCapabilities;

    fn repository_url(&self) -> &str;

    /// Whether `branch` is the branch releases are cut from.
    fn is_default_branch(&self, branch: &str) -> bool {
        matches!(branch, "master" | "main")
    }

    async fn get_latest_release(&self) -> Option<Reference>;

    /// The tag with the highest version-like name.
    async fn get_latest_tag(&self) -> Option<Reference>;

    async fn get_branch(&self, name: &str) -> Option<Reference>;

    async fn get_tag(&self, _name: &str) -> Result<Option<Reference>, BackendError> {
        Err(BackendError::Unsupported { operation: "get_tag" })
    }

    /// Raw file content at `reference`.
    async fn get_file(&self, path: &str, reference: &str) -> Option<Vec<u8>>;

    /// Author date of the newest commit on `reference`. Hosts that can filter
    /// history by file only consider commits touching `path`.
    async fn get_latest_commit_time(&self, reference: &str, path: Option<&str>) -> Option<String>;

    fn build_archive_download_url(&self, reference: &str) -> String;

    fn sign_download_url(&self, url: &str) -> String {
        url.to_string()
    }

    /// Render the changelog file found in `local_directory` as it exists at
    /// `reference` on the remote.
    async fn get_changelog(&self, reference: &str, local_directory: Option<&Path>) -> Option<String> {
        let name = find_changelog_name(local_directory?)?;
        let content = self.get_file(name, reference).await?;
        let html = render_markdown(&String::from_utf8_lossy(&content));
        (!html.trim().is_empty()).then_some(html)
    }
}

/// The locally installed plugin or theme being checked.
pub trait InstalledArtifact: Send + Sync {
    fn kind(&self) -> ArtifactKind;

    fn slug(&self) -> &str;

    /// Absolute directory the artifact is installed in.
    fn directory(&self) -> &Path;

    fn directory_name(&self) -> String {
        self.directory()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Main file relative to [`InstalledArtifact::directory`]: the plugin's
    /// PHP file or a theme's `style.css`.
    fn main_file_name(&self) -> &str;

    /// Identity in the host update list, e.g. `my-plugin/my-plugin.php`.
    /// Themes are identified by directory name only.
    fn filename(&self) -> Option<String>;

    /// Header fields of the local main file keyed by descriptor field name
    /// (`version`, `name`, `homepage`, ...). `None` if the file is unreadable.
    fn local_header(&self) -> Option<BTreeMap<String, String>>;

    /// Name of the structured readme file shipped with the artifact, if any.
    fn readme_file_name(&self) -> Option<String> {
        None
    }

    fn installed_version(&self) -> Option<String> {
        self.local_header()?
            .remove("version")
            .filter(|version| !version.trim().is_empty())
    }
}

/// Produces an update descriptor for an installed artifact.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run one check. `Ok(None)` means no information was obtained this round.
    ///
    /// # Errors
    /// Only programming-contract violations are returned; network trouble is
    /// absorbed.
    async fn request_update(
        &self,
        artifact: &dyn InstalledArtifact,
    ) -> Result<Option<UpdateDescriptor>, BackendError>;

    fn sign_download_url(&self, url: &str) -> String {
        url.to_string()
    }
}
