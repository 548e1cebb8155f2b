use async_trait::async_trait;
use puc_backend::{BackendError, InstalledArtifact, RepositoryClient, UpdateDescriptor, UpdateSource};

use crate::readme::parse_readme;
use crate::reconciler::reconcile;
use crate::selector::select_reference;

pub const DEFAULT_BRANCH: &str = "master";

/// Update source backed by a repository host: selects a reference on the
/// configured branch and reconciles it into a descriptor.
pub struct VcsUpdateSource {
    client: Box<dyn RepositoryClient>,
    branch: String,
}

impl VcsUpdateSource {
    pub fn new(client: Box<dyn RepositoryClient>, branch: impl Into<String>) -> Self {
        let branch = branch.into();
        Self {
            client,
            branch: if branch.trim().is_empty() {
                DEFAULT_BRANCH.to_string()
            } else {
                branch
            },
        }
    }

    #[must_use]
    pub fn branch(&self) -> &str {
        &self.branch
    }
}

#[async_trait]
impl UpdateSource for VcsUpdateSource {
    fn name(&self) -> &'static str {
        self.client.name()
    }

    async fn request_update(
        &self,
        artifact: &dyn InstalledArtifact,
    ) -> Result<Option<UpdateDescriptor>, BackendError> {
        let hint = local_stable_tag(artifact).await;
        let Some(reference) =
            select_reference(self.client.as_ref(), &self.branch, hint.as_deref()).await?
        else {
            log::info!(
                "No {} reference found for {} on branch {}",
                self.client.name(),
                artifact.slug(),
                self.branch
            );
            return Ok(None);
        };

        log::debug!(
            "Selected {} {} for {}",
            reference.kind,
            reference.name,
            artifact.slug()
        );
        Ok(reconcile(self.client.as_ref(), artifact, reference).await)
    }

    fn sign_download_url(&self, url: &str) -> String {
        self.client.sign_download_url(url)
    }
}

/// The `Stable tag` declared by the installed copy's readme.
async fn local_stable_tag(artifact: &dyn InstalledArtifact) -> Option<String> {
    let name = artifact.readme_file_name()?;
    let text = tokio::fs::read_to_string(artifact.directory().join(name))
        .await
        .ok()?;
    parse_readme(&text).stable_tag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeArtifact, MockClient};

    #[tokio::test]
    async fn local_stable_tag_drives_selection() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("readme.txt"), "=== Widget ===\nStable tag: v1.0\n")
            .expect("write readme");
        let client = MockClient::new()
            .with_tag_lookup()
            .with_tags(&["v1.0", "v2.0"])
            .with_file("widget.php", "v1.0", "Version: 1.0");
        let source = VcsUpdateSource::new(Box::new(client), "master");
        let artifact = FakeArtifact::plugin(dir.path(), "0.5").with_readme("readme.txt");

        let descriptor = source
            .request_update(&artifact)
            .await
            .expect("check should not fail")
            .expect("update should be found");

        assert_eq!(descriptor.version, "1.0");
    }

    #[tokio::test]
    async fn unresolved_reference_yields_no_update() {
        let dir = tempfile::tempdir().expect("temp dir");
        let source = VcsUpdateSource::new(Box::new(MockClient::new()), "");
        let artifact = FakeArtifact::plugin(dir.path(), "1.0");

        assert_eq!(source.branch(), DEFAULT_BRANCH);
        let result = source.request_update(&artifact).await.expect("check should not fail");
        assert_eq!(result, None);
    }

    #[test]
    fn signing_is_delegated_to_client() {
        let source = VcsUpdateSource::new(Box::new(MockClient::new()), "main");

        assert_eq!(
            source.sign_download_url("https://example.com/x.zip"),
            "https://example.com/x.zip?token=secret"
        );
        assert_eq!(source.name(), "mock");
    }
}
