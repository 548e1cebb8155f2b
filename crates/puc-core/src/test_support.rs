use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use puc_backend::version::sort_by_version_desc;
use puc_backend::{
    ArtifactKind, BackendError, ClientCapabilities, InstalledArtifact, Reference, RepositoryClient,
};

/// In-memory repository that records which operations were called.
#[derive(Default)]
pub struct MockClient {
    calls: Mutex<Vec<&'static str>>,
    capabilities: ClientCapabilities,
    release: Option<Reference>,
    tags: Vec<String>,
    branches: Vec<String>,
    files: HashMap<(String, String), Vec<u8>>,
    commit_times: HashMap<String, String>,
    commit_paths: Mutex<Vec<String>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag_lookup(mut self) -> Self {
        self.capabilities.supports_tag_lookup = true;
        self
    }

    pub fn with_release_support(mut self) -> Self {
        self.capabilities.supports_releases = true;
        self
    }

    pub fn with_release(mut self, name: &str) -> Self {
        self.capabilities.supports_releases = true;
        self.release = Some(Reference::release(name).with_download_url(download_url(name)));
        self
    }

    pub fn with_tags(mut self, names: &[&str]) -> Self {
        self.tags = names.iter().map(ToString::to_string).collect();
        self
    }

    pub fn with_branch(mut self, name: &str) -> Self {
        self.branches.push(name.to_string());
        self
    }

    pub fn with_file(mut self, path: &str, reference: &str, content: &str) -> Self {
        self.files.insert(
            (path.to_string(), reference.to_string()),
            content.as_bytes().to_vec(),
        );
        self
    }

    pub fn with_commit_time(mut self, reference: &str, time: &str) -> Self {
        self.commit_times
            .insert(reference.to_string(), time.to_string());
        self
    }

    pub fn was_called(&self, operation: &str) -> bool {
        self.calls
            .lock()
            .map(|calls| calls.iter().any(|call| *call == operation))
            .unwrap_or(false)
    }

    /// Paths passed to `get_latest_commit_time`, in call order.
    pub fn commit_paths(&self) -> Vec<String> {
        self.commit_paths
            .lock()
            .map(|paths| paths.clone())
            .unwrap_or_default()
    }

    fn record(&self, operation: &'static str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(operation);
        }
    }

    fn tag(name: &str) -> Reference {
        Reference::tag(name).with_download_url(download_url(name))
    }
}

fn download_url(name: &str) -> String {
    format!("https://example.com/acme/widget/archive/{name}.zip")
}

#[async_trait]
impl RepositoryClient for MockClient {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn capabilities(&self) -> ClientCapabilities {
        self.capabilities
    }

    fn repository_url(&self) -> &str {
        "https://example.com/acme/widget"
    }

    async fn get_latest_release(&self) -> Option<Reference> {
        self.record("get_latest_release");
        self.release.clone()
    }

    async fn get_latest_tag(&self) -> Option<Reference> {
        self.record("get_latest_tag");
        let sorted = sort_by_version_desc(self.tags.clone(), |name| Some(name.as_str()));
        sorted.first().map(|name| Self::tag(name))
    }

    async fn get_branch(&self, name: &str) -> Option<Reference> {
        self.record("get_branch");
        self.branches
            .iter()
            .any(|branch| branch == name)
            .then(|| Reference::branch(name))
    }

    async fn get_tag(&self, name: &str) -> Result<Option<Reference>, BackendError> {
        self.record("get_tag");
        if !self.capabilities.supports_tag_lookup {
            return Err(BackendError::Unsupported { operation: "get_tag" });
        }
        Ok(self
            .tags
            .iter()
            .any(|tag| tag == name)
            .then(|| Self::tag(name)))
    }

    async fn get_file(&self, path: &str, reference: &str) -> Option<Vec<u8>> {
        self.record("get_file");
        self.files
            .get(&(path.to_string(), reference.to_string()))
            .cloned()
    }

    async fn get_latest_commit_time(&self, reference: &str, path: Option<&str>) -> Option<String> {
        self.record("get_latest_commit_time");
        if let (Some(path), Ok(mut paths)) = (path, self.commit_paths.lock()) {
            paths.push(path.to_string());
        }
        self.commit_times.get(reference).cloned()
    }

    fn build_archive_download_url(&self, reference: &str) -> String {
        download_url(reference)
    }

    fn sign_download_url(&self, url: &str) -> String {
        format!("{url}?token=secret")
    }
}

/// Installed artifact backed by fixed header values.
pub struct FakeArtifact {
    pub kind: ArtifactKind,
    pub slug: String,
    pub directory: PathBuf,
    pub header: BTreeMap<String, String>,
    pub readme: Option<String>,
}

impl FakeArtifact {
    pub fn plugin(directory: &Path, version: &str) -> Self {
        Self {
            kind: ArtifactKind::Plugin,
            slug: "widget".to_string(),
            directory: directory.to_path_buf(),
            header: BTreeMap::from([
                ("version".to_string(), version.to_string()),
                ("name".to_string(), "Widget".to_string()),
            ]),
            readme: None,
        }
    }

    pub fn theme(directory: &Path, version: &str) -> Self {
        Self {
            kind: ArtifactKind::Theme,
            ..Self::plugin(directory, version)
        }
    }

    pub fn with_header(mut self, field: &str, value: &str) -> Self {
        self.header.insert(field.to_string(), value.to_string());
        self
    }

    pub fn without_version(mut self) -> Self {
        self.header.remove("version");
        self
    }

    pub fn with_readme(mut self, name: &str) -> Self {
        self.readme = Some(name.to_string());
        self
    }
}

impl InstalledArtifact for FakeArtifact {
    fn kind(&self) -> ArtifactKind {
        self.kind
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn directory(&self) -> &Path {
        &self.directory
    }

    fn main_file_name(&self) -> &str {
        match self.kind {
            ArtifactKind::Plugin => "widget.php",
            ArtifactKind::Theme => "style.css",
        }
    }

    fn filename(&self) -> Option<String> {
        (self.kind == ArtifactKind::Plugin).then(|| "widget/widget.php".to_string())
    }

    fn local_header(&self) -> Option<BTreeMap<String, String>> {
        Some(self.header.clone())
    }

    fn readme_file_name(&self) -> Option<String> {
        self.readme.clone()
    }
}
