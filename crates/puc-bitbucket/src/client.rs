use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use puc_backend::version::sort_by_version_desc;
use puc_backend::{
    ApiClient, BackendError, ClientCapabilities, Reference, RepositoryClient, RepositoryLocation,
    absorb,
};

use crate::oauth::OAuthSigner;

pub const BITBUCKET_API_BASE: &str = "https://api.bitbucket.org";

const HOST_LABEL: &str = "BitBucket";

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    values: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RefResponse {
    name: String,
    target: Option<RefTarget>,
}

#[derive(Debug, Deserialize)]
struct RefTarget {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SourceResponse {
    data: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BitBucketClient {
    api: ApiClient,
    api_base: String,
    repository_url: String,
    username: String,
    repository: String,
    oauth: Option<OAuthSigner>,
}

impl BitBucketClient {
    /// # Errors
    /// Returns [`BackendError::InvalidRepositoryUrl`] unless the URL path is
    /// exactly `/<user>/<repo>`.
    pub fn new(
        repository_url: &str,
        oauth: Option<OAuthSigner>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let location = RepositoryLocation::parse(HOST_LABEL, repository_url)?;
        let (username, repository) = location
            .owner_and_repo()
            .ok_or_else(|| BackendError::invalid_repository_url(HOST_LABEL, repository_url))?;

        Ok(Self {
            api: ApiClient::new(timeout),
            api_base: BITBUCKET_API_BASE.to_string(),
            repository_url: format!("{}/{username}/{repository}", location.origin()),
            username: username.to_string(),
            repository: repository.to_string(),
            oauth,
        })
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn sign(&self, operation: &'static str, url: String) -> Option<String> {
        match &self.oauth {
            Some(oauth) => absorb(operation, oauth.sign(&url, "GET")),
            None => Some(url),
        }
    }

    /// Call a repository endpoint of the given API generation (`2.0` for
    /// refs and commits, `1.0` for raw sources).
    async fn api<T>(&self, operation: &'static str, version: &str, path: &str) -> Option<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!(
            "{}/{version}/repositories/{}/{}/{}",
            self.api_base,
            self.username,
            self.repository,
            path.trim_start_matches('/')
        );
        let url = self.sign(operation, url)?;
        absorb(operation, self.api.get_json(operation, &url).await)
    }

    /// Attach the archive URL and target commit date to a reference.
    fn complete(&self, reference: Reference, target: Option<RefTarget>) -> Reference {
        let download_url = self.build_archive_download_url(&reference.name);
        reference
            .with_download_url(download_url)
            .with_updated(target.and_then(|target| target.date))
    }
}

#[async_trait]
impl RepositoryClient for BitBucketClient {
    fn name(&self) -> &'static str {
        HOST_LABEL
    }

    fn capabilities(&self) -> ClientCapabilities {
        ClientCapabilities {
            supports_releases: false,
            supports_tag_lookup: true,
            signs_download_urls: self.oauth.is_some(),
        }
    }

    fn repository_url(&self) -> &str {
        &self.repository_url
    }

    async fn get_latest_release(&self) -> Option<Reference> {
        None
    }

    async fn get_latest_tag(&self) -> Option<Reference> {
        let page: Page<RefResponse> = self.api("tags", "2.0", "refs/tags").await?;
        let latest = sort_by_version_desc(page.values, |tag| Some(tag.name.as_str()))
            .into_iter()
            .next()?;
        Some(self.complete(Reference::tag(latest.name), latest.target))
    }

    async fn get_branch(&self, name: &str) -> Option<Reference> {
        let branch: RefResponse = self
            .api("branches", "2.0", &format!("refs/branches/{name}"))
            .await?;
        Some(self.complete(Reference::branch(branch.name), branch.target))
    }

    async fn get_tag(&self, name: &str) -> Result<Option<Reference>, BackendError> {
        let tag: Option<RefResponse> = self.api("tag", "2.0", &format!("refs/tags/{name}")).await;
        Ok(tag.map(|tag| self.complete(Reference::tag(tag.name), tag.target)))
    }

    async fn get_file(&self, path: &str, reference: &str) -> Option<Vec<u8>> {
        let source: SourceResponse = self
            .api("src", "1.0", &format!("src/{reference}/{}", path.trim_start_matches('/')))
            .await?;
        source.data.map(String::into_bytes)
    }

    async fn get_latest_commit_time(&self, reference: &str, _path: Option<&str>) -> Option<String> {
        let page: Page<RefTarget> = self
            .api("commits", "2.0", &format!("commits/{reference}"))
            .await?;
        page.values.into_iter().next()?.date
    }

    fn build_archive_download_url(&self, reference: &str) -> String {
        format!("{}/get/{reference}.zip", self.repository_url)
    }

    fn sign_download_url(&self, url: &str) -> String {
        self.sign("download", url.to_string())
            .unwrap_or_else(|| url.to_string())
    }
}
