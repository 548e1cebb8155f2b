use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use puc_backend::http::{decode_base64_content, encode_path_segment, with_query};
use puc_backend::version::sort_by_version_desc;
use puc_backend::{
    ApiClient, BackendError, ClientCapabilities, Reference, RepositoryClient, RepositoryLocation,
    absorb, render_markdown,
};

pub const GITHUB_API_BASE: &str = "https://api.github.com";

const HOST_LABEL: &str = "GitHub";

#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    tag_name: String,
    zipball_url: Option<String>,
    created_at: Option<String>,
    body: Option<String>,
    #[serde(default)]
    assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Deserialize)]
struct ReleaseAsset {
    download_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TagResponse {
    name: String,
    zipball_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BranchResponse {
    name: String,
    commit: Option<BranchCommit>,
}

#[derive(Debug, Deserialize)]
struct BranchCommit {
    commit: Option<CommitDetails>,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    commit: CommitDetails,
}

#[derive(Debug, Deserialize)]
struct CommitDetails {
    author: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    date: Option<String>,
}

impl CommitDetails {
    fn author_date(self) -> Option<String> {
        self.author?.date
    }
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    content: Option<String>,
    encoding: Option<String>,
}

/// Read access to a `github.com/<owner>/<repo>` repository through the
/// REST API.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    api: ApiClient,
    api_base: String,
    repository_url: String,
    owner: String,
    repo: String,
    access_token: Option<String>,
}

impl GitHubClient {
    /// # Errors
    /// Returns [`BackendError::InvalidRepositoryUrl`] unless the URL path is
    /// exactly `/<owner>/<repo>`.
    pub fn new(
        repository_url: &str,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let location = RepositoryLocation::parse(HOST_LABEL, repository_url)?;
        let (owner, repo) = location
            .owner_and_repo()
            .ok_or_else(|| BackendError::invalid_repository_url(HOST_LABEL, repository_url))?;
        let access_token = access_token.filter(|token| !token.is_empty());

        let mut api = ApiClient::new(timeout).with_header("Accept", "application/vnd.github+json");
        if let Some(token) = &access_token {
            api = api.with_header("Authorization", format!("token {token}"));
        }

        Ok(Self {
            api,
            api_base: GITHUB_API_BASE.to_string(),
            repository_url: format!("{}/{owner}/{repo}", location.origin()),
            owner: owner.to_string(),
            repo: repo.to_string(),
            access_token,
        })
    }

    /// Send API requests somewhere other than `api.github.com`.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{path}",
            self.api_base,
            encode_path_segment(&self.owner),
            encode_path_segment(&self.repo)
        )
    }

    fn endpoint_with_query(
        &self,
        operation: &'static str,
        path: &str,
        params: &[(&str, &str)],
    ) -> Option<String> {
        absorb(operation, with_query(&self.endpoint(path), params))
    }
}

#[async_trait]
impl RepositoryClient for GitHubClient {
    fn name(&self) -> &'static str {
        HOST_LABEL
    }

    fn capabilities(&self) -> ClientCapabilities {
        ClientCapabilities {
            supports_releases: true,
            supports_tag_lookup: false,
            signs_download_urls: self.access_token.is_some(),
        }
    }

    fn repository_url(&self) -> &str {
        &self.repository_url
    }

    async fn get_latest_release(&self) -> Option<Reference> {
        let url = self.endpoint("releases/latest");
        let release: ReleaseResponse =
            absorb("releases/latest", self.api.get_json("releases/latest", &url).await)?;

        let download_url = release
            .zipball_url
            .unwrap_or_else(|| self.build_archive_download_url(&release.tag_name));
        let changelog = release.body.as_deref().map(render_markdown);
        let download_count = release.assets.first().and_then(|asset| asset.download_count);

        Some(
            Reference::release(release.tag_name)
                .with_download_url(download_url)
                .with_updated(release.created_at)
                .with_changelog(changelog)
                .with_download_count(download_count),
        )
    }

    async fn get_latest_tag(&self) -> Option<Reference> {
        let url = self.endpoint("tags");
        let tags: Vec<TagResponse> = absorb("tags", self.api.get_json("tags", &url).await)?;

        let latest = sort_by_version_desc(tags, |tag| Some(tag.name.as_str()))
            .into_iter()
            .next()?;
        let download_url = latest
            .zipball_url
            .unwrap_or_else(|| self.build_archive_download_url(&latest.name));

        Some(Reference::tag(latest.name).with_download_url(download_url))
    }

    async fn get_branch(&self, name: &str) -> Option<Reference> {
        let url = self.endpoint(&format!("branches/{}", encode_path_segment(name)));
        let branch: BranchResponse = absorb("branches", self.api.get_json("branches", &url).await)?;

        let updated = branch
            .commit
            .and_then(|commit| commit.commit)
            .and_then(CommitDetails::author_date);
        let download_url = self.build_archive_download_url(&branch.name);

        Some(
            Reference::branch(branch.name)
                .with_download_url(download_url)
                .with_updated(updated),
        )
    }

    async fn get_file(&self, path: &str, reference: &str) -> Option<Vec<u8>> {
        let url = self.endpoint_with_query(
            "contents",
            &format!("contents/{}", path.trim_start_matches('/')),
            &[("ref", reference)],
        )?;
        let file: ContentResponse = absorb("contents", self.api.get_json("contents", &url).await)?;

        if file.encoding.as_deref().is_some_and(|encoding| encoding != "base64") {
            log::warn!("contents: unexpected encoding for {path} at {reference}");
            return None;
        }
        absorb("contents", decode_base64_content("contents", file.content.as_deref()?))
    }

    async fn get_latest_commit_time(&self, reference: &str, path: Option<&str>) -> Option<String> {
        let mut params = vec![("sha", reference)];
        if let Some(path) = path {
            params.push(("path", path));
        }
        let url = self.endpoint_with_query("commits", "commits", &params)?;
        let commits: Vec<CommitResponse> = absorb("commits", self.api.get_json("commits", &url).await)?;

        commits.into_iter().next()?.commit.author_date()
    }

    fn build_archive_download_url(&self, reference: &str) -> String {
        self.endpoint(&format!("zipball/{}", encode_path_segment(reference)))
    }

    fn sign_download_url(&self, url: &str) -> String {
        let Some(token) = &self.access_token else {
            return url.to_string();
        };
        with_query(url, &[("access_token", token.as_str())]).unwrap_or_else(|error| {
            log::warn!("Could not sign download URL: {error}");
            url.to_string()
        })
    }
}
