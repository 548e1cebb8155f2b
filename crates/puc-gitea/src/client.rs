use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use puc_backend::http::{decode_base64_content, encode_path_segment, with_query};
use puc_backend::version::sort_by_version_desc;
use puc_backend::{
    ApiClient, BackendError, ClientCapabilities, Reference, RepositoryClient, RepositoryLocation,
    absorb,
};

const HOST_LABEL: &str = "GiTea";

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
    timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    created: Option<String>,
    commit: Option<CommitDetails>,
}

#[derive(Debug, Deserialize)]
struct CommitDetails {
    author: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    date: Option<String>,
}

/// Some GiTea versions wrap raw file content in a JSON envelope.
#[derive(Debug, Deserialize)]
struct ContentEnvelope {
    content: String,
    encoding: Option<String>,
}

/// Read access to a repository on a self-hosted GiTea. Installations served
/// from a sub-directory keep that prefix in front of `/api/v1`.
#[derive(Debug, Clone)]
pub struct GiteaClient {
    api: ApiClient,
    repo_api: String,
    repository_url: String,
    access_token: Option<String>,
}

impl GiteaClient {
    /// # Errors
    /// Returns [`BackendError::InvalidRepositoryUrl`] when the URL has fewer
    /// than two path segments.
    pub fn new(
        repository_url: &str,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let location = RepositoryLocation::parse(HOST_LABEL, repository_url)?;
        let (prefix, owner, repo) = location.split_prefix();

        let mut root = location.origin();
        if !prefix.is_empty() {
            root = format!("{root}/{prefix}");
        }
        let repo_api = format!(
            "{root}/api/v1/repos/{}/{}",
            encode_path_segment(owner),
            encode_path_segment(repo)
        );

        Ok(Self {
            api: ApiClient::new(timeout),
            repo_api,
            repository_url: format!("{root}/{owner}/{repo}"),
            access_token: access_token.filter(|token| !token.is_empty()),
        })
    }

    /// Replace everything before `/api/v1`, keeping the owner and repo path.
    #[must_use]
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        if let Some(index) = self.repo_api.find("/api/v1/repos/") {
            self.repo_api = format!("{}{}", api_base.trim_end_matches('/'), &self.repo_api[index..]);
        }
        self
    }

    fn api_url(&self, operation: &'static str, path: &str, params: &[(&str, &str)]) -> Option<String> {
        let mut params = params.to_vec();
        if let Some(token) = &self.access_token {
            params.push(("access_token", token.as_str()));
        }
        absorb(operation, with_query(&format!("{}/{path}", self.repo_api), &params))
    }
}

fn decode_raw(body: Vec<u8>) -> Option<Vec<u8>> {
    match serde_json::from_slice::<ContentEnvelope>(&body) {
        Ok(envelope) if envelope.encoding.as_deref().is_none_or(|enc| enc == "base64") => {
            absorb("raw", decode_base64_content("raw", &envelope.content))
        }
        _ => Some(body),
    }
}

#[async_trait]
impl RepositoryClient for GiteaClient {
    fn name(&self) -> &'static str {
        HOST_LABEL
    }

    fn capabilities(&self) -> ClientCapabilities {
        ClientCapabilities {
            supports_releases: false,
            supports_tag_lookup: false,
            signs_download_urls: self.access_token.is_some(),
        }
    }

    fn repository_url(&self) -> &str {
        &self.repository_url
    }

    /// GiTea has no release concept here; the newest version tag stands in.
    async fn get_latest_release(&self) -> Option<Reference> {
        self.get_latest_tag().await
    }

    async fn get_latest_tag(&self) -> Option<Reference> {
        let url = self.api_url("tags", "tags", &[])?;
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
        let url = self.api_url("branches", &format!("branches/{}", encode_path_segment(name)), &[])?;
        let branch: BranchResponse = absorb("branches", self.api.get_json("branches", &url).await)?;

        let updated = branch.commit.and_then(|commit| commit.timestamp);
        let download_url = self.build_archive_download_url(&branch.name);

        Some(
            Reference::branch(branch.name)
                .with_download_url(download_url)
                .with_updated(updated),
        )
    }

    async fn get_file(&self, path: &str, reference: &str) -> Option<Vec<u8>> {
        let url = self.api_url(
            "raw",
            &format!("raw/{}", path.trim_start_matches('/')),
            &[("ref", reference)],
        )?;
        let body = absorb("raw", self.api.get_bytes("raw", &url).await)?;
        decode_raw(body)
    }

    async fn get_latest_commit_time(&self, reference: &str, _path: Option<&str>) -> Option<String> {
        let url = self.api_url(
            "commits",
            &format!("git/commits/{}", encode_path_segment(reference)),
            &[],
        )?;
        let commit: CommitResponse = absorb("commits", self.api.get_json("commits", &url).await)?;

        commit
            .commit
            .and_then(|details| details.author)
            .and_then(|author| author.date)
            .or(commit.created)
    }

    fn build_archive_download_url(&self, reference: &str) -> String {
        format!("{}/archive/{}.zip", self.repo_api, encode_path_segment(reference))
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
