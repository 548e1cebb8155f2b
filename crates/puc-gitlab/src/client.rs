use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use puc_backend::http::{decode_base64_content, encode_path_segment, with_query};
use puc_backend::version::sort_by_version_desc;
use puc_backend::{
    ApiClient, BackendError, ClientCapabilities, Reference, RepositoryClient, RepositoryLocation,
    absorb,
};

const HOST_LABEL: &str = "GitLab";

#[derive(Debug, Deserialize)]
struct RefResponse {
    name: String,
    commit: Option<RefCommit>,
}

#[derive(Debug, Deserialize)]
struct RefCommit {
    committed_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileResponse {
    content: Option<String>,
    encoding: Option<String>,
}

/// Read access to a project on gitlab.com or a self-hosted GitLab. Projects
/// inside subgroups are addressed by their full namespace.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    api: ApiClient,
    api_base: String,
    repository_url: String,
    project_id: String,
    access_token: Option<String>,
}

impl GitLabClient {
    /// # Errors
    /// Returns [`BackendError::InvalidRepositoryUrl`] when the URL has no
    /// `<namespace>/<project>` path.
    pub fn new(
        repository_url: &str,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let location = RepositoryLocation::parse(HOST_LABEL, repository_url)?;
        let project_id = location.full_path();

        Ok(Self {
            api: ApiClient::new(timeout),
            api_base: format!("{}/api/v4", location.origin()),
            repository_url: format!("{}/{project_id}", location.origin()),
            project_id,
            access_token: access_token.filter(|token| !token.is_empty()),
        })
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/projects/{}/{path}",
            self.api_base,
            encode_path_segment(&self.project_id)
        )
    }

    /// Endpoint URL with `params` and, when configured, the private token.
    fn api_url(&self, operation: &'static str, path: &str, params: &[(&str, &str)]) -> Option<String> {
        let mut params = params.to_vec();
        if let Some(token) = &self.access_token {
            params.push(("private_token", token.as_str()));
        }
        absorb(operation, with_query(&self.endpoint(path), &params))
    }

    async fn fetch_ref(&self, operation: &'static str, path: &str) -> Option<RefResponse> {
        let url = self.api_url(operation, path, &[])?;
        absorb(operation, self.api.get_json(operation, &url).await)
    }
}

fn committed_date(reference: &RefResponse) -> Option<String> {
    reference.commit.as_ref()?.committed_date.clone()
}

#[async_trait]
impl RepositoryClient for GitLabClient {
    fn name(&self) -> &'static str {
        HOST_LABEL
    }

    fn capabilities(&self) -> ClientCapabilities {
        ClientCapabilities {
            supports_releases: false,
            supports_tag_lookup: true,
            signs_download_urls: self.access_token.is_some(),
        }
    }

    fn repository_url(&self) -> &str {
        &self.repository_url
    }

    /// GitLab releases are not consulted; the selector moves on to tags.
    async fn get_latest_release(&self) -> Option<Reference> {
        None
    }

    async fn get_latest_tag(&self) -> Option<Reference> {
        let url = self.api_url("tags", "repository/tags", &[])?;
        let tags: Vec<RefResponse> = absorb("tags", self.api.get_json("tags", &url).await)?;

        let latest = sort_by_version_desc(tags, |tag| Some(tag.name.as_str()))
            .into_iter()
            .next()?;
        let updated = committed_date(&latest);
        let download_url = self.build_archive_download_url(&latest.name);

        Some(
            Reference::tag(latest.name)
                .with_download_url(download_url)
                .with_updated(updated),
        )
    }

    async fn get_branch(&self, name: &str) -> Option<Reference> {
        let branch = self
            .fetch_ref("branches", &format!("repository/branches/{}", encode_path_segment(name)))
            .await?;
        let updated = committed_date(&branch);
        let download_url = self.build_archive_download_url(&branch.name);

        Some(
            Reference::branch(branch.name)
                .with_download_url(download_url)
                .with_updated(updated),
        )
    }

    async fn get_tag(&self, name: &str) -> Result<Option<Reference>, BackendError> {
        let Some(tag) = self
            .fetch_ref("tag", &format!("repository/tags/{}", encode_path_segment(name)))
            .await
        else {
            return Ok(None);
        };
        let updated = committed_date(&tag);
        let download_url = self.build_archive_download_url(&tag.name);

        Ok(Some(
            Reference::tag(tag.name)
                .with_download_url(download_url)
                .with_updated(updated),
        ))
    }

    async fn get_file(&self, path: &str, reference: &str) -> Option<Vec<u8>> {
        let url = self.api_url(
            "files",
            &format!("repository/files/{}", encode_path_segment(path.trim_start_matches('/'))),
            &[("ref", reference)],
        )?;
        let file: FileResponse = absorb("files", self.api.get_json("files", &url).await)?;

        if file.encoding.as_deref().is_some_and(|encoding| encoding != "base64") {
            log::warn!("files: unexpected encoding for {path} at {reference}");
            return None;
        }
        absorb("files", decode_base64_content("files", file.content.as_deref()?))
    }

    async fn get_latest_commit_time(&self, reference: &str, _path: Option<&str>) -> Option<String> {
        let url = self.api_url("commits", "repository/commits", &[("ref_name", reference)])?;
        let commits: Vec<RefCommit> = absorb("commits", self.api.get_json("commits", &url).await)?;

        commits.into_iter().next()?.committed_date
    }

    fn build_archive_download_url(&self, reference: &str) -> String {
        let archive = self.endpoint("repository/archive.zip");
        with_query(&archive, &[("sha", reference)])
            .unwrap_or_else(|_| format!("{archive}?sha={}", encode_path_segment(reference)))
    }

    fn sign_download_url(&self, url: &str) -> String {
        let Some(token) = &self.access_token else {
            return url.to_string();
        };
        with_query(url, &[("private_token", token.as_str())]).unwrap_or_else(|error| {
            log::warn!("Could not sign download URL: {error}");
            url.to_string()
        })
    }
}
