use crate::error::BackendError;

/// A repository URL split into the parts the host clients need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLocation {
    pub scheme: String,
    /// Host name including a non-default port, e.g. `git.example.com:3000`.
    pub host: String,
    pub segments: Vec<String>,
}

impl RepositoryLocation {
    /// Split `url` into scheme, host and path segments. A trailing `.git`
    /// on the last segment is dropped.
    ///
    /// # Errors
    /// Returns [`BackendError::InvalidRepositoryUrl`] when the URL does not
    /// parse or has fewer than two path segments.
    pub fn parse(host_label: &'static str, url: &str) -> Result<Self, BackendError> {
        let invalid = || BackendError::invalid_repository_url(host_label, url);
        let parsed = url::Url::parse(url.trim()).map_err(|_| invalid())?;
        let host = parsed.host_str().ok_or_else(invalid)?;
        let host = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let mut segments: Vec<String> = parsed
            .path_segments()
            .map(|parts| {
                parts
                    .filter(|part| !part.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if let Some(last) = segments.last_mut()
            && let Some(stripped) = last.strip_suffix(".git")
        {
            *last = stripped.to_string();
        }

        if segments.len() < 2 {
            return Err(invalid());
        }

        Ok(Self {
            scheme: parsed.scheme().to_string(),
            host,
            segments,
        })
    }

    /// `scheme://host[:port]`
    #[must_use]
    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }

    /// Owner and repository name, when the path is exactly `/owner/repo`.
    #[must_use]
    pub fn owner_and_repo(&self) -> Option<(&str, &str)> {
        match self.segments.as_slice() {
            [owner, repo] => Some((owner, repo)),
            _ => None,
        }
    }

    /// The last two segments as owner and repository, plus whatever path
    /// precedes them (used for installs served from a sub-directory).
    #[must_use]
    pub fn split_prefix(&self) -> (String, &str, &str) {
        let count = self.segments.len();
        let prefix = self.segments[..count - 2].join("/");
        (prefix, &self.segments[count - 2], &self.segments[count - 1])
    }

    /// Full path, e.g. `group/subgroup/project`.
    #[must_use]
    pub fn full_path(&self) -> String {
        self.segments.join("/")
    }
}
