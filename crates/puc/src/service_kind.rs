use serde::{Deserialize, Serialize};

/// Where update information for an artifact comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    GitHub,
    GitLab,
    BitBucket,
    Gitea,
    Json,
}

impl ServiceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::GitLab => "gitlab",
            Self::BitBucket => "bitbucket",
            Self::Gitea => "gitea",
            Self::Json => "json",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "github" => Some(Self::GitHub),
            "gitlab" => Some(Self::GitLab),
            "bitbucket" => Some(Self::BitBucket),
            "gitea" => Some(Self::Gitea),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// The hosted service a repository on `host` belongs to, if it is one
    /// of the public ones.
    pub fn from_public_host(host: &str) -> Option<Self> {
        match host.trim_start_matches("www.").to_ascii_lowercase().as_str() {
            "github.com" => Some(Self::GitHub),
            "gitlab.com" => Some(Self::GitLab),
            "bitbucket.org" => Some(Self::BitBucket),
            _ => None,
        }
    }

    pub const fn is_repository_host(self) -> bool {
        !matches!(self, Self::Json)
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
