use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use puc_backend::http::with_query;
use puc_backend::{
    ApiClient, ArtifactKind, BackendError, InstalledArtifact, UpdateDescriptor, UpdateSource, absorb,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Document served by a flat JSON metadata endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeedDocument {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub version: Option<String>,
    pub homepage: Option<String>,
    pub details_url: Option<String>,
    pub download_url: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub requires: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub tested: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub requires_php: Option<String>,
    pub last_updated: Option<String>,
    pub upgrade_notice: Option<String>,
    pub author: Option<String>,
    pub author_homepage: Option<String>,
    #[serde(deserialize_with = "count")]
    pub downloaded: Option<u64>,
    pub sections: BTreeMap<String, String>,
}

/// Hand-written feeds often use bare numbers (`"version": 2.0`). Other
/// non-string values are treated as absent.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

fn count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(number)) => number.as_u64(),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    })
}

impl FeedDocument {
    /// The first required key that is missing or empty.
    fn missing_required_key(&self, kind: ArtifactKind) -> Option<&'static str> {
        let required: [(&'static str, &Option<String>); 2] = match kind {
            ArtifactKind::Plugin => [("name", &self.name), ("version", &self.version)],
            ArtifactKind::Theme => [("version", &self.version), ("details_url", &self.details_url)],
        };
        required
            .into_iter()
            .find(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
            .map(|(key, _)| key)
    }

    fn into_descriptor(self, artifact: &dyn InstalledArtifact) -> UpdateDescriptor {
        let kind = artifact.kind();
        let homepage = match kind {
            ArtifactKind::Plugin => self.homepage,
            ArtifactKind::Theme => self.details_url.or(self.homepage),
        };

        UpdateDescriptor {
            kind,
            slug: artifact.slug().to_string(),
            name: self.name,
            version: self.version.unwrap_or_default(),
            download_url: self.download_url.filter(|url| !url.is_empty()),
            homepage,
            last_updated: self.last_updated,
            requires: self.requires,
            tested: self.tested,
            requires_php: self.requires_php,
            upgrade_notice: self.upgrade_notice,
            author: self.author,
            author_homepage: self.author_homepage,
            download_count: self.downloaded,
            sections: self.sections,
            filename: artifact.filename(),
            directory_name: Some(artifact.directory_name()),
        }
    }
}

/// Update source that reads a single JSON document describing the latest
/// version.
pub struct MetadataFeed {
    api: ApiClient,
    metadata_url: String,
}

impl MetadataFeed {
    pub fn new(metadata_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api: ApiClient::new(timeout).with_header("Accept", "application/json"),
            metadata_url: metadata_url.into(),
        }
    }
}

#[async_trait]
impl UpdateSource for MetadataFeed {
    fn name(&self) -> &'static str {
        "json"
    }

    async fn request_update(
        &self,
        artifact: &dyn InstalledArtifact,
    ) -> Result<Option<UpdateDescriptor>, BackendError> {
        let installed = artifact.installed_version().unwrap_or_default();
        let url = with_query(
            &self.metadata_url,
            &[
                ("installed_version", installed.as_str()),
                ("checking_for_updates", "1"),
            ],
        )?;

        let Some(document) = absorb(
            "metadata request",
            self.api.get_json::<FeedDocument>("metadata request", &url).await,
        ) else {
            return Ok(None);
        };

        let kind = artifact.kind();
        if let Some(key) = document.missing_required_key(kind) {
            log::warn!(
                "The {kind} metadata file at {} does not contain the required \"{key}\" key.",
                self.metadata_url
            );
            return Ok(None);
        }

        Ok(Some(document.into_descriptor(artifact)))
    }
}
