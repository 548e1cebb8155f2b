use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::version::{is_newer_version, looks_like_version};

/// Key of the changelog entry in [`UpdateDescriptor::sections`].
pub const CHANGELOG_SECTION: &str = "changelog";
/// Key of the description entry in [`UpdateDescriptor::sections`].
pub const DESCRIPTION_SECTION: &str = "description";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Branch,
    Tag,
    Release,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Branch => write!(f, "branch"),
            Self::Tag => write!(f, "tag"),
            Self::Release => write!(f, "release"),
        }
    }
}

/// A named pointer into a remote repository, built fresh for every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub kind: ReferenceKind,
    /// The ref as used in further API calls.
    pub name: String,
    /// Version derived from the name. Only set for tags and releases.
    pub version: Option<String>,
    pub download_url: Option<String>,
    pub updated: Option<String>,
    pub changelog: Option<String>,
    pub download_count: Option<u64>,
}

impl Reference {
    #[must_use]
    pub fn branch(name: impl Into<String>) -> Self {
        Self::new(ReferenceKind::Branch, name.into(), None)
    }

    /// A tag reference. The version is the tag name without its `v` prefix
    /// when the name looks like a version.
    #[must_use]
    pub fn tag(name: impl Into<String>) -> Self {
        let name = name.into();
        let version = version_from_name(&name);
        Self::new(ReferenceKind::Tag, name, version)
    }

    #[must_use]
    pub fn release(name: impl Into<String>) -> Self {
        let name = name.into();
        let version = version_from_name(&name);
        Self::new(ReferenceKind::Release, name, version)
    }

    fn new(kind: ReferenceKind, name: String, version: Option<String>) -> Self {
        Self {
            kind,
            name,
            version,
            download_url: None,
            updated: None,
            changelog: None,
            download_count: None,
        }
    }

    #[must_use]
    pub fn with_download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_updated(mut self, updated: Option<String>) -> Self {
        self.updated = updated;
        self
    }

    #[must_use]
    pub fn with_changelog(mut self, changelog: Option<String>) -> Self {
        self.changelog = changelog.filter(|html| !html.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_download_count(mut self, count: Option<u64>) -> Self {
        self.download_count = count;
        self
    }
}

fn version_from_name(name: &str) -> Option<String> {
    looks_like_version(name).then(|| crate::version::strip_version_prefix(name).to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    #[default]
    Plugin,
    Theme,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plugin => write!(f, "plugin"),
            Self::Theme => write!(f, "theme"),
        }
    }
}

/// The normalized result of an update check.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateDescriptor {
    pub kind: ArtifactKind,
    pub slug: String,
    pub name: Option<String>,
    pub version: String,
    pub download_url: Option<String>,
    pub homepage: Option<String>,
    pub last_updated: Option<String>,
    pub requires: Option<String>,
    pub tested: Option<String>,
    pub requires_php: Option<String>,
    pub upgrade_notice: Option<String>,
    pub author: Option<String>,
    pub author_homepage: Option<String>,
    pub download_count: Option<u64>,
    pub sections: BTreeMap<String, String>,
    /// Plugin main file relative to the plugin directory, e.g. `my-plugin/my-plugin.php`.
    pub filename: Option<String>,
    /// Directory name of the installed artifact.
    pub directory_name: Option<String>,
}

impl UpdateDescriptor {
    #[must_use]
    pub fn new(kind: ArtifactKind, slug: impl Into<String>) -> Self {
        Self {
            kind,
            slug: slug.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn changelog(&self) -> Option<&str> {
        self.sections.get(CHANGELOG_SECTION).map(String::as_str)
    }

    /// Whether this descriptor names a version strictly newer than `installed`.
    #[must_use]
    pub fn is_newer_than(&self, installed: &str) -> bool {
        !self.version.is_empty() && is_newer_version(&self.version, installed)
    }
}

/// Persisted record of the last check and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckState {
    pub last_check: Option<DateTime<Utc>>,
    pub checked_version: Option<String>,
    pub update: Option<UpdateDescriptor>,
}

impl CheckState {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.last_check.is_none() && self.checked_version.is_none() && self.update.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_reference_derives_version_from_name() {
        let tag = Reference::tag("v2.0.1");
        assert_eq!(tag.kind, ReferenceKind::Tag);
        assert_eq!(tag.name, "v2.0.1");
        assert_eq!(tag.version.as_deref(), Some("2.0.1"));
    }

    #[test]
    fn non_version_tag_has_no_version() {
        assert_eq!(Reference::tag("latest").version, None);
        assert_eq!(Reference::branch("1.0").version, None);
    }

    #[test]
    fn blank_changelog_is_dropped() {
        let release = Reference::release("1.0").with_changelog(Some("  \n".to_string()));
        assert_eq!(release.changelog, None);
    }

    #[test]
    fn descriptor_is_newer_than_compares_versions() {
        let mut descriptor = UpdateDescriptor::new(ArtifactKind::Plugin, "demo");
        assert!(!descriptor.is_newer_than("1.0"));

        descriptor.version = "2.0".to_string();
        assert!(descriptor.is_newer_than("1.9"));
        assert!(!descriptor.is_newer_than("2.0"));
        assert!(!descriptor.is_newer_than("2.1"));
    }

    #[test]
    fn check_state_deserializes_with_missing_fields() {
        let state: CheckState = serde_json::from_str(r#"{"checked_version":"1.0"}"#)
            .expect("partial state should deserialize");

        assert_eq!(state.checked_version.as_deref(), Some("1.0"));
        assert!(state.last_check.is_none());
        assert!(state.update.is_none());
        assert!(!state.is_empty());
        assert!(CheckState::default().is_empty());
    }

    #[test]
    fn artifact_kind_serializes_lowercase() {
        let json = serde_json::to_string(&ArtifactKind::Theme).expect("serialize kind");
        assert_eq!(json, "\"theme\"");
    }
}
