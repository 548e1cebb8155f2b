use std::collections::BTreeMap;

use puc_backend::{
    ArtifactKind, CHANGELOG_SECTION, DESCRIPTION_SECTION, InstalledArtifact, Reference,
    RepositoryClient, UpdateDescriptor,
};

use crate::header::{header_names, parse_file_header};
use crate::readme::parse_readme;

pub const NO_CHANGELOG_PLACEHOLDER: &str = "There is no changelog available.";

/// Build the update descriptor for `reference`.
///
/// Sources are applied from lowest to highest precedence: the local header
/// (never its version), the reference, the remote main-file header, the
/// remote readme. The changelog file and the latest commit time only fill
/// gaps. Returns `None` when no version could be determined.
pub async fn reconcile(
    client: &dyn RepositoryClient,
    artifact: &dyn InstalledArtifact,
    reference: Reference,
) -> Option<UpdateDescriptor> {
    let kind = artifact.kind();
    let mut descriptor = UpdateDescriptor::new(kind, artifact.slug());
    descriptor.filename = artifact.filename();
    descriptor.directory_name = Some(artifact.directory_name());

    let local_header = artifact.local_header().unwrap_or_default();
    apply_header_fields(&mut descriptor, &local_header, false);

    apply_reference(&mut descriptor, &reference);
    if descriptor.download_url.is_none() {
        descriptor.download_url = Some(client.build_archive_download_url(&reference.name));
    }

    let git_ref = reference.name.as_str();
    if let Some(content) = client.get_file(artifact.main_file_name(), git_ref).await {
        let remote_header = parse_file_header(&content, header_names(kind));
        apply_header_fields(&mut descriptor, &remote_header, true);
    }

    if let Some(readme_name) = artifact.readme_file_name()
        && let Some(content) = client.get_file(&readme_name, git_ref).await
    {
        apply_readme(&mut descriptor, &String::from_utf8_lossy(&content));
    }

    if descriptor.changelog().is_none_or(|html| html.trim().is_empty()) {
        let changelog = client
            .get_changelog(git_ref, Some(artifact.directory()))
            .await
            .unwrap_or_else(|| NO_CHANGELOG_PLACEHOLDER.to_string());
        descriptor
            .sections
            .insert(CHANGELOG_SECTION.to_string(), changelog);
    }

    if descriptor.last_updated.is_none() {
        descriptor.last_updated = client
            .get_latest_commit_time(git_ref, Some(artifact.main_file_name()))
            .await;
    }

    if kind == ArtifactKind::Theme && descriptor.homepage.is_none() {
        descriptor.homepage = Some(client.repository_url().to_string());
    }

    if descriptor.version.trim().is_empty() {
        log::debug!(
            "No version found for {} at {} {}",
            artifact.slug(),
            reference.kind,
            reference.name
        );
        return None;
    }

    Some(descriptor)
}

fn apply_reference(descriptor: &mut UpdateDescriptor, reference: &Reference) {
    if let Some(version) = &reference.version {
        descriptor.version.clone_from(version);
    }
    if reference.download_url.is_some() {
        descriptor.download_url.clone_from(&reference.download_url);
    }
    if reference.updated.is_some() {
        descriptor.last_updated.clone_from(&reference.updated);
    }
    if let Some(changelog) = &reference.changelog {
        descriptor
            .sections
            .insert(CHANGELOG_SECTION.to_string(), changelog.clone());
    }
    if reference.download_count.is_some() {
        descriptor.download_count = reference.download_count;
    }
}

/// Copy non-empty header fields onto `descriptor`, overriding what is there.
pub fn apply_header_fields(
    descriptor: &mut UpdateDescriptor,
    fields: &BTreeMap<String, String>,
    include_version: bool,
) {
    for (field, value) in fields {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let owned = Some(value.to_string());
        match field.as_str() {
            "version" if include_version => descriptor.version = value.to_string(),
            "name" => descriptor.name = owned,
            "homepage" => descriptor.homepage = owned,
            "author" => descriptor.author = owned,
            "author_homepage" => descriptor.author_homepage = owned,
            "requires" => descriptor.requires = owned,
            "tested" => descriptor.tested = owned,
            "requires_php" => descriptor.requires_php = owned,
            "description" => {
                descriptor
                    .sections
                    .insert(DESCRIPTION_SECTION.to_string(), value.to_string());
            }
            _ => {}
        }
    }
}

fn apply_readme(descriptor: &mut UpdateDescriptor, text: &str) {
    let readme = parse_readme(text);

    descriptor.sections.extend(readme.sections);
    if let Some(tested) = readme.tested_up_to.filter(|value| !value.is_empty()) {
        descriptor.tested = Some(tested);
    }
    if let Some(requires) = readme.requires_at_least.filter(|value| !value.is_empty()) {
        descriptor.requires = Some(requires);
    }
    if let Some(notice) = readme.upgrade_notice.get(&descriptor.version) {
        descriptor.upgrade_notice = Some(notice.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeArtifact, MockClient};

    const README: &str = "=== Widget ===\nRequires at least: 6.0\nTested up to: 6.5\n\n== Description ==\nRemote description.\n\n== Upgrade Notice ==\n= 1.0.1 =\nPlease upgrade.\n";

    #[tokio::test]
    async fn remote_header_version_overrides_reference() {
        let dir = tempfile::tempdir().expect("temp dir");
        let client = MockClient::new().with_file("widget.php", "v1.0.0", "/*\nVersion: 1.0.1\n*/");
        let artifact = FakeArtifact::plugin(dir.path(), "0.9");

        let descriptor = reconcile(&client, &artifact, Reference::tag("v1.0.0"))
            .await
            .expect("descriptor should be produced");

        assert_eq!(descriptor.version, "1.0.1");
        assert_eq!(descriptor.slug, "widget");
        assert_eq!(descriptor.filename.as_deref(), Some("widget/widget.php"));
    }

    #[tokio::test]
    async fn changelog_placeholder_when_nothing_found() {
        let dir = tempfile::tempdir().expect("temp dir");
        let client = MockClient::new();
        let artifact = FakeArtifact::plugin(dir.path(), "0.9");

        let descriptor = reconcile(&client, &artifact, Reference::tag("v1.0"))
            .await
            .expect("descriptor should be produced");

        assert_eq!(descriptor.changelog(), Some(NO_CHANGELOG_PLACEHOLDER));
        assert!(client.was_called("get_latest_commit_time"));
    }

    #[tokio::test]
    async fn commit_time_follows_main_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let client = MockClient::new().with_commit_time("v1.0", "2024-02-02T00:00:00Z");
        let artifact = FakeArtifact::plugin(dir.path(), "0.9");

        let descriptor = reconcile(&client, &artifact, Reference::tag("v1.0"))
            .await
            .expect("descriptor should be produced");

        assert_eq!(descriptor.last_updated.as_deref(), Some("2024-02-02T00:00:00Z"));
        assert_eq!(client.commit_paths(), vec!["widget.php".to_string()]);
    }

    #[tokio::test]
    async fn changelog_file_is_used_when_readme_has_none() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("CHANGES.md"), "local").expect("write changelog");
        let client = MockClient::new().with_file("CHANGES.md", "v1.0", "# 1.0\n\nRemote notes");
        let artifact = FakeArtifact::plugin(dir.path(), "0.9");

        let descriptor = reconcile(&client, &artifact, Reference::tag("v1.0"))
            .await
            .expect("descriptor should be produced");

        let changelog = descriptor.changelog().expect("changelog should be set");
        assert!(changelog.contains("Remote notes"));
    }

    #[tokio::test]
    async fn release_changelog_and_timestamp_are_kept() {
        let dir = tempfile::tempdir().expect("temp dir");
        let client = MockClient::new().with_commit_time("v2.0", "2024-01-01T00:00:00Z");
        let artifact = FakeArtifact::plugin(dir.path(), "1.0");
        let release = Reference::release("v2.0")
            .with_updated(Some("2024-05-01T12:00:00Z".to_string()))
            .with_changelog(Some("<p>Release notes</p>".to_string()))
            .with_download_count(Some(42));

        let descriptor = reconcile(&client, &artifact, release)
            .await
            .expect("descriptor should be produced");

        assert_eq!(descriptor.version, "2.0");
        assert_eq!(descriptor.changelog(), Some("<p>Release notes</p>"));
        assert_eq!(descriptor.last_updated.as_deref(), Some("2024-05-01T12:00:00Z"));
        assert_eq!(descriptor.download_count, Some(42));
        assert!(!client.was_called("get_latest_commit_time"));
    }

    #[tokio::test]
    async fn readme_fields_merge_into_descriptor() {
        let dir = tempfile::tempdir().expect("temp dir");
        let client = MockClient::new()
            .with_file(
                "widget.php",
                "v1.0.1",
                "/*\nVersion: 1.0.1\nDescription: Header description\nRequires at least: 5.0\n*/",
            )
            .with_file("readme.txt", "v1.0.1", README);
        let artifact = FakeArtifact::plugin(dir.path(), "1.0").with_readme("readme.txt");

        let descriptor = reconcile(&client, &artifact, Reference::tag("v1.0.1"))
            .await
            .expect("descriptor should be produced");

        assert_eq!(descriptor.requires.as_deref(), Some("6.0"));
        assert_eq!(descriptor.tested.as_deref(), Some("6.5"));
        assert_eq!(descriptor.upgrade_notice.as_deref(), Some("Please upgrade."));
        assert!(descriptor.sections["description"].contains("Remote description."));
        assert_eq!(descriptor.changelog(), Some(NO_CHANGELOG_PLACEHOLDER));
    }

    #[tokio::test]
    async fn readme_is_not_fetched_without_local_copy() {
        let dir = tempfile::tempdir().expect("temp dir");
        let client = MockClient::new().with_file("readme.txt", "v1.0", README);
        let artifact = FakeArtifact::plugin(dir.path(), "0.9");

        let descriptor = reconcile(&client, &artifact, Reference::tag("v1.0"))
            .await
            .expect("descriptor should be produced");

        assert_eq!(descriptor.tested, None);
    }

    #[tokio::test]
    async fn local_header_seeds_metadata_but_not_version() {
        let dir = tempfile::tempdir().expect("temp dir");
        let client = MockClient::new().with_branch("develop");
        let artifact = FakeArtifact::plugin(dir.path(), "1.0")
            .with_header("homepage", "https://example.com/widget")
            .with_header("author", "Acme");

        let descriptor = reconcile(&client, &artifact, Reference::branch("develop")).await;

        assert_eq!(descriptor, None);

        let client = MockClient::new().with_file("widget.php", "develop", "Version: 1.1-beta");
        let descriptor = reconcile(&client, &artifact, Reference::branch("develop"))
            .await
            .expect("remote header supplies the version");

        assert_eq!(descriptor.version, "1.1-beta");
        assert_eq!(descriptor.name.as_deref(), Some("Widget"));
        assert_eq!(descriptor.homepage.as_deref(), Some("https://example.com/widget"));
        assert_eq!(descriptor.author.as_deref(), Some("Acme"));
        assert_eq!(
            descriptor.download_url.as_deref(),
            Some("https://example.com/acme/widget/archive/develop.zip")
        );
    }

    #[tokio::test]
    async fn theme_homepage_falls_back_to_repository() {
        let dir = tempfile::tempdir().expect("temp dir");
        let client = MockClient::new().with_file("style.css", "v3.0", "/*\nTheme Name: Twenty\n*/");
        let artifact = FakeArtifact::theme(dir.path(), "2.0");

        let descriptor = reconcile(&client, &artifact, Reference::tag("v3.0"))
            .await
            .expect("descriptor should be produced");

        assert_eq!(descriptor.kind, ArtifactKind::Theme);
        assert_eq!(descriptor.version, "3.0");
        assert_eq!(descriptor.filename, None);
        assert_eq!(descriptor.homepage.as_deref(), Some("https://example.com/acme/widget"));
    }
}
