use puc_backend::{BackendError, Reference, RepositoryClient};

/// Stable-tag value that means "use the branch itself".
const TRUNK: &str = "trunk";

/// Pick the reference that represents the latest version.
///
/// Strategies, first hit wins:
/// 1. a stable-tag hint naming a tag (a hint equal to `branch` or `trunk`
///    opts out of tags and selects the branch right away),
/// 2. on the default branch, the latest release (hosts with releases only)
///    and then the latest version-like tag,
/// 3. the branch itself.
///
/// `Ok(None)` means nothing could be resolved, which is expected on network
/// trouble or an empty repository.
///
/// # Errors
/// Propagates contract violations from [`RepositoryClient::get_tag`].
pub async fn select_reference(
    client: &dyn RepositoryClient,
    branch: &str,
    stable_tag_hint: Option<&str>,
) -> Result<Option<Reference>, BackendError> {
    if let Some(hint) = stable_tag_hint.map(str::trim).filter(|hint| !hint.is_empty()) {
        if hint == branch || hint == TRUNK {
            log::debug!("Stable tag \"{hint}\" selects branch {branch}");
            return Ok(client.get_branch(branch).await);
        }

        if client.capabilities().supports_tag_lookup {
            if let Some(tag) = client.get_tag(hint).await? {
                log::debug!("Using stable tag {}", tag.name);
                return Ok(Some(tag));
            }
        } else {
            log::debug!(
                "{} cannot look up single tags; ignoring stable tag \"{hint}\"",
                client.name()
            );
        }
    }

    if client.is_default_branch(branch) {
        if client.capabilities().supports_releases
            && let Some(release) = client.get_latest_release().await
        {
            log::debug!("Using latest release {}", release.name);
            return Ok(Some(release));
        }
        if let Some(tag) = client.get_latest_tag().await {
            log::debug!("Using latest tag {}", tag.name);
            return Ok(Some(tag));
        }
    }

    Ok(client.get_branch(branch).await)
}
