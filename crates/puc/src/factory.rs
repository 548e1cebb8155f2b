//! Builds an [`UpdateChecker`] from settings: picks the update source from
//! the metadata URL and the installed artifact from its path.

use std::path::Path;
use std::time::Duration;

use puc_backend::{InstalledArtifact, RepositoryClient, UpdateSource};
use puc_bitbucket::{BitBucketClient, OAuthSigner};
use puc_core::{
    MetadataFeed, Scheduler, UpdateChecker, UpdateStateStore, VcsUpdateSource, detect_artifact,
};
use puc_gitea::GiteaClient;
use puc_github::GitHubClient;
use puc_gitlab::GitLabClient;

use crate::error::AppError;
use crate::service_kind::ServiceKind;
use crate::settings::{Authentication, CheckerSettings};

/// Guess the service behind `metadata_url`. Only `/<user>/<repo>` URLs on
/// the public hosts are recognized; everything else is a JSON feed.
pub fn detect_service(metadata_url: &str) -> ServiceKind {
    let Ok(url) = url::Url::parse(metadata_url.trim()) else {
        return ServiceKind::Json;
    };
    let Some(kind) = url.host_str().and_then(ServiceKind::from_public_host) else {
        return ServiceKind::Json;
    };

    let segments = url
        .path_segments()
        .map_or(0, |parts| parts.filter(|part| !part.is_empty()).count());
    if segments == 2 { kind } else { ServiceKind::Json }
}

pub fn resolve_service(settings: &CheckerSettings) -> ServiceKind {
    settings
        .service
        .unwrap_or_else(|| detect_service(&settings.metadata_url))
}

fn auth_fits(kind: ServiceKind, auth: &Authentication) -> bool {
    matches!(
        (kind, auth),
        (ServiceKind::BitBucket, Authentication::OAuth { .. })
            | (
                ServiceKind::GitHub | ServiceKind::GitLab | ServiceKind::Gitea,
                Authentication::Token(_)
            )
    )
}

fn repository(client: impl RepositoryClient + 'static, branch: &str) -> Box<dyn UpdateSource> {
    Box::new(VcsUpdateSource::new(Box::new(client), branch))
}

/// # Errors
/// Returns an error when the URL does not name a repository on the chosen
/// host.
pub fn build_source(settings: &CheckerSettings) -> Result<Box<dyn UpdateSource>, AppError> {
    let kind = resolve_service(settings);
    let url = settings.metadata_url.trim();
    let timeout = Duration::from_secs(settings.http_timeout_secs);
    let token = settings.access_token();
    let branch = settings.branch.as_str();

    if let Some(auth) = &settings.authentication
        && !auth_fits(kind, auth)
    {
        log::warn!("Ignoring authentication settings that {kind} cannot use");
    }

    let source = match kind {
        ServiceKind::Json => Box::new(MetadataFeed::new(url, timeout)) as Box<dyn UpdateSource>,
        ServiceKind::GitHub => repository(GitHubClient::new(url, token, timeout)?, branch),
        ServiceKind::GitLab => repository(GitLabClient::new(url, token, timeout)?, branch),
        ServiceKind::Gitea => repository(GiteaClient::new(url, token, timeout)?, branch),
        ServiceKind::BitBucket => {
            let oauth = match &settings.authentication {
                Some(Authentication::OAuth {
                    consumer_key,
                    consumer_secret,
                }) => Some(OAuthSigner::new(consumer_key.as_str(), consumer_secret.as_str())),
                _ => None,
            };
            repository(BitBucketClient::new(url, oauth, timeout)?, branch)
        }
    };

    log::debug!("Using {kind} update source for {url}");
    Ok(source)
}

/// # Errors
/// Returns [`puc_core::CheckError::UnknownArtifact`] when the path is under
/// neither a plugin directory nor the theme root.
pub fn build_artifact(settings: &CheckerSettings) -> Result<Box<dyn InstalledArtifact>, AppError> {
    Ok(detect_artifact(
        &settings.artifact_path,
        &settings.plugin_dirs,
        settings.theme_root.as_deref(),
        settings.slug.clone(),
    )?)
}

/// Put the source, artifact, state store and scheduler together.
///
/// # Errors
/// Returns an error for incomplete settings, an unrecognized artifact or a
/// repository URL the host client rejects.
pub fn build_checker(settings: &CheckerSettings, default_state_dir: &Path) -> Result<UpdateChecker, AppError> {
    settings.validate()?;

    let artifact = build_artifact(settings)?;
    let source = build_source(settings)?;
    let state_dir = settings.state_dir.as_deref().unwrap_or(default_state_dir);
    let store = UpdateStateStore::new(state_dir, artifact.slug());

    let mut scheduler = Scheduler::new(settings.check_period_hours);
    if settings.throttle_redundant_checks {
        scheduler = scheduler.with_throttling(settings.throttled_check_period_hours);
    }

    Ok(UpdateChecker::new(source, artifact, store).with_scheduler(scheduler))
}
