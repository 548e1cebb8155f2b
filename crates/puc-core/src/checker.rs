use std::fmt;

use chrono::Utc;
use puc_backend::{ArtifactKind, CheckState, InstalledArtifact, UpdateDescriptor, UpdateSource};

use crate::error::CheckError;
use crate::scheduler::Scheduler;
use crate::state::UpdateStateStore;

/// Outcome of a manual "check now" request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManualCheckStatus {
    UpToDate,
    UpdateAvailable,
    Unknown(String),
}

impl ManualCheckStatus {
    /// Parse the status value carried in a result query string.
    #[must_use]
    pub fn from_query(value: &str) -> Self {
        match value {
            "no_update" => Self::UpToDate,
            "update_available" => Self::UpdateAvailable,
            other => Self::Unknown(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_query(&self) -> &str {
        match self {
            Self::UpToDate => "no_update",
            Self::UpdateAvailable => "update_available",
            Self::Unknown(value) => value.as_str(),
        }
    }

    #[must_use]
    pub fn message(&self, kind: ArtifactKind) -> String {
        match self {
            Self::UpToDate => format!("This {kind} is up to date."),
            Self::UpdateAvailable => format!("A new version of this {kind} is available."),
            Self::Unknown(status) => format!("Unknown update checker status \"{status}\""),
        }
    }
}

impl fmt::Display for ManualCheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

/// Checks one installed artifact against one update source and keeps the
/// result in an [`UpdateStateStore`].
pub struct UpdateChecker {
    source: Box<dyn UpdateSource>,
    artifact: Box<dyn InstalledArtifact>,
    store: UpdateStateStore,
    scheduler: Scheduler,
}

impl UpdateChecker {
    pub fn new(
        source: Box<dyn UpdateSource>,
        artifact: Box<dyn InstalledArtifact>,
        store: UpdateStateStore,
    ) -> Self {
        Self {
            source,
            artifact,
            store,
            scheduler: Scheduler::default(),
        }
    }

    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    #[must_use]
    pub fn artifact(&self) -> &dyn InstalledArtifact {
        self.artifact.as_ref()
    }

    #[must_use]
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Run a full check and return the update, if one applies.
    ///
    /// An artifact whose installed version cannot be read is skipped.
    ///
    /// # Errors
    /// Returns an error only for contract violations raised by the source.
    pub async fn check_for_updates(&self) -> Result<Option<UpdateDescriptor>, CheckError> {
        let slug = self.artifact.slug();
        let Some(installed) = self.artifact.installed_version() else {
            log::warn!("Skipping update check for {slug} - installed version unknown.");
            return Ok(None);
        };

        self.store.record_check_started(&installed, Utc::now());
        log::info!(
            "Checking {} for updates to {slug} {installed}",
            self.source.name()
        );

        let update = self.source.request_update(self.artifact.as_ref()).await?;
        match &update {
            Some(found) => log::info!("Latest {slug} version is {}", found.version),
            None => log::info!("No update information for {slug}"),
        }
        self.store.record_result(update);

        Ok(self.get_update())
    }

    /// The cached update, if it is newer than what is installed right now.
    /// The download URL is signed on the way out.
    #[must_use]
    pub fn get_update(&self) -> Option<UpdateDescriptor> {
        let installed = self.artifact.installed_version()?;
        let mut update = self.store.get_applicable_update(&installed)?;
        if let Some(url) = update.download_url.as_deref().filter(|url| !url.is_empty()) {
            update.download_url = Some(self.source.sign_download_url(url));
        }
        Some(update)
    }

    #[must_use]
    pub fn get_update_state(&self) -> CheckState {
        self.store.load()
    }

    /// Forget everything recorded for this artifact.
    ///
    /// # Errors
    /// Returns an error if the state file cannot be removed.
    pub fn reset_update_state(&self) -> Result<(), CheckError> {
        self.store.reset()
    }

    /// Run a check only when the scheduler says one is due. Returns whether
    /// a check ran.
    ///
    /// # Errors
    /// Same as [`UpdateChecker::check_for_updates`].
    pub async fn maybe_check_for_updates(&self) -> Result<bool, CheckError> {
        let installed = self.artifact.installed_version().unwrap_or_default();
        let state = self.store.load();
        if !self.scheduler.should_check(&state, &installed, Utc::now()) {
            log::debug!("Update check for {} is not due yet", self.artifact.slug());
            return Ok(false);
        }

        self.check_for_updates().await?;
        Ok(true)
    }

    /// Check immediately and summarize the result for a person.
    ///
    /// # Errors
    /// Same as [`UpdateChecker::check_for_updates`].
    pub async fn check_now(&self) -> Result<ManualCheckStatus, CheckError> {
        let update = self.check_for_updates().await?;
        Ok(if update.is_some() {
            ManualCheckStatus::UpdateAvailable
        } else {
            ManualCheckStatus::UpToDate
        })
    }
}
