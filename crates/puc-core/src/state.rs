use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use puc_backend::{CheckState, UpdateDescriptor};

use crate::error::CheckError;

/// Persists the [`CheckState`] of one artifact as a JSON file.
#[derive(Debug, Clone)]
pub struct UpdateStateStore {
    path: PathBuf,
}

impl UpdateStateStore {
    /// Store for `slug` inside `state_dir`, named `external_updates-<slug>.json`.
    #[must_use]
    pub fn new(state_dir: &Path, slug: &str) -> Self {
        Self {
            path: state_dir.join(format!("external_updates-{slug}.json")),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted state. Missing or unreadable state is empty.
    #[must_use]
    pub fn load(&self) -> CheckState {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(error) => {
                if error.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Could not read update state {}: {error}", self.path.display());
                }
                return CheckState::default();
            }
        };

        serde_json::from_str(&data).unwrap_or_else(|error| {
            log::warn!("Ignoring corrupt update state {}: {error}", self.path.display());
            CheckState::default()
        })
    }

    /// Record that a check is about to start. Written before any network
    /// request so an interrupted check still counts as an attempt.
    pub fn record_check_started(&self, installed_version: &str, now: DateTime<Utc>) -> CheckState {
        let mut state = self.load();
        state.last_check = Some(now);
        state.checked_version = Some(installed_version.to_string());
        self.save(&state);
        state
    }

    /// Store the outcome of a check, replacing any cached descriptor.
    pub fn record_result(&self, update: Option<UpdateDescriptor>) -> CheckState {
        let mut state = self.load();
        state.update = update;
        self.save(&state);
        state
    }

    /// The cached descriptor, if it is newer than `installed_version`.
    ///
    /// The cache itself is left alone, so a later downgrade makes an old
    /// descriptor applicable again without a new check.
    #[must_use]
    pub fn get_applicable_update(&self, installed_version: &str) -> Option<UpdateDescriptor> {
        self.load()
            .update
            .filter(|update| update.is_newer_than(installed_version))
    }

    /// Delete the persisted state.
    ///
    /// # Errors
    /// Returns an error if the state file exists but cannot be removed.
    pub fn reset(&self) -> Result<(), CheckError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CheckError::State {
                action: "reset",
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn save(&self, state: &CheckState) {
        let result = serde_json::to_vec_pretty(state)
            .map_err(std::io::Error::other)
            .and_then(|data| {
                if let Some(parent) = self.path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                write_atomic(&self.path, &data)
            });

        if let Err(error) = result {
            log::warn!("Could not save update state {}: {error}", self.path.display());
        }
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "state path has no parent")
    })?;

    let file_name = path
        .file_name()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("state");
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    let pid = std::process::id();

    let mut tmp_path = None;
    for attempt in 0..16_u8 {
        let candidate = parent.join(format!(".{file_name}.{pid}.{timestamp}.{attempt}.tmp"));
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(mut file) => {
                file.write_all(data)?;
                file.sync_all()?;
                tmp_path = Some(candidate);
                break;
            }
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(error) => return Err(error),
        }
    }

    let Some(tmp_path) = tmp_path else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "failed to create unique state temp file",
        ));
    };

    if let Err(error) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(error);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use puc_backend::ArtifactKind;

    use super::*;

    fn descriptor(version: &str) -> UpdateDescriptor {
        UpdateDescriptor {
            version: version.to_string(),
            download_url: Some(format!("https://example.com/{version}.zip")),
            ..UpdateDescriptor::new(ArtifactKind::Plugin, "widget")
        }
    }

    #[test]
    fn missing_or_corrupt_state_loads_empty() {
        let temp = tempfile::tempdir().expect("temp dir");
        let store = UpdateStateStore::new(temp.path(), "widget");

        assert!(store.load().is_empty());

        std::fs::write(store.path(), "{not-json").expect("write corrupt state");
        assert!(store.load().is_empty());
    }

    #[test]
    fn check_start_is_recorded_before_result() {
        let temp = tempfile::tempdir().expect("temp dir");
        let store = UpdateStateStore::new(temp.path(), "widget");
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().expect("valid time");

        store.record_check_started("1.0", now);
        let started = store.load();
        assert_eq!(started.last_check, Some(now));
        assert_eq!(started.checked_version.as_deref(), Some("1.0"));
        assert!(started.update.is_none());

        store.record_result(Some(descriptor("2.0")));
        let finished = store.load();
        assert_eq!(finished.last_check, Some(now));
        assert_eq!(finished.update.map(|u| u.version).as_deref(), Some("2.0"));
    }

    #[test]
    fn applicability_is_re_evaluated_on_every_read() {
        let temp = tempfile::tempdir().expect("temp dir");
        let store = UpdateStateStore::new(temp.path(), "widget");
        store.record_result(Some(descriptor("2.0")));

        assert_eq!(store.get_applicable_update("2.0"), None);
        assert_eq!(
            store.get_applicable_update("1.9").map(|u| u.version),
            Some("2.0".to_string())
        );
        assert!(store.load().update.is_some());
    }

    #[test]
    fn reset_removes_state_and_tolerates_missing_file() {
        let temp = tempfile::tempdir().expect("temp dir");
        let store = UpdateStateStore::new(temp.path(), "widget");
        store.record_result(Some(descriptor("2.0")));

        store.reset().expect("reset should succeed");
        assert!(!store.path().exists());
        store.reset().expect("second reset should succeed");
    }

    #[test]
    fn save_creates_directory_and_leaves_no_temp_files() {
        let temp = tempfile::tempdir().expect("temp dir");
        let store = UpdateStateStore::new(&temp.path().join("nested/state"), "widget");

        store.record_result(Some(descriptor("1.1")));
        store.record_result(None);

        assert!(store.load().update.is_none());
        let leftovers = std::fs::read_dir(temp.path().join("nested/state"))
            .expect("read state dir")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }
}
