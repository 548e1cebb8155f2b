//! Update-check decision logic.
//!
//! This crate ties the pieces together:
//! - reference selection (stable tag, release, latest tag, branch),
//! - reconciling the selected reference with remote headers and readme data,
//! - the flat JSON metadata feed,
//! - installed plugin/theme artifacts and their header parsing,
//! - persisted check state, scheduling and the [`UpdateChecker`] facade.

mod artifact;
mod checker;
mod error;
pub mod header;
mod metadata;
pub mod readme;
mod reconciler;
mod scheduler;
mod selector;
mod state;
mod vcs;

#[cfg(test)]
mod test_support;

pub use artifact::{PluginArtifact, ThemeArtifact, detect_artifact};
pub use checker::{ManualCheckStatus, UpdateChecker};
pub use error::CheckError;
pub use metadata::{FeedDocument, MetadataFeed};
pub use reconciler::{NO_CHANGELOG_PLACEHOLDER, apply_header_fields, reconcile};
pub use scheduler::{DEFAULT_CHECK_PERIOD_HOURS, DEFAULT_THROTTLED_CHECK_PERIOD_HOURS, Scheduler};
pub use selector::select_reference;
pub use state::UpdateStateStore;
pub use vcs::{DEFAULT_BRANCH, VcsUpdateSource};
