use chrono::{DateTime, TimeDelta, Utc};
use puc_backend::CheckState;

pub const DEFAULT_CHECK_PERIOD_HOURS: u64 = 12;
pub const DEFAULT_THROTTLED_CHECK_PERIOD_HOURS: u64 = 72;

/// Decides when an automatic check is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduler {
    check_period: Option<TimeDelta>,
    throttled_period: Option<TimeDelta>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(DEFAULT_CHECK_PERIOD_HOURS)
    }
}

impl Scheduler {
    /// A period of zero hours disables automatic checks.
    #[must_use]
    pub fn new(check_period_hours: u64) -> Self {
        Self {
            check_period: period(check_period_hours),
            throttled_period: None,
        }
    }

    /// Check less often while an update is already known to be available.
    #[must_use]
    pub fn with_throttling(mut self, throttled_period_hours: u64) -> Self {
        self.throttled_period = period(throttled_period_hours);
        self
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.check_period.is_some()
    }

    /// Whether a check should run for the given state.
    ///
    /// Due when nothing was recorded yet, when the installed version differs
    /// from the one last checked, or when the effective period has elapsed.
    #[must_use]
    pub fn should_check(&self, state: &CheckState, installed_version: &str, now: DateTime<Utc>) -> bool {
        let Some(check_period) = self.check_period else {
            return false;
        };
        let Some(last_check) = state.last_check else {
            return true;
        };
        if state.checked_version.as_deref() != Some(installed_version) {
            return true;
        }

        let update_pending = state
            .update
            .as_ref()
            .is_some_and(|update| update.is_newer_than(installed_version));
        let effective = match self.throttled_period {
            Some(throttled) if update_pending => throttled,
            _ => check_period,
        };

        now.signed_duration_since(last_check) >= effective
    }
}

fn period(hours: u64) -> Option<TimeDelta> {
    if hours == 0 {
        return None;
    }
    let hours = i64::try_from(hours).unwrap_or(i64::MAX);
    Some(TimeDelta::try_hours(hours).unwrap_or(TimeDelta::MAX))
}
