use crate::notification::NotificationError;
use chrono::NaiveDate;
use thiserror::Error;

/// Cycle quotidien : Unscheduled → Scheduled → Stale → (passe) → …
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScheduleState {
    #[default]
    Unscheduled,
    Scheduled,
    /// Les notifications en attente ne reflètent plus les entrées (date,
    /// réglages ou journée de prière ont changé).
    Stale,
}

/// Ce qui a déclenché une passe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTrigger {
    Enabled,
    SettingsChanged,
    PrayerSetChanged,
    Midnight,
    /// Marqueur persisté différent d'aujourd'hui (relance de l'app).
    StaleMarker,
    Manual,
    Disabled,
}

/// Bilan d'une passe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub trigger: PassTrigger,
    pub date: NaiveDate,
    pub scheduled: usize,
    /// Notifications dont l'instant est déjà passé (jamais planifiées).
    pub dropped_past: usize,
    /// Échecs du backend, notification sautée.
    pub failed: usize,
}

#[derive(Error, Debug)]
pub enum SchedError {
    #[error("notification permission denied")]
    PermissionDenied,
    #[error("reminder offset {0} out of range [5, 60] minutes")]
    InvalidReminderOffset(u32),
    #[error(transparent)]
    Backend(NotificationError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<NotificationError> for SchedError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::PermissionDenied => SchedError::PermissionDenied,
            other => SchedError::Backend(other),
        }
    }
}
