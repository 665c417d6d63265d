use crate::model::{NotificationId, NotificationKind, NotificationTask, PrayerEvent};
use crate::storage::write_atomic;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("notification permission denied")]
    PermissionDenied,
    #[error("notification backend error: {0}")]
    Backend(String),
}

impl From<anyhow::Error> for NotificationError {
    fn from(err: anyhow::Error) -> Self {
        NotificationError::Backend(format!("{err:#}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

/// Primitives de la plateforme de notifications locales.
#[async_trait]
pub trait NotificationBackend: Send + Sync {
    /// Statut courant, sans solliciter l'utilisateur.
    async fn permission_status(&self) -> Result<PermissionStatus, NotificationError>;
    /// Demande la permission (peut afficher une invite).
    async fn request_permission(&self) -> Result<PermissionStatus, NotificationError>;
    async fn schedule(&self, task: NotificationTask) -> Result<NotificationId, NotificationError>;
    /// Annule toutes les notifications en attente émises par l'application.
    async fn cancel_all(&self) -> Result<(), NotificationError>;
    async fn list(&self) -> Result<Vec<NotificationTask>, NotificationError>;
}

/// Permet de customiser le texte des notifications (langue, ton).
pub trait NotificationRenderer: Send + Sync {
    fn at_time(&self, prayer: &PrayerEvent) -> (String, String);
    fn reminder(&self, prayer: &PrayerEvent, minutes_before: u32) -> (String, String);
}

/// Textes par défaut.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextNotification;

impl NotificationRenderer for TextNotification {
    fn at_time(&self, prayer: &PrayerEvent) -> (String, String) {
        (
            format!("Time for {}", prayer.name),
            format!("It is now time for the {} prayer.", prayer.name),
        )
    }

    fn reminder(&self, prayer: &PrayerEvent, minutes_before: u32) -> (String, String) {
        (
            format!("{} is soon", prayer.name),
            format!("{minutes_before} minutes remaining until {}.", prayer.name),
        )
    }
}

/// Construit une tâche pour `prayer`, ou `None` si elle tomberait à `now` ou avant.
pub fn prepare_task(
    prayer: &PrayerEvent,
    kind: NotificationKind,
    minutes_before: u32,
    now: DateTime<Utc>,
    renderer: &dyn NotificationRenderer,
) -> Option<NotificationTask> {
    let (fires_at, (title, body)) = match kind {
        NotificationKind::AtTime => (prayer.instant, renderer.at_time(prayer)),
        NotificationKind::Reminder => (
            prayer.instant - Duration::minutes(i64::from(minutes_before)),
            renderer.reminder(prayer, minutes_before),
        ),
    };
    if fires_at <= now {
        return None;
    }
    Some(NotificationTask {
        prayer: prayer.name,
        kind,
        fires_at,
        channel: kind.channel(),
        title,
        body,
    })
}

#[derive(Debug)]
struct MemoryState {
    permission: PermissionStatus,
    grant_on_request: bool,
    pending: BTreeMap<String, NotificationTask>,
    failing: HashSet<(crate::model::PrayerName, NotificationKind)>,
    cancel_calls: usize,
}

/// Backend en mémoire ; injection d'échecs pour les tests.
#[derive(Debug)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Permission indéterminée, accordée à la demande.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                permission: PermissionStatus::Undetermined,
                grant_on_request: true,
                pending: BTreeMap::new(),
                failing: HashSet::new(),
                cancel_calls: 0,
            }),
        }
    }

    /// L'utilisateur refusera toute demande de permission.
    pub fn denying() -> Self {
        let backend = Self::new();
        backend.lock().grant_on_request = false;
        backend
    }

    /// Retire la permission (réglages système).
    pub fn revoke_permission(&self) {
        let mut state = self.lock();
        state.permission = PermissionStatus::Denied;
        state.grant_on_request = false;
    }

    /// Fait échouer `schedule` pour ce couple (prière, type).
    pub fn fail_for(&self, prayer: crate::model::PrayerName, kind: NotificationKind) {
        self.lock().failing.insert((prayer, kind));
    }

    pub fn cancel_calls(&self) -> usize {
        self.lock().cancel_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl NotificationBackend for MemoryBackend {
    async fn permission_status(&self) -> Result<PermissionStatus, NotificationError> {
        Ok(self.lock().permission)
    }

    async fn request_permission(&self) -> Result<PermissionStatus, NotificationError> {
        let mut state = self.lock();
        if state.permission == PermissionStatus::Undetermined || state.grant_on_request {
            state.permission = if state.grant_on_request {
                PermissionStatus::Granted
            } else {
                PermissionStatus::Denied
            };
        }
        Ok(state.permission)
    }

    async fn schedule(&self, task: NotificationTask) -> Result<NotificationId, NotificationError> {
        let mut state = self.lock();
        if state.permission != PermissionStatus::Granted {
            return Err(NotificationError::PermissionDenied);
        }
        if state.failing.contains(&(task.prayer, task.kind)) {
            return Err(NotificationError::Backend(format!(
                "refused {:?} for {}",
                task.kind, task.prayer
            )));
        }
        let id = NotificationId::random();
        state.pending.insert(id.as_str().to_string(), task);
        Ok(id)
    }

    async fn cancel_all(&self) -> Result<(), NotificationError> {
        let mut state = self.lock();
        state.pending.clear();
        state.cancel_calls += 1;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<NotificationTask>, NotificationError> {
        let mut tasks: Vec<NotificationTask> = self.lock().pending.values().cloned().collect();
        tasks.sort_by_key(|t| t.fires_at);
        Ok(tasks)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OutboxEntry {
    id: NotificationId,
    #[serde(flatten)]
    task: NotificationTask,
}

/// File d'attente JSON sur disque, consommée par un démon de livraison externe.
/// La permission est toujours accordée.
pub struct JsonOutboxBackend {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonOutboxBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> anyhow::Result<Vec<OutboxEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read(&self.path).with_context(|| format!("reading {}", self.path.display()))?;
        serde_json::from_slice(&data).with_context(|| format!("parsing {}", self.path.display()))
    }

    fn save(&self, entries: &[OutboxEntry]) -> anyhow::Result<()> {
        write_atomic(&self.path, &serde_json::to_vec_pretty(entries)?)
    }
}

#[async_trait]
impl NotificationBackend for JsonOutboxBackend {
    async fn permission_status(&self) -> Result<PermissionStatus, NotificationError> {
        Ok(PermissionStatus::Granted)
    }

    async fn request_permission(&self) -> Result<PermissionStatus, NotificationError> {
        Ok(PermissionStatus::Granted)
    }

    async fn schedule(&self, task: NotificationTask) -> Result<NotificationId, NotificationError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut entries = self.load()?;
        let id = NotificationId::random();
        entries.push(OutboxEntry { id: id.clone(), task });
        entries.sort_by_key(|e| e.task.fires_at);
        self.save(&entries)?;
        Ok(id)
    }

    async fn cancel_all(&self) -> Result<(), NotificationError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.save(&[])?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<NotificationTask>, NotificationError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(self.load()?.into_iter().map(|e| e.task).collect())
    }
}
