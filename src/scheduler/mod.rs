//! Planification des rappels de prière.
//!
//! Chaque passe annule toutes les notifications en attente puis replanifie
//! la journée (sémantique de remplacement complet). Les passes sont
//! sérialisées par le verrou de `inner` : un déclencheur qui arrive pendant
//! une passe attend qu'elle se termine, puis lance la sienne.

pub mod midnight;
mod pass;
mod types;

pub use midnight::MidnightRefresh;
pub use types::{PassReport, PassTrigger, SchedError, ScheduleState};

use crate::clock::Clock;
use crate::model::{
    DailyPrayerSet, NotificationSettings, NotificationTask, PrayerEvent, PrayerName, ScheduleMarker,
};
use crate::notification::{NotificationBackend, NotificationRenderer, PermissionStatus, TextNotification};
use crate::settings::NotificationSettingsStore;
use crate::storage::{KeyValueStore, KEY_LAST_SCHEDULED_DATE};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub(crate) struct Inner {
    state: ScheduleState,
    settings: NotificationSettings,
    prayers: Option<DailyPrayerSet>,
    /// Tahajjud de la nuit en cours, hérité de la journée précédente.
    night_carry: Option<PrayerEvent>,
}

impl Inner {
    /// Remplace la journée ; passer à une date plus récente garde le Tahajjud
    /// de l'ancienne, qui tombe encore pendant la nuit en cours.
    fn replace_prayers(&mut self, set: DailyPrayerSet) {
        if let Some(previous) = self.prayers.take() {
            if previous.date < set.date {
                self.night_carry = previous.get(PrayerName::Tahajjud).cloned();
            }
        }
        self.prayers = Some(set);
    }
}

pub struct NotificationScheduler {
    backend: Arc<dyn NotificationBackend>,
    store: Arc<dyn KeyValueStore>,
    settings_store: NotificationSettingsStore,
    clock: Arc<dyn Clock>,
    renderer: Arc<dyn NotificationRenderer>,
    inner: Mutex<Inner>,
}

impl NotificationScheduler {
    pub fn new(
        backend: Arc<dyn NotificationBackend>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backend,
            settings_store: NotificationSettingsStore::new(store.clone()),
            store,
            clock,
            renderer: Arc::new(TextNotification),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn NotificationRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub async fn state(&self) -> ScheduleState {
        self.inner.lock().await.state
    }

    pub async fn settings(&self) -> NotificationSettings {
        self.inner.lock().await.settings
    }

    pub async fn prayers(&self) -> Option<DailyPrayerSet> {
        self.inner.lock().await.prayers.clone()
    }

    /// Notifications actuellement en attente dans le backend.
    pub async fn pending(&self) -> Result<Vec<NotificationTask>, SchedError> {
        Ok(self.backend.list().await?)
    }

    /// Charge les réglages persistés. Un `enabled` persisté ne tient que si
    /// la permission est toujours accordée ; sinon il est désactivé, persisté
    /// comme tel, et les notifications restantes sont annulées.
    pub async fn load(&self) -> Result<NotificationSettings, SchedError> {
        let mut settings = self.settings_store.load().await?;
        if settings.enabled {
            let status = self.backend.permission_status().await?;
            if status != PermissionStatus::Granted {
                tracing::info!(?status, "notification permission no longer granted");
                settings.enabled = false;
                self.settings_store.save_enabled(false).await?;
                self.backend.cancel_all().await?;
            }
        }
        let mut inner = self.inner.lock().await;
        inner.settings = settings;
        inner.state = ScheduleState::Unscheduled;
        Ok(settings)
    }

    /// Active les notifications après demande de permission.
    ///
    /// Un refus laisse l'état `Unscheduled` et renvoie
    /// [`SchedError::PermissionDenied`], à présenter à l'utilisateur.
    pub async fn enable(&self) -> Result<Option<PassReport>, SchedError> {
        let mut inner = self.inner.lock().await;
        if inner.settings.enabled {
            return Ok(None);
        }
        let status = self.backend.request_permission().await?;
        if status != PermissionStatus::Granted {
            inner.settings.enabled = false;
            inner.state = ScheduleState::Unscheduled;
            return Err(SchedError::PermissionDenied);
        }
        inner.settings.enabled = true;
        self.settings_store.save_enabled(true).await?;
        self.pass_if_loaded(&mut inner, PassTrigger::Enabled).await
    }

    /// Désactive et vide les notifications en attente.
    pub async fn disable(&self) -> Result<PassReport, SchedError> {
        let mut inner = self.inner.lock().await;
        inner.settings.enabled = false;
        self.settings_store.save_enabled(false).await?;
        pass::run(self, &mut inner, PassTrigger::Disabled).await
    }

    /// Bascule ; renvoie le nouvel état `enabled`.
    pub async fn toggle(&self) -> Result<bool, SchedError> {
        let enabled = self.inner.lock().await.settings.enabled;
        if enabled {
            self.disable().await?;
            Ok(false)
        } else {
            self.enable().await?;
            Ok(true)
        }
    }

    pub async fn set_reminder_minutes(&self, minutes: u32) -> Result<Option<PassReport>, SchedError> {
        if !NotificationSettings::reminder_in_range(minutes) {
            return Err(SchedError::InvalidReminderOffset(minutes));
        }
        let mut inner = self.inner.lock().await;
        if inner.settings.reminder_minutes_before_prayer == minutes {
            return Ok(None);
        }
        inner.settings.reminder_minutes_before_prayer = minutes;
        self.settings_store.save_reminder_minutes(minutes).await?;
        if !inner.settings.enabled {
            return Ok(None);
        }
        self.pass_if_loaded(&mut inner, PassTrigger::SettingsChanged).await
    }

    /// Remplace la journée de prière. Une journée identique ne replanifie que
    /// si le marqueur persisté est périmé.
    pub async fn set_prayers(&self, set: DailyPrayerSet) -> Result<Option<PassReport>, SchedError> {
        let mut inner = self.inner.lock().await;
        if inner.prayers.as_ref() == Some(&set) {
            return self.pass_if_stale(&mut inner).await;
        }
        inner.replace_prayers(set);
        if !inner.settings.enabled {
            return Ok(None);
        }
        self.pass_if_loaded(&mut inner, PassTrigger::PrayerSetChanged).await
    }

    /// Reprise après relance : charge la journée sans forcer de passe ; on ne
    /// replanifie que si le marqueur persisté est périmé.
    pub async fn resume(&self, set: DailyPrayerSet) -> Result<Option<PassReport>, SchedError> {
        let mut inner = self.inner.lock().await;
        inner.replace_prayers(set);
        self.pass_if_stale(&mut inner).await
    }

    /// Reprise après minuit : le Tahajjud de `previous` (la veille) reste
    /// planifié tant qu'il est à venir.
    pub async fn carry_night_from(&self, previous: &DailyPrayerSet) {
        let now = self.clock.now_utc();
        let mut inner = self.inner.lock().await;
        inner.night_carry = previous
            .get(PrayerName::Tahajjud)
            .filter(|e| e.instant > now)
            .cloned();
    }

    /// Passage de minuit : nouvelle journée, passe inconditionnelle.
    pub async fn roll_over(&self, set: DailyPrayerSet) -> Result<Option<PassReport>, SchedError> {
        let mut inner = self.inner.lock().await;
        inner.replace_prayers(set);
        if !inner.settings.enabled {
            return Ok(None);
        }
        self.pass_if_loaded(&mut inner, PassTrigger::Midnight).await
    }

    /// Relance de l'application : replanifie si le marqueur n'est pas daté
    /// d'aujourd'hui.
    pub async fn ensure_current(&self) -> Result<Option<PassReport>, SchedError> {
        let mut inner = self.inner.lock().await;
        self.pass_if_stale(&mut inner).await
    }

    /// Passe forcée.
    pub async fn reschedule(&self) -> Result<PassReport, SchedError> {
        let mut inner = self.inner.lock().await;
        pass::run(self, &mut inner, PassTrigger::Manual).await
    }

    pub async fn marker(&self) -> Result<Option<ScheduleMarker>, SchedError> {
        let raw = self.store.get(KEY_LAST_SCHEDULED_DATE).await?;
        Ok(raw.as_deref().and_then(ScheduleMarker::decode))
    }

    async fn pass_if_stale(&self, inner: &mut Inner) -> Result<Option<PassReport>, SchedError> {
        if !inner.settings.enabled || inner.prayers.is_none() {
            return Ok(None);
        }
        let today = self.clock.today();
        match self.marker().await? {
            // déjà planifié aujourd'hui, éventuellement par un processus précédent
            Some(marker) if marker.is_current(today) && inner.state != ScheduleState::Stale => {
                inner.state = ScheduleState::Scheduled;
                Ok(None)
            }
            marker => {
                tracing::debug!(?marker, %today, "stale schedule detected");
                inner.state = ScheduleState::Stale;
                pass::run(self, inner, PassTrigger::StaleMarker).await.map(Some)
            }
        }
    }

    async fn pass_if_loaded(
        &self,
        inner: &mut Inner,
        trigger: PassTrigger,
    ) -> Result<Option<PassReport>, SchedError> {
        if inner.prayers.is_none() {
            return Ok(None);
        }
        if inner.state == ScheduleState::Scheduled {
            inner.state = ScheduleState::Stale;
        }
        pass::run(self, inner, trigger).await.map(Some)
    }
}
