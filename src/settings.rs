//! Réglages persistés : chargés au démarrage, persistés à chaque mutation.

use crate::model::{CalculationMethod, Madhab, NotificationSettings};
use crate::storage::{
    KeyValueStore, KEY_CALCULATION_METHOD, KEY_NOTIFICATIONS_ENABLED, KEY_NOTIFICATION_TIMING,
    KEY_PRAYER_SCHOOL,
};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrayerSchool {
    pub method: CalculationMethod,
    pub madhab: Madhab,
}

/// Méthode de calcul et madhab.
pub struct PrayerSchoolStore {
    store: Arc<dyn KeyValueStore>,
    current: RwLock<PrayerSchool>,
}

impl PrayerSchoolStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            current: RwLock::new(PrayerSchool::default()),
        }
    }

    /// Les valeurs inconnues sont ignorées (on garde le défaut).
    pub async fn load(&self) -> anyhow::Result<PrayerSchool> {
        let mut school = PrayerSchool::default();
        if let Some(raw) = self.store.get(KEY_PRAYER_SCHOOL).await? {
            match raw.parse::<Madhab>() {
                Ok(madhab) => school.madhab = madhab,
                Err(err) => tracing::warn!(%err, "ignoring saved prayer school"),
            }
        }
        if let Some(raw) = self.store.get(KEY_CALCULATION_METHOD).await? {
            match raw.parse::<CalculationMethod>() {
                Ok(method) => school.method = method,
                Err(err) => tracing::warn!(%err, "ignoring saved calculation method"),
            }
        }
        *self.current.write().await = school;
        Ok(school)
    }

    pub async fn get(&self) -> PrayerSchool {
        *self.current.read().await
    }

    pub async fn set_madhab(&self, madhab: Madhab) -> anyhow::Result<()> {
        self.current.write().await.madhab = madhab;
        self.store.set(KEY_PRAYER_SCHOOL, madhab.as_str()).await
    }

    pub async fn set_method(&self, method: CalculationMethod) -> anyhow::Result<()> {
        self.current.write().await.method = method;
        self.store.set(KEY_CALCULATION_METHOD, method.as_str()).await
    }
}

/// Persistance des `NotificationSettings` ; la validation et les transitions
/// sont faites par le scheduler.
pub struct NotificationSettingsStore {
    store: Arc<dyn KeyValueStore>,
}

impl NotificationSettingsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> anyhow::Result<NotificationSettings> {
        let mut settings = NotificationSettings::default();
        if let Some(raw) = self.store.get(KEY_NOTIFICATION_TIMING).await? {
            match raw.trim().parse::<u32>() {
                Ok(m) if NotificationSettings::reminder_in_range(m) => {
                    settings.reminder_minutes_before_prayer = m
                }
                _ => tracing::warn!(%raw, "ignoring saved reminder offset"),
            }
        }
        settings.enabled = self.store.get(KEY_NOTIFICATIONS_ENABLED).await?.as_deref() == Some("true");
        Ok(settings)
    }

    pub async fn save_enabled(&self, enabled: bool) -> anyhow::Result<()> {
        self.store
            .set(KEY_NOTIFICATIONS_ENABLED, if enabled { "true" } else { "false" })
            .await
    }

    pub async fn save_reminder_minutes(&self, minutes: u32) -> anyhow::Result<()> {
        self.store
            .set(KEY_NOTIFICATION_TIMING, &minutes.to_string())
            .await
    }
}
