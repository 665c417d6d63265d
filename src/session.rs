//! Session applicative : position + réglages → journée de prière →
//! {prochaine prière, rappels}.

use crate::clock::Clock;
use crate::geo::QiblaInfo;
use crate::location::{LocationSource, LocationStore, ResolvedLocation};
use crate::model::{CalculationMethod, Coordinate, DailyPrayerSet, Madhab, PrayerEvent};
use crate::notification::NotificationBackend;
use crate::prayer::{
    countdown, select_next, AstronomicalCalculator, DailySetCache, PrayerTimeProvider,
    ProviderError, TahajjudPolicy,
};
use crate::scheduler::{MidnightRefresh, NotificationScheduler, PassReport};
use crate::settings::{PrayerSchool, PrayerSchoolStore};
use crate::storage::KeyValueStore;
use anyhow::Context;
use chrono::NaiveDate;
use std::sync::Arc;

/// Prochaine prière affichable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextPrayer {
    pub event: PrayerEvent,
    pub countdown: String,
    /// Vrai si la journée courante était épuisée (Fajr du lendemain).
    pub tomorrow: bool,
}

pub struct PrayerSession {
    clock: Arc<dyn Clock>,
    provider: PrayerTimeProvider,
    cache: DailySetCache,
    location: LocationStore,
    school: PrayerSchoolStore,
    scheduler: NotificationScheduler,
}

impl PrayerSession {
    pub fn new(
        calculator: Arc<dyn AstronomicalCalculator>,
        store: Arc<dyn KeyValueStore>,
        backend: Arc<dyn NotificationBackend>,
        location_source: Arc<dyn LocationSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider: PrayerTimeProvider::new(calculator),
            cache: DailySetCache::new(),
            location: LocationStore::new(store.clone(), location_source),
            school: PrayerSchoolStore::new(store.clone()),
            scheduler: NotificationScheduler::new(backend, store, clock.clone()),
            clock,
        }
    }

    pub fn with_tahajjud_policy(mut self, policy: TahajjudPolicy) -> Self {
        self.provider = self.provider.with_tahajjud_policy(policy);
        self
    }

    pub fn scheduler(&self) -> &NotificationScheduler {
        &self.scheduler
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Démarrage : charge réglages et position, calcule la journée et
    /// reprend la planification si le marqueur est périmé.
    ///
    /// Sans horaire disponible pour aujourd'hui, la session reste utilisable
    /// avec une journée vide.
    pub async fn start(&self) -> anyhow::Result<Option<DailyPrayerSet>> {
        self.school.load().await.context("loading prayer school")?;
        self.location.load().await.context("loading location")?;
        self.scheduler.load().await.context("loading notification settings")?;

        match self.today_set().await {
            Ok(set) => {
                // relance après minuit : le Tahajjud de la veille tombe cette nuit
                if let Some(previous) = set.date.pred_opt() {
                    match self.set_for(previous).await {
                        Ok(prev) => self.scheduler.carry_night_from(&prev).await,
                        Err(err) => tracing::debug!(error = %err, "no previous night to carry"),
                    }
                }
                self.scheduler.resume(set.clone()).await?;
                Ok(Some(set))
            }
            Err(err) => {
                tracing::warn!(error = %err, "no prayer times for today");
                Ok(None)
            }
        }
    }

    pub async fn location(&self) -> anyhow::Result<ResolvedLocation> {
        match self.location.current().await {
            Some(resolved) => Ok(resolved),
            None => self.location.load().await,
        }
    }

    pub async fn school(&self) -> PrayerSchool {
        self.school.get().await
    }

    pub async fn set_for(&self, date: NaiveDate) -> Result<DailyPrayerSet, ProviderError> {
        let location = self.location().await?;
        let school = self.school.get().await;
        self.cache.get_or_compute(
            &self.provider,
            location.coordinate,
            date,
            school.method,
            school.madhab,
        )
    }

    pub async fn today_set(&self) -> Result<DailyPrayerSet, ProviderError> {
        self.set_for(self.clock.today()).await
    }

    /// Prochaine prière obligatoire ; journée épuisée → Fajr du lendemain.
    pub async fn next_prayer(&self) -> Result<Option<NextPrayer>, ProviderError> {
        let now = self.clock.now_utc();
        let today = self.today_set().await?;
        if let Some(event) = select_next(&today, now) {
            return Ok(Some(NextPrayer {
                countdown: countdown(event, now),
                event: event.clone(),
                tomorrow: false,
            }));
        }
        let Some(next_day) = today.date.succ_opt() else {
            return Ok(None);
        };
        let tomorrow = self.set_for(next_day).await?;
        Ok(select_next(&tomorrow, now).map(|event| NextPrayer {
            countdown: countdown(event, now),
            event: event.clone(),
            tomorrow: true,
        }))
    }

    pub async fn qibla(&self) -> QiblaInfo {
        let position = self.location.current().await.map(|r| r.coordinate);
        QiblaInfo::from_coordinate(position)
    }

    pub async fn set_manual_location(&self, coordinate: Coordinate) -> anyhow::Result<Option<PassReport>> {
        self.location.set_manual(coordinate).await?;
        self.prayer_inputs_changed().await
    }

    pub async fn detect_location(&self) -> anyhow::Result<Option<PassReport>> {
        self.location.detect().await?;
        self.prayer_inputs_changed().await
    }

    pub async fn set_method(&self, method: CalculationMethod) -> anyhow::Result<Option<PassReport>> {
        self.school.set_method(method).await?;
        self.prayer_inputs_changed().await
    }

    pub async fn set_madhab(&self, madhab: Madhab) -> anyhow::Result<Option<PassReport>> {
        self.school.set_madhab(madhab).await?;
        self.prayer_inputs_changed().await
    }

    async fn prayer_inputs_changed(&self) -> anyhow::Result<Option<PassReport>> {
        let set = self.today_set().await?;
        Ok(self.scheduler.set_prayers(set).await?)
    }

    /// Nouvelle date civile : recalcule et replanifie.
    pub async fn refresh(&self) -> anyhow::Result<Option<PassReport>> {
        let set = self.today_set().await?;
        Ok(self.scheduler.roll_over(set).await?)
    }

    /// Arme le rafraîchissement de minuit ; à conserver tant que la session vit.
    pub fn start_midnight_refresh(self: &Arc<Self>) -> MidnightRefresh {
        let session = Arc::clone(self);
        MidnightRefresh::spawn(self.clock.clone(), move || {
            let session = Arc::clone(&session);
            async move {
                if let Err(err) = session.refresh().await {
                    tracing::warn!(error = %format!("{err:#}"), "midnight refresh failed");
                }
            }
        })
    }
}
