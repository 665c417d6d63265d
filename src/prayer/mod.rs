//! Journée de prière : délègue les six instants canoniques à un calculateur
//! externe et dérive le Tahajjud (dernier tiers de la nuit).

pub mod next;
pub mod timetable;

pub use next::{countdown, format_prayer_time, select_next};
pub use timetable::TimetableCalculator;

use crate::model::{CalculationMethod, Coordinate, DailyPrayerSet, Madhab, PrayerEvent, PrayerName};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Les six instants bruts d'une date civile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPrayerTimes {
    pub fajr: DateTime<Utc>,
    pub sunrise: DateTime<Utc>,
    pub dhuhr: DateTime<Utc>,
    pub asr: DateTime<Utc>,
    pub maghrib: DateTime<Utc>,
    pub isha: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("no prayer times available for {date}")]
    Unavailable { date: NaiveDate },
    #[error("prayer times for {date} are not in chronological order")]
    Unordered { date: NaiveDate },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Calculateur astronomique (boîte noire).
pub trait AstronomicalCalculator: Send + Sync {
    fn compute(
        &self,
        coordinate: Coordinate,
        date: NaiveDate,
        method: CalculationMethod,
        madhab: Madhab,
    ) -> Result<RawPrayerTimes, ProviderError>;
}

/// Choix de la fin de nuit pour le Tahajjud.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TahajjudPolicy {
    /// Fajr du jour + 24 h.
    #[default]
    Approximate,
    /// Fajr réel du lendemain, à défaut l'approximation.
    NextDayFajr,
}

pub struct PrayerTimeProvider {
    calculator: Arc<dyn AstronomicalCalculator>,
    tahajjud: TahajjudPolicy,
}

impl PrayerTimeProvider {
    pub fn new(calculator: Arc<dyn AstronomicalCalculator>) -> Self {
        Self {
            calculator,
            tahajjud: TahajjudPolicy::default(),
        }
    }

    pub fn with_tahajjud_policy(mut self, policy: TahajjudPolicy) -> Self {
        self.tahajjud = policy;
        self
    }

    /// Construit le `DailyPrayerSet` ordonné : Fajr, Sunrise, Dhuhr, Asr,
    /// Maghrib, Isha puis Tahajjud, toujours en dernier.
    pub fn compute_daily_set(
        &self,
        coordinate: Coordinate,
        date: NaiveDate,
        method: CalculationMethod,
        madhab: Madhab,
    ) -> Result<DailyPrayerSet, ProviderError> {
        let raw = self.calculator.compute(coordinate, date, method, madhab)?;
        let canonical = [
            (PrayerName::Fajr, raw.fajr),
            (PrayerName::Sunrise, raw.sunrise),
            (PrayerName::Dhuhr, raw.dhuhr),
            (PrayerName::Asr, raw.asr),
            (PrayerName::Maghrib, raw.maghrib),
            (PrayerName::Isha, raw.isha),
        ];
        if canonical.windows(2).any(|w| w[0].1 >= w[1].1) {
            return Err(ProviderError::Unordered { date });
        }

        let night_end = self.night_end(coordinate, date, method, madhab, raw.fajr);
        let tahajjud = tahajjud_instant(raw.maghrib, night_end);

        let mut events: Vec<PrayerEvent> = canonical
            .iter()
            .map(|(name, at)| PrayerEvent::new(*name, *at))
            .collect();
        events.push(PrayerEvent::new(PrayerName::Tahajjud, tahajjud));

        Ok(DailyPrayerSet { date, events })
    }

    fn night_end(
        &self,
        coordinate: Coordinate,
        date: NaiveDate,
        method: CalculationMethod,
        madhab: Madhab,
        fajr: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let approx = fajr + Duration::hours(24);
        match self.tahajjud {
            TahajjudPolicy::Approximate => approx,
            TahajjudPolicy::NextDayFajr => {
                let Some(next) = date.succ_opt() else {
                    return approx;
                };
                match self.calculator.compute(coordinate, next, method, madhab) {
                    Ok(raw) => raw.fajr,
                    Err(err) => {
                        tracing::debug!(%next, error = %err, "next-day fajr unavailable, approximating");
                        approx
                    }
                }
            }
        }
    }
}

/// `maghrib + (fin_de_nuit - maghrib) * 2/3`
pub fn tahajjud_instant(maghrib: DateTime<Utc>, night_end: DateTime<Utc>) -> DateTime<Utc> {
    let night = night_end - maghrib;
    maghrib + Duration::milliseconds(night.num_milliseconds() * 2 / 3)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    lat_e4: i64,
    lon_e4: i64,
    date: NaiveDate,
    method: CalculationMethod,
    madhab: Madhab,
}

impl CacheKey {
    fn new(coordinate: Coordinate, date: NaiveDate, method: CalculationMethod, madhab: Madhab) -> Self {
        Self {
            lat_e4: (coordinate.latitude() * 10_000.0).round() as i64,
            lon_e4: (coordinate.longitude() * 10_000.0).round() as i64,
            date,
            method,
            madhab,
        }
    }
}

/// Mémoïsation côté appelant, clé (coordonnée arrondie à 1e-4, date, méthode, madhab).
#[derive(Default)]
pub struct DailySetCache {
    entries: Mutex<HashMap<CacheKey, DailyPrayerSet>>,
}

impl DailySetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(
        &self,
        provider: &PrayerTimeProvider,
        coordinate: Coordinate,
        date: NaiveDate,
        method: CalculationMethod,
        madhab: Madhab,
    ) -> Result<DailyPrayerSet, ProviderError> {
        let key = CacheKey::new(coordinate, date, method, madhab);
        if let Some(hit) = self.lock().get(&key) {
            return Ok(hit.clone());
        }
        let set = provider.compute_daily_set(coordinate, date, method, madhab)?;
        let mut entries = self.lock();
        // on ne garde que les dates encore utiles
        entries.retain(|k, _| k.date >= date.pred_opt().unwrap_or(date));
        entries.insert(key, set.clone());
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, DailyPrayerSet>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
