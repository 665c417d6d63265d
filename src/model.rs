use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Coordonnée de la Kaaba (La Mecque), point de référence de la Qibla.
pub const KAABA: Coordinate = Coordinate {
    latitude: 21.4225,
    longitude: 39.8262,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinateError {
    #[error("coordinate is not a finite number")]
    NotFinite,
    #[error("latitude {0} out of range [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} out of range [-180, 180]")]
    LongitudeOutOfRange(f64),
}

/// Position géographique (degrés décimaux), valeur immuable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

/// Forme désérialisée, validée par `Coordinate::new`.
#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Valide les bornes ; NaN et infinis sont refusés ici, pas dans `geo`.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinateError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Convention astronomique de calcul.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CalculationMethod {
    #[default]
    MWL,
    ISNA,
    Egypt,
    Makkah,
    Karachi,
    Tehran,
    Jafari,
    Singapore,
}

impl CalculationMethod {
    pub const ALL: [CalculationMethod; 8] = [
        CalculationMethod::MWL,
        CalculationMethod::ISNA,
        CalculationMethod::Egypt,
        CalculationMethod::Makkah,
        CalculationMethod::Karachi,
        CalculationMethod::Tehran,
        CalculationMethod::Jafari,
        CalculationMethod::Singapore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationMethod::MWL => "MWL",
            CalculationMethod::ISNA => "ISNA",
            CalculationMethod::Egypt => "Egypt",
            CalculationMethod::Makkah => "Makkah",
            CalculationMethod::Karachi => "Karachi",
            CalculationMethod::Tehran => "Tehran",
            CalculationMethod::Jafari => "Jafari",
            CalculationMethod::Singapore => "Singapore",
        }
    }
}

impl fmt::Display for CalculationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalculationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown calculation method: {s}"))
    }
}

/// École juridique ; n'influe que sur l'Asr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Madhab {
    #[default]
    Shafi,
    Hanafi,
}

impl Madhab {
    pub fn as_str(&self) -> &'static str {
        match self {
            Madhab::Shafi => "shafi",
            Madhab::Hanafi => "hanafi",
        }
    }
}

impl fmt::Display for Madhab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Madhab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shafi" => Ok(Madhab::Shafi),
            "hanafi" => Ok(Madhab::Hanafi),
            _ => Err(format!("unknown madhab: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrayerName {
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
    Tahajjud,
}

impl PrayerName {
    /// Ordre fixe d'un `DailyPrayerSet`.
    pub const ORDER: [PrayerName; 7] = [
        PrayerName::Fajr,
        PrayerName::Sunrise,
        PrayerName::Dhuhr,
        PrayerName::Asr,
        PrayerName::Maghrib,
        PrayerName::Isha,
        PrayerName::Tahajjud,
    ];

    /// Les cinq prières obligatoires, dans l'ordre du jour.
    pub const OBLIGATORY: [PrayerName; 5] = [
        PrayerName::Fajr,
        PrayerName::Dhuhr,
        PrayerName::Asr,
        PrayerName::Maghrib,
        PrayerName::Isha,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "Fajr",
            PrayerName::Sunrise => "Sunrise",
            PrayerName::Dhuhr => "Dhuhr",
            PrayerName::Asr => "Asr",
            PrayerName::Maghrib => "Maghrib",
            PrayerName::Isha => "Isha",
            PrayerName::Tahajjud => "Tahajjud",
        }
    }

    pub fn arabic_name(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "الفجر",
            PrayerName::Sunrise => "الشروق",
            PrayerName::Dhuhr => "الظهر",
            PrayerName::Asr => "العصر",
            PrayerName::Maghrib => "المغرب",
            PrayerName::Isha => "العشاء",
            PrayerName::Tahajjud => "التهجد",
        }
    }

    pub fn is_obligatory(&self) -> bool {
        Self::OBLIGATORY.contains(self)
    }
}

impl fmt::Display for PrayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Une prière datée (instant absolu, UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerEvent {
    pub name: PrayerName,
    pub arabic_name: String,
    pub instant: DateTime<Utc>,
}

impl PrayerEvent {
    pub fn new(name: PrayerName, instant: DateTime<Utc>) -> Self {
        Self {
            name,
            arabic_name: name.arabic_name().to_string(),
            instant,
        }
    }
}

/// Prières d'une date civile pour un lieu. Jamais persisté.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPrayerSet {
    pub date: NaiveDate,
    pub events: Vec<PrayerEvent>,
}

impl DailyPrayerSet {
    pub fn get(&self, name: PrayerName) -> Option<&PrayerEvent> {
        self.events.iter().find(|e| e.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Identifiant fort pour une notification planifiée
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(String);

impl NotificationId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn random() -> Self {
        Self(format!("prayer-{}", Uuid::new_v4()))
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    AtTime,
    Reminder,
}

/// Canal de livraison (importance côté plateforme).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Immediate,
    Reminder,
}

impl Channel {
    pub fn id(&self) -> &'static str {
        match self {
            Channel::Immediate => "prayer-notifications",
            Channel::Reminder => "prayer-reminders",
        }
    }
}

impl NotificationKind {
    pub fn channel(&self) -> Channel {
        match self {
            NotificationKind::AtTime => Channel::Immediate,
            NotificationKind::Reminder => Channel::Reminder,
        }
    }
}

/// Notification planifiée, vit uniquement dans le backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTask {
    pub prayer: PrayerName,
    pub kind: NotificationKind,
    pub fires_at: DateTime<Utc>,
    pub channel: Channel,
    pub title: String,
    pub body: String,
}

pub const MIN_REMINDER_MINUTES: u32 = 5;
pub const MAX_REMINDER_MINUTES: u32 = 60;
pub const DEFAULT_REMINDER_MINUTES: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub reminder_minutes_before_prayer: u32,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            reminder_minutes_before_prayer: DEFAULT_REMINDER_MINUTES,
        }
    }
}

impl NotificationSettings {
    pub fn reminder_in_range(minutes: u32) -> bool {
        (MIN_REMINDER_MINUTES..=MAX_REMINDER_MINUTES).contains(&minutes)
    }
}

/// Marqueur persisté de la dernière date civile planifiée.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleMarker {
    pub last_scheduled_date: NaiveDate,
}

impl ScheduleMarker {
    const FORMAT: &'static str = "%Y-%m-%d";

    pub fn encode(&self) -> String {
        self.last_scheduled_date.format(Self::FORMAT).to_string()
    }

    /// Une valeur illisible vaut « pas de marqueur » : on replanifie.
    pub fn decode(raw: &str) -> Option<Self> {
        NaiveDate::parse_from_str(raw.trim(), Self::FORMAT)
            .ok()
            .map(|last_scheduled_date| Self { last_scheduled_date })
    }

    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.last_scheduled_date == today
    }
}
