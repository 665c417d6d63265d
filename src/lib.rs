#![forbid(unsafe_code)]
//! Mihrab : heures de prière, Qibla et rappels locaux (sans BD).
//!
//! - Journée de prière déléguée à un calculateur externe, Tahajjud dérivé.
//! - Prochaine prière et compte à rebours.
//! - Planification idempotente des rappels (annule puis replanifie),
//!   rafraîchie à minuit local.
//! - Instants en UTC ; la date civile vient de l'horloge injectée.

pub mod clock;
pub mod geo;
pub mod io;
pub mod location;
pub mod model;
pub mod notification;
pub mod prayer;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod storage;

pub use clock::{Clock, FixedClock, SystemClock};
pub use geo::{
    angle_difference, bearing_to, compass_direction, distance_to, format_distance,
    normalize_heading, QiblaInfo,
};
pub use location::{LocationError, LocationSource, LocationStore, StaticLocationSource};
pub use model::{
    CalculationMethod, Channel, Coordinate, DailyPrayerSet, Madhab, NotificationKind,
    NotificationSettings, NotificationTask, PrayerEvent, PrayerName, ScheduleMarker, KAABA,
};
pub use notification::{
    JsonOutboxBackend, MemoryBackend, NotificationBackend, NotificationError,
    NotificationRenderer, TextNotification,
};
pub use prayer::{
    countdown, select_next, AstronomicalCalculator, PrayerTimeProvider, ProviderError,
    RawPrayerTimes, TahajjudPolicy, TimetableCalculator,
};
pub use scheduler::{MidnightRefresh, NotificationScheduler, PassReport, PassTrigger, SchedError, ScheduleState};
pub use session::{NextPrayer, PrayerSession};
pub use storage::{JsonKvStore, KeyValueStore, MemoryKvStore};
