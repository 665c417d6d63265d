use crate::model::{DailyPrayerSet, PrayerEvent};
use chrono::{DateTime, FixedOffset, Utc};

/// Prochaine prière obligatoire strictement après `now`.
///
/// Sunrise et Tahajjud sont ignorés. `None` quand la journée est épuisée :
/// l'appelant régénère alors la journée du lendemain.
pub fn select_next(set: &DailyPrayerSet, now: DateTime<Utc>) -> Option<&PrayerEvent> {
    set.events
        .iter()
        .filter(|e| e.name.is_obligatory())
        .find(|e| e.instant > now)
}

/// "{h}h {m}m" au-delà d'une heure, "{m}m" sinon, "" si l'instant est passé.
pub fn countdown(next: &PrayerEvent, now: DateTime<Utc>) -> String {
    let diff = next.instant - now;
    if diff <= chrono::Duration::zero() {
        return String::new();
    }
    let total_minutes = diff.num_minutes();
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Heure locale au format 12 h ("4:05 AM"), "--:--" si absente.
pub fn format_prayer_time(instant: Option<DateTime<Utc>>, offset: FixedOffset) -> String {
    match instant {
        Some(at) => at.with_timezone(&offset).format("%-I:%M %p").to_string(),
        None => "--:--".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PrayerName;
    use chrono::{Duration, TimeZone};

    fn event(at: DateTime<Utc>) -> PrayerEvent {
        PrayerEvent::new(PrayerName::Asr, at)
    }

    #[test]
    fn countdown_formats() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(countdown(&event(now + Duration::minutes(135)), now), "2h 15m");
        assert_eq!(countdown(&event(now + Duration::minutes(60)), now), "1h 0m");
        assert_eq!(countdown(&event(now + Duration::seconds(59 * 60 + 59)), now), "59m");
        assert_eq!(countdown(&event(now + Duration::seconds(30)), now), "0m");
        assert_eq!(countdown(&event(now), now), "");
        assert_eq!(countdown(&event(now - Duration::minutes(5)), now), "");
    }

    #[test]
    fn twelve_hour_format() {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 1, 5, 0).unwrap();
        assert_eq!(format_prayer_time(Some(at), offset), "4:05 AM");
        assert_eq!(format_prayer_time(None, offset), "--:--");
    }
}
