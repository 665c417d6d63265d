use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, TimeZone, Utc};

/// Source de temps injectable. `now` porte le décalage civil courant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    fn now_utc(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }

    /// Date civile locale.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Horloge système ; décalage de l'hôte ou imposé.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    offset: Option<FixedOffset>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { offset: None }
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            offset: Some(offset),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        match self.offset {
            Some(offset) => Utc::now().with_timezone(&offset),
            None => Local::now().fixed_offset(),
        }
    }
}

/// Horloge figée (tests, rejouage).
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    at: DateTime<FixedOffset>,
}

impl FixedClock {
    pub fn new(at: DateTime<FixedOffset>) -> Self {
        Self { at }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.at
    }
}

/// Instant du prochain minuit local + 1 s, strictement après `now`.
pub fn next_midnight_refresh(now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    let offset = *now.offset();
    let tomorrow = now.date_naive() + Duration::days(1);
    let Some(at) = tomorrow.and_hms_opt(0, 0, 1) else {
        return now + Duration::days(1);
    };
    offset
        .from_local_datetime(&at)
        .single()
        .unwrap_or_else(|| now + Duration::days(1))
}

/// Délai jusqu'au prochain rafraîchissement (jamais négatif).
pub fn until_next_midnight(now: DateTime<FixedOffset>) -> std::time::Duration {
    (next_midnight_refresh(now) - now)
        .to_std()
        .unwrap_or(std::time::Duration::from_secs(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midnight_is_one_second_after_local_midnight() {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let now = offset.with_ymd_and_hms(2026, 10, 19, 23, 59, 0).unwrap();
        let next = next_midnight_refresh(now);
        assert_eq!(next, offset.with_ymd_and_hms(2026, 10, 20, 0, 0, 1).unwrap());
        assert_eq!(until_next_midnight(now).as_secs(), 61);
    }

    #[test]
    fn just_after_midnight_targets_following_day() {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let now = offset.with_ymd_and_hms(2026, 10, 20, 0, 0, 2).unwrap();
        let next = next_midnight_refresh(now);
        assert_eq!(next.date_naive(), NaiveDate::from_ymd_opt(2026, 10, 21).unwrap());
    }
}
