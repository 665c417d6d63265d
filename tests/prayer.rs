#![forbid(unsafe_code)]
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use mihrab::model::{CalculationMethod, Coordinate, Madhab, PrayerName};
use mihrab::prayer::{
    countdown, select_next, AstronomicalCalculator, PrayerTimeProvider, ProviderError,
    RawPrayerTimes, TahajjudPolicy, TimetableCalculator,
};
use std::sync::Arc;

const TIMETABLE: &str = "\
date,fajr,sunrise,dhuhr,asr,maghrib,isha,asr_hanafi
2026-03-20,04:58,06:05,12:10,15:35,18:15,19:22,16:20
2026-03-21,04:55,06:03,12:10,15:36,18:17,19:24,16:21
";

fn london() -> Coordinate {
    Coordinate::new(51.5074, -0.1278).unwrap()
}

fn provider(policy: TahajjudPolicy) -> PrayerTimeProvider {
    let calc = TimetableCalculator::from_reader(TIMETABLE.as_bytes(), FixedOffset::east_opt(0).unwrap()).unwrap();
    PrayerTimeProvider::new(Arc::new(calc)).with_tahajjud_policy(policy)
}

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

#[test]
fn daily_set_order_and_arabic_names() {
    let date = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
    let set = provider(TahajjudPolicy::Approximate)
        .compute_daily_set(london(), date, CalculationMethod::MWL, Madhab::Shafi)
        .unwrap();

    let names: Vec<_> = set.events.iter().map(|e| e.name).collect();
    assert_eq!(names, PrayerName::ORDER.to_vec());
    for pair in set.events[..6].windows(2) {
        assert!(pair[0].instant < pair[1].instant);
    }
    assert_eq!(set.get(PrayerName::Isha).unwrap().arabic_name, "العشاء");
    assert_eq!(set.get(PrayerName::Tahajjud).unwrap().arabic_name, "التهجد");
}

#[test]
fn tahajjud_approximate_versus_next_day_fajr() {
    let date = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
    let approx = provider(TahajjudPolicy::Approximate)
        .compute_daily_set(london(), date, CalculationMethod::MWL, Madhab::Shafi)
        .unwrap();
    // nuit 18:15 -> 04:58 (+1 j) = 643 min ; 2/3 = 428 min 40 s
    assert_eq!(
        approx.get(PrayerName::Tahajjud).unwrap().instant,
        utc(2026, 3, 21, 1, 23) + Duration::seconds(40)
    );

    let exact = provider(TahajjudPolicy::NextDayFajr)
        .compute_daily_set(london(), date, CalculationMethod::MWL, Madhab::Shafi)
        .unwrap();
    // nuit 18:15 -> 04:55 = 640 min ; 2/3 = 426 min 40 s
    assert_eq!(
        exact.get(PrayerName::Tahajjud).unwrap().instant,
        utc(2026, 3, 21, 1, 21) + Duration::seconds(40)
    );

    // dernier jour de l'horaire : repli sur l'approximation
    let last = NaiveDate::from_ymd_opt(2026, 3, 21).unwrap();
    let fallback = provider(TahajjudPolicy::NextDayFajr)
        .compute_daily_set(london(), last, CalculationMethod::MWL, Madhab::Shafi)
        .unwrap();
    let maghrib = fallback.get(PrayerName::Maghrib).unwrap().instant;
    let fajr = fallback.get(PrayerName::Fajr).unwrap().instant;
    let expected = maghrib + (fajr + Duration::hours(24) - maghrib) * 2 / 3;
    assert_eq!(fallback.get(PrayerName::Tahajjud).unwrap().instant, expected);
}

#[test]
fn madhab_moves_asr_only() {
    let date = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
    let p = provider(TahajjudPolicy::Approximate);
    let shafi = p.compute_daily_set(london(), date, CalculationMethod::MWL, Madhab::Shafi).unwrap();
    let hanafi = p.compute_daily_set(london(), date, CalculationMethod::MWL, Madhab::Hanafi).unwrap();
    for (a, b) in shafi.events.iter().zip(&hanafi.events) {
        if a.name == PrayerName::Asr {
            assert_eq!(b.instant - a.instant, Duration::minutes(45));
        } else {
            assert_eq!(a.instant, b.instant);
        }
    }
}

#[test]
fn unavailable_date_is_reported() {
    let date = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
    let err = provider(TahajjudPolicy::Approximate)
        .compute_daily_set(london(), date, CalculationMethod::MWL, Madhab::Shafi)
        .unwrap_err();
    assert!(matches!(err, ProviderError::Unavailable { date: d } if d == date));
}

struct Unordered;

impl AstronomicalCalculator for Unordered {
    fn compute(
        &self,
        _coordinate: Coordinate,
        _date: NaiveDate,
        _method: CalculationMethod,
        _madhab: Madhab,
    ) -> Result<RawPrayerTimes, ProviderError> {
        let t = utc(2026, 1, 1, 12, 0);
        Ok(RawPrayerTimes {
            fajr: t,
            sunrise: t,
            dhuhr: t,
            asr: t,
            maghrib: t,
            isha: t,
        })
    }
}

#[test]
fn unordered_calculator_output_is_rejected() {
    let p = PrayerTimeProvider::new(Arc::new(Unordered));
    let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    assert!(matches!(
        p.compute_daily_set(london(), date, CalculationMethod::ISNA, Madhab::Shafi),
        Err(ProviderError::Unordered { .. })
    ));
}

#[test]
fn select_next_skips_sunrise_and_tahajjud() {
    let date = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
    let set = provider(TahajjudPolicy::Approximate)
        .compute_daily_set(london(), date, CalculationMethod::MWL, Madhab::Shafi)
        .unwrap();

    // entre Fajr et Sunrise : Dhuhr, pas Sunrise
    assert_eq!(select_next(&set, utc(2026, 3, 20, 5, 30)).unwrap().name, PrayerName::Dhuhr);
    // entre Dhuhr et Asr
    let between = utc(2026, 3, 20, 13, 0);
    let asr = select_next(&set, between).unwrap();
    assert_eq!(asr.name, PrayerName::Asr);
    assert_eq!(countdown(asr, between), "2h 35m");
    // pile à l'heure de l'Asr : strictement après
    assert_eq!(select_next(&set, utc(2026, 3, 20, 15, 35)).unwrap().name, PrayerName::Maghrib);
    // après Isha : rien, même si le Tahajjud est encore à venir
    assert!(select_next(&set, utc(2026, 3, 20, 20, 0)).is_none());
}
