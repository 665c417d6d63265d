//! Calculateur adossé à un horaire publié (CSV), à la place d'une
//! bibliothèque astronomique.
//!
//! Format : header `date,fajr,sunrise,dhuhr,asr,maghrib,isha[,asr_hanafi]`,
//! dates `YYYY-MM-DD`, heures locales `HH:MM`. La méthode de calcul est celle
//! de l'horaire et ne peut pas être changée ; le madhab choisit la colonne Asr.

use super::{AstronomicalCalculator, ProviderError, RawPrayerTimes};
use crate::model::{CalculationMethod, Coordinate, Madhab};
use anyhow::{bail, Context};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
struct Row {
    fajr: NaiveTime,
    sunrise: NaiveTime,
    dhuhr: NaiveTime,
    asr: NaiveTime,
    asr_hanafi: Option<NaiveTime>,
    maghrib: NaiveTime,
    isha: NaiveTime,
}

#[derive(Debug, Clone)]
pub struct TimetableCalculator {
    offset: FixedOffset,
    rows: BTreeMap<NaiveDate, Row>,
}

impl TimetableCalculator {
    /// Horaire vide : toute date est indisponible.
    pub fn empty(offset: FixedOffset) -> Self {
        Self {
            offset,
            rows: BTreeMap::new(),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P, offset: FixedOffset) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("reading timetable {}", path.display()))?;
        Self::from_reader(file, offset)
    }

    pub fn from_reader<R: Read>(reader: R, offset: FixedOffset) -> anyhow::Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut rows = BTreeMap::new();
        for (line, rec) in rdr.records().enumerate() {
            let rec = rec?;
            let field = |idx: usize, name: &str| -> anyhow::Result<NaiveTime> {
                let raw = rec
                    .get(idx)
                    .with_context(|| format!("row {}: missing {name}", line + 1))?;
                parse_time(raw).with_context(|| format!("row {}: invalid {name}", line + 1))
            };
            let date_raw = rec.get(0).context("missing date")?;
            let date = NaiveDate::parse_from_str(date_raw, "%Y-%m-%d")
                .with_context(|| format!("row {}: invalid date {date_raw}", line + 1))?;
            let asr_hanafi = match rec.get(7) {
                Some(raw) if !raw.is_empty() => Some(field(7, "asr_hanafi")?),
                _ => None,
            };
            let row = Row {
                fajr: field(1, "fajr")?,
                sunrise: field(2, "sunrise")?,
                dhuhr: field(3, "dhuhr")?,
                asr: field(4, "asr")?,
                maghrib: field(5, "maghrib")?,
                isha: field(6, "isha")?,
                asr_hanafi,
            };
            if rows.insert(date, row).is_some() {
                bail!("duplicate timetable date {date}");
            }
        }
        Ok(Self { offset, rows })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn instant(&self, date: NaiveDate, time: NaiveTime) -> Result<DateTime<Utc>, ProviderError> {
        self.offset
            .from_local_datetime(&date.and_time(time))
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or(ProviderError::Unavailable { date })
    }
}

fn parse_time(raw: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .with_context(|| format!("expected HH:MM, got {raw}"))
}

impl AstronomicalCalculator for TimetableCalculator {
    fn compute(
        &self,
        _coordinate: Coordinate,
        date: NaiveDate,
        _method: CalculationMethod,
        madhab: Madhab,
    ) -> Result<RawPrayerTimes, ProviderError> {
        let row = self
            .rows
            .get(&date)
            .ok_or(ProviderError::Unavailable { date })?;
        let asr = match madhab {
            Madhab::Hanafi => row.asr_hanafi.unwrap_or(row.asr),
            Madhab::Shafi => row.asr,
        };

        let mut times = [row.fajr, row.sunrise, row.dhuhr, asr, row.maghrib, row.isha]
            .into_iter()
            .map(|t| self.instant(date, t))
            .collect::<Result<Vec<_>, _>>()?;
        // une heure inférieure à la précédente est passée minuit (Isha tardif)
        for i in 1..times.len() {
            if times[i] <= times[i - 1] {
                times[i] += Duration::days(1);
            }
        }

        Ok(RawPrayerTimes {
            fajr: times[0],
            sunrise: times[1],
            dhuhr: times[2],
            asr: times[3],
            maghrib: times[4],
            isha: times[5],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::KAABA;

    const CSV: &str = "date,fajr,sunrise,dhuhr,asr,maghrib,isha,asr_hanafi\n\
2026-06-21,02:45,04:43,13:02,17:26,21:21,23:50,18:48\n\
2026-06-22,02:46,04:43,13:02,17:26,21:21,00:20,\n";

    #[test]
    fn hanafi_column_and_late_isha() {
        let calc = TimetableCalculator::from_reader(CSV.as_bytes(), FixedOffset::east_opt(3600).unwrap()).unwrap();
        let d1 = NaiveDate::from_ymd_opt(2026, 6, 21).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 6, 22).unwrap();

        let shafi = calc.compute(KAABA, d1, CalculationMethod::MWL, Madhab::Shafi).unwrap();
        let hanafi = calc.compute(KAABA, d1, CalculationMethod::MWL, Madhab::Hanafi).unwrap();
        assert!(hanafi.asr > shafi.asr);

        let late = calc.compute(KAABA, d2, CalculationMethod::MWL, Madhab::Hanafi).unwrap();
        assert_eq!(late.isha, Utc.with_ymd_and_hms(2026, 6, 22, 23, 20, 0).unwrap());
        assert_eq!(late.asr, Utc.with_ymd_and_hms(2026, 6, 22, 16, 26, 0).unwrap());
    }

    #[test]
    fn missing_date_is_unavailable() {
        let calc = TimetableCalculator::from_reader(CSV.as_bytes(), FixedOffset::east_opt(0).unwrap()).unwrap();
        let d = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap();
        assert!(matches!(
            calc.compute(KAABA, d, CalculationMethod::MWL, Madhab::Shafi),
            Err(ProviderError::Unavailable { .. })
        ));
    }

    #[test]
    fn rejects_bad_time() {
        let bad = "date,fajr,sunrise,dhuhr,asr,maghrib,isha\n2026-06-21,25:00,04:43,13:02,17:26,21:21,23:50\n";
        assert!(TimetableCalculator::from_reader(bad.as_bytes(), FixedOffset::east_opt(0).unwrap()).is_err());
    }
}
