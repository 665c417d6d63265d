use crate::model::{DailyPrayerSet, NotificationKind, NotificationTask};
use crate::prayer::TimetableCalculator;
use chrono::FixedOffset;
use csv::WriterBuilder;
use std::fs;
use std::path::Path;

/// Import d'un horaire publié: header `date,fajr,sunrise,dhuhr,asr,maghrib,isha[,asr_hanafi]`
pub fn import_timetable_csv<P: AsRef<Path>>(
    path: P,
    offset: FixedOffset,
) -> anyhow::Result<TimetableCalculator> {
    TimetableCalculator::from_path(path, offset)
}

/// Export JSON d'une journée (jolie mise en forme)
pub fn export_daily_set_json<P: AsRef<Path>>(path: P, set: &DailyPrayerSet) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(set)?;
    fs::write(path, s)?;
    Ok(())
}

/// Export CSV d'une journée: header `date,name,arabic_name,instant`
pub fn export_daily_set_csv<P: AsRef<Path>>(path: P, set: &DailyPrayerSet) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record(["date", "name", "arabic_name", "instant"])?;
    let date = set.date.to_string();
    for e in &set.events {
        let instant = e.instant.to_rfc3339();
        w.write_record([
            date.as_str(),
            e.name.as_str(),
            e.arabic_name.as_str(),
            instant.as_str(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Export CSV des notifications en attente: header `fires_at,prayer,kind,channel,title`
pub fn export_pending_csv<P: AsRef<Path>>(path: P, tasks: &[NotificationTask]) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record(["fires_at", "prayer", "kind", "channel", "title"])?;
    for t in tasks {
        let fires_at = t.fires_at.to_rfc3339();
        let kind = match t.kind {
            NotificationKind::AtTime => "at_time",
            NotificationKind::Reminder => "reminder",
        };
        w.write_record([
            fires_at.as_str(),
            t.prayer.as_str(),
            kind,
            t.channel.id(),
            t.title.as_str(),
        ])?;
    }
    w.flush()?;
    Ok(())
}
