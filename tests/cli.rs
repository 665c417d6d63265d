#![forbid(unsafe_code)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::tempdir;

const TIMETABLE: &str = "\
date,fajr,sunrise,dhuhr,asr,maghrib,isha
2026-03-20,04:58,06:05,12:10,15:35,18:15,19:22
2026-03-21,04:55,06:03,12:10,15:36,18:17,19:24
";

fn cli(dir: &Path, now: &str) -> Command {
    let timetable = dir.join("timetable.csv");
    if !timetable.exists() {
        std::fs::write(&timetable, TIMETABLE).unwrap();
    }
    let mut cmd = Command::cargo_bin("mihrab-cli").unwrap();
    cmd.arg("--state")
        .arg(dir.join("state.json"))
        .arg("--outbox")
        .arg(dir.join("outbox.json"))
        .arg("--timetable")
        .arg(timetable)
        .arg("--now")
        .arg(now);
    cmd
}

#[test]
fn qibla_for_explicit_position() {
    let dir = tempdir().unwrap();
    cli(dir.path(), "2026-03-20T13:00:00+00:00")
        .args(["qibla", "--lat", "51.5074", "--lon", "-0.1278"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ESE (4794km)"));
}

#[test]
fn times_lists_the_day() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("day.csv");
    cli(dir.path(), "2026-03-20T13:00:00+00:00")
        .args(["times", "--out-csv"])
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("3:35 PM"))
        .stdout(predicate::str::contains("العصر"))
        .stdout(predicate::str::contains("Tahajjud"));
    let exported = std::fs::read_to_string(csv).unwrap();
    assert!(exported.starts_with("date,name,arabic_name,instant"));
    assert_eq!(exported.lines().count(), 8);
}

#[test]
fn next_rolls_over_to_tomorrow() {
    let dir = tempdir().unwrap();
    cli(dir.path(), "2026-03-20T20:00:00+00:00")
        .arg("next")
        .assert()
        .success()
        .stdout(predicate::str::contains("Fajr at 4:55 AM tomorrow (in 8h 55m)"));
}

#[test]
fn notify_on_then_pending_and_status() {
    let dir = tempdir().unwrap();
    let now = "2026-03-20T13:00:00+00:00";

    cli(dir.path(), now)
        .args(["notify", "on"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Notifications enabled"))
        .stdout(predicate::str::contains(
            "Scheduled 8 notification(s) for 2026-03-20 (4 in the past, 0 failed)",
        ));

    cli(dir.path(), now)
        .arg("pending")
        .assert()
        .success()
        .stdout(predicate::str::contains("Time for Asr"))
        .stdout(predicate::str::contains("prayer-reminders"))
        .stdout(predicate::str::contains("Fajr").not());

    // relance le même jour : rien n'est replanifié
    cli(dir.path(), "2026-03-20T14:00:00+00:00")
        .args(["schedule"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to schedule"));

    cli(dir.path(), now)
        .args(["notify", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "enabled=true reminder=15m state=Scheduled last_scheduled=2026-03-20",
        ));

    cli(dir.path(), now)
        .args(["notify", "off"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Notifications disabled"));
    cli(dir.path(), now)
        .arg("pending")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn invalid_reminder_offset_is_rejected() {
    let dir = tempdir().unwrap();
    cli(dir.path(), "2026-03-20T13:00:00+00:00")
        .args(["notify", "timing", "90"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reminder offset 90 out of range"));
}

#[test]
fn schedule_requires_notifications() {
    let dir = tempdir().unwrap();
    cli(dir.path(), "2026-03-20T13:00:00+00:00")
        .arg("schedule")
        .assert()
        .failure()
        .stderr(predicate::str::contains("notifications are disabled"));
}

#[test]
fn manual_location_is_shown() {
    let dir = tempdir().unwrap();
    cli(dir.path(), "2026-03-20T13:00:00+00:00")
        .args(["location", "set", "--lat", "48.8566", "--lon", "2.3522"])
        .assert()
        .success()
        .stdout(predicate::str::contains("48.8566°N, 2.3522°E (Manual)"));

    cli(dir.path(), "2026-03-20T13:00:00+00:00")
        .args(["location", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(Manual)"));
}
