use super::{Inner, NotificationScheduler, PassReport, PassTrigger, SchedError, ScheduleState};
use crate::model::{NotificationKind, PrayerName, ScheduleMarker};
use crate::notification::{prepare_task, NotificationError};
use crate::storage::KEY_LAST_SCHEDULED_DATE;

/// Passe idempotente : annule tout puis replanifie la journée.
/// L'appelant tient le verrou de `inner` pendant toute la passe.
pub(super) async fn run(
    scheduler: &NotificationScheduler,
    inner: &mut Inner,
    trigger: PassTrigger,
) -> Result<PassReport, SchedError> {
    let today = scheduler.clock.today();
    let mut report = PassReport {
        trigger,
        date: today,
        scheduled: 0,
        dropped_past: 0,
        failed: 0,
    };

    if !inner.settings.enabled {
        scheduler.backend.cancel_all().await?;
        inner.state = ScheduleState::Unscheduled;
        tracing::info!(?trigger, "notifications disabled, pending cleared");
        return Ok(report);
    }

    let now = scheduler.clock.now_utc();
    if inner.night_carry.as_ref().is_some_and(|e| e.instant <= now) {
        inner.night_carry = None;
    }

    let Some(prayers) = inner.prayers.as_ref() else {
        tracing::debug!(?trigger, "no prayer set loaded, nothing to schedule");
        return Ok(report);
    };

    // l'annulation doit aboutir avant toute planification
    scheduler.backend.cancel_all().await?;

    let minutes = inner.settings.reminder_minutes_before_prayer;
    let events = inner.night_carry.iter().chain(prayers.events.iter());
    for prayer in events.filter(|p| p.name != PrayerName::Sunrise) {
        for kind in [NotificationKind::AtTime, NotificationKind::Reminder] {
            let Some(task) = prepare_task(prayer, kind, minutes, now, scheduler.renderer.as_ref())
            else {
                report.dropped_past += 1;
                continue;
            };
            match scheduler.backend.schedule(task).await {
                Ok(id) => {
                    report.scheduled += 1;
                    tracing::debug!(prayer = %prayer.name, ?kind, id = id.as_str(), "scheduled");
                }
                Err(NotificationError::PermissionDenied) => {
                    inner.state = ScheduleState::Unscheduled;
                    tracing::warn!(prayer = %prayer.name, "permission revoked during pass");
                    return Err(SchedError::PermissionDenied);
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(prayer = %prayer.name, ?kind, error = %err, "skipping notification");
                }
            }
        }
    }

    let marker = ScheduleMarker {
        last_scheduled_date: today,
    };
    scheduler
        .store
        .set(KEY_LAST_SCHEDULED_DATE, &marker.encode())
        .await?;
    inner.state = ScheduleState::Scheduled;

    tracing::info!(
        ?trigger,
        date = %today,
        scheduled = report.scheduled,
        dropped_past = report.dropped_past,
        failed = report.failed,
        "prayer notifications scheduled"
    );
    Ok(report)
}
