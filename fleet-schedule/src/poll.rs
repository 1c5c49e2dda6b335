use crate::cron_eval;
use crate::manager::ScheduleManager;
use crate::trigger::trigger_schedule_operation;
use chrono::Timelike;
use chrono_tz::Tz;
use fleet_bus::Bus;
use fleet_common::clock::Clock;
use fleet_credentials::CredentialBroker;
use fleet_store::Store;
use fleet_types::{Action, ScheduleExecution};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default)]
pub struct PollSummary {
    pub schedules_evaluated: usize,
    pub triggered: usize,
    pub skipped_count: usize,
    pub errors: usize,
}

/// One pass over every enabled schedule: auto-resume past-due pauses,
/// evaluate cron triggering for the current minute, and fire at most one
/// operation per schedule per minute via the idempotency lock. Never
/// propagates a per-schedule failure to the caller — each is logged and
/// tallied into `errors` so one broken schedule cannot stall the rest.
pub async fn poll_once(
    manager: &ScheduleManager,
    broker: &CredentialBroker,
    store: &Store,
    bus: &dyn Bus,
    clock: &dyn Clock,
) -> PollSummary {
    let now = clock.now();
    let reference_minute = now.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(now);
    let minute_key = reference_minute.format("%Y-%m-%dT%H:%M").to_string();

    let schedules = match manager.list(true, None, None).await {
        Ok(schedules) => schedules,
        Err(e) => {
            tracing::error!(error = %e, "failed to list enabled schedules");
            return PollSummary { errors: 1, ..Default::default() };
        }
    };

    let mut summary = PollSummary { schedules_evaluated: schedules.len(), ..Default::default() };

    for mut schedule in schedules {
        if let Some(paused_until) = schedule.paused_until {
            if now < paused_until {
                tracing::info!(schedule_id = %schedule.schedule_id, %paused_until, "schedule paused, skipping");
                summary.skipped_count += 1;
                continue;
            }
            let patch = fleet_types::ScheduleUpdate { enabled: Some(true), paused_until: Some(None), ..Default::default() };
            match manager.update(&schedule.schedule_id, &patch, clock).await {
                Ok(updated) => schedule = updated,
                Err(e) => {
                    tracing::error!(schedule_id = %schedule.schedule_id, error = %e, "failed to auto-resume paused schedule");
                    summary.errors += 1;
                    continue;
                }
            }
        }

        let tz = match Tz::from_str(&schedule.time_zone) {
            Ok(tz) => tz,
            Err(_) => {
                tracing::error!(schedule_id = %schedule.schedule_id, time_zone = %schedule.time_zone, "schedule has invalid time zone");
                summary.errors += 1;
                continue;
            }
        };

        if !cron_eval::is_triggered(&schedule.recurrence, tz, reference_minute) {
            continue;
        }

        let lock_key = format!("schedule:{}:scale:{minute_key}", schedule.schedule_id);
        let acquired = match store.acquire_lock(&lock_key, 120, clock).await {
            Ok(acquired) => acquired,
            Err(e) => {
                tracing::error!(schedule_id = %schedule.schedule_id, error = %e, "failed to acquire idempotency lock");
                summary.errors += 1;
                continue;
            }
        };
        if !acquired {
            tracing::info!(schedule_id = %schedule.schedule_id, "scale already triggered this minute");
            summary.skipped_count += 1;
            continue;
        }

        match trigger_schedule_operation(broker, store, bus, &schedule, Action::Scale, clock).await {
            Ok(result) => {
                if let Some(operation_id) = result.operation_id {
                    let execution = ScheduleExecution {
                        schedule_id: schedule.schedule_id.clone(),
                        executed_at: now,
                        action: Action::Scale,
                        operation_id,
                        nodegroup_count: result.nodegroups_queued,
                    };
                    if let Err(e) = manager.record_execution(&execution, clock).await {
                        tracing::error!(schedule_id = %schedule.schedule_id, error = %e, "failed to record schedule execution");
                    }
                }
                summary.triggered += 1;
            }
            Err(e) => {
                tracing::error!(schedule_id = %schedule.schedule_id, error = %e, "failed to trigger scheduled operation");
                summary.errors += 1;
            }
        }
    }

    summary
}

