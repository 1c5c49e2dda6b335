use crate::cron_eval;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use fleet_common::clock::Clock;
use fleet_common::error::{Error, Result};
use fleet_store::Store;
use fleet_types::{Schedule, ScheduleExecution, ScheduleTarget, ScheduleUpdate};
use std::str::FromStr;
use std::sync::Arc;

/// CRUD surface over [`Store`]'s schedule rows, adding the validation the
/// store itself does not know how to do: cron syntax, IANA timezone
/// names, and next-trigger computation. The 1:1 mapping enforcement and
/// the conditional writes themselves stay in the store, since they are
/// about the store's own consistency guarantees rather than input shape.
pub struct ScheduleManager {
    store: Arc<Store>,
}

impl ScheduleManager {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        name: &str,
        recurrence: &str,
        time_zone: &str,
        desired: i32,
        min: i32,
        max: i32,
        target: ScheduleTarget,
        created_by: &str,
        clock: &dyn Clock,
    ) -> Result<Schedule> {
        if !cron_eval::validate(recurrence) {
            return Err(Error::validation(format!("invalid recurrence (cron): {recurrence}")));
        }
        parse_tz(time_zone)?;

        self.store
            .create_schedule(name, recurrence, time_zone, desired, min, max, target, created_by, clock)
            .await
    }

    pub async fn get(&self, schedule_id: &str) -> Result<Option<Schedule>> {
        self.store.get_schedule(schedule_id).await
    }

    pub async fn list(&self, enabled_only: bool, cluster_name: Option<&str>, nodegroup_name: Option<&str>) -> Result<Vec<Schedule>> {
        self.store.list_schedules(enabled_only, cluster_name, nodegroup_name).await
    }

    pub async fn update(&self, schedule_id: &str, patch: &ScheduleUpdate, clock: &dyn Clock) -> Result<Schedule> {
        if let Some(recurrence) = &patch.recurrence {
            if !cron_eval::validate(recurrence) {
                return Err(Error::validation(format!("invalid recurrence (cron): {recurrence}")));
            }
        }
        if let Some(tz) = &patch.time_zone {
            parse_tz(tz)?;
        }
        self.store.update_schedule(schedule_id, patch, clock).await
    }

    pub async fn delete(&self, schedule_id: &str, clock: &dyn Clock) -> Result<()> {
        self.store.delete_schedule(schedule_id, clock).await
    }

    pub async fn pause(&self, schedule_id: &str, until: Option<DateTime<Utc>>, clock: &dyn Clock) -> Result<Schedule> {
        self.store.pause_schedule(schedule_id, until, clock).await
    }

    pub async fn history(&self, schedule_id: &str, limit: i32) -> Result<Vec<ScheduleExecution>> {
        self.store.get_schedule_history(schedule_id, limit).await
    }

    pub async fn record_execution(&self, execution: &ScheduleExecution, clock: &dyn Clock) -> Result<()> {
        self.store.record_execution(execution, clock).await
    }

    pub async fn next_trigger(&self, schedule_id: &str, clock: &dyn Clock) -> Result<Option<DateTime<Utc>>> {
        let Some(schedule) = self.get(schedule_id).await? else {
            return Ok(None);
        };
        let tz = parse_tz(&schedule.time_zone)?;
        Ok(cron_eval::next_trigger(&schedule.recurrence, tz, clock.now()))
    }
}

fn parse_tz(name: &str) -> Result<Tz> {
    Tz::from_str(name).map_err(|_| Error::validation(format!("unknown time zone: {name}")))
}
