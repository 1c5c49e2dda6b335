use crate::Store;
use crate::attr::{self, s};
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use fleet_common::clock::Clock;
use fleet_common::error::{Error, Result};
use fleet_types::{Action, Schedule, ScheduleExecution, ScheduleTarget, ScheduleUpdate};
use std::collections::HashMap;

const EXECUTION_TTL_SECONDS: i64 = 90 * 86_400;

/// Schedule CRUD, the `ASG_MAP#` 1:1 mapping enforcement, and append-only
/// execution history, all in the schedules table. Cron-string validation
/// and next-trigger computation are the caller's job (`fleet-schedule`);
/// this module only enforces what the store itself must guarantee —
/// uniqueness of the mapping row and conditional writes.
impl Store {
    /// Creates a schedule, generating its id. Fails with
    /// [`Error::AlreadyExists`] if `target`'s nodegroup already has an
    /// enabled schedule mapped to it.
    pub async fn create_schedule(
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
        let nodegroup_fqn = target.nodegroup_fqn();

        if let Some(existing_id) = self.get_mapping(&nodegroup_fqn).await? {
            if let Some(existing) = self.get_schedule(&existing_id).await? {
                if existing.enabled {
                    return Err(Error::AlreadyExists(format!(
                        "nodegroup {nodegroup_fqn} already has an active schedule: {existing_id}"
                    )));
                }
            }
        }

        let schedule_id = uuid::Uuid::new_v4().to_string();
        let now = clock.now();
        let schedule = Schedule {
            schedule_id: schedule_id.clone(),
            recurrence: recurrence.to_string(),
            time_zone: time_zone.to_string(),
            desired,
            min,
            max,
            target,
            enabled: true,
            paused_until: None,
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        };

        let mut item = attr::to_item(&schedule);
        item.insert("PK".to_string(), s(format!("SCHEDULE#{schedule_id}")));
        item.insert("SK".to_string(), s("CONFIG"));
        self.client
            .put_item()
            .table_name(&self.schedules_table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| Error::Transient(format!("create_schedule failed: {e}")))?;

        self.client
            .put_item()
            .table_name(&self.schedules_table)
            .item("PK", s(format!("ASG_MAP#{nodegroup_fqn}")))
            .item("SK", s("MAPPING"))
            .item("schedule_id", s(&schedule_id))
            .item("updated_at", s(now.to_rfc3339()))
            .send()
            .await
            .map_err(|e| Error::Transient(format!("create_schedule mapping write failed: {e}")))?;

        tracing::info!(schedule_id, nodegroup_fqn, name, "schedule created");
        Ok(schedule)
    }

    async fn get_mapping(&self, nodegroup_fqn: &str) -> Result<Option<String>> {
        let resp = self
            .client
            .get_item()
            .table_name(&self.schedules_table)
            .key("PK", s(format!("ASG_MAP#{nodegroup_fqn}")))
            .key("SK", s("MAPPING"))
            .send()
            .await
            .map_err(|e| Error::Transient(format!("get_mapping failed: {e}")))?;

        Ok(resp.item.as_ref().and_then(|item| attr::get_s(item, "schedule_id")))
    }

    pub async fn get_schedule(&self, schedule_id: &str) -> Result<Option<Schedule>> {
        let resp = self
            .client
            .get_item()
            .table_name(&self.schedules_table)
            .key("PK", s(format!("SCHEDULE#{schedule_id}")))
            .key("SK", s("CONFIG"))
            .send()
            .await
            .map_err(|e| Error::Transient(format!("get_schedule failed: {e}")))?;

        resp.item.as_ref().map(attr::from_item).transpose()
    }

    /// Lists every schedule, or (when `enabled_only`) only those on the
    /// `enabled-schedules-index`. `cluster_name`/`nodegroup_name` filter
    /// client-side after the fetch, matching how target fields are nested
    /// rather than projected onto the index.
    pub async fn list_schedules(
        &self,
        enabled_only: bool,
        cluster_name: Option<&str>,
        nodegroup_name: Option<&str>,
    ) -> Result<Vec<Schedule>> {
        let raw: Vec<HashMap<String, AttributeValue>> = if enabled_only {
            self.client
                .query()
                .table_name(&self.schedules_table)
                .index_name("enabled-schedules-index")
                .key_condition_expression("#enabled = :enabled")
                .expression_attribute_names("#enabled", "enabled")
                .expression_attribute_values(":enabled", AttributeValue::Bool(true))
                .send()
                .await
                .map_err(|e| Error::Transient(format!("list_schedules (enabled index) failed: {e}")))?
                .items()
                .to_vec()
        } else {
            self.client
                .scan()
                .table_name(&self.schedules_table)
                .filter_expression("begins_with(PK, :prefix) AND SK = :sk")
                .expression_attribute_values(":prefix", s("SCHEDULE#"))
                .expression_attribute_values(":sk", s("CONFIG"))
                .send()
                .await
                .map_err(|e| Error::Transient(format!("list_schedules (scan) failed: {e}")))?
                .items()
                .to_vec()
        };

        let schedules: Vec<Schedule> = raw.iter().map(attr::from_item).collect::<Result<_>>()?;

        Ok(schedules
            .into_iter()
            .filter(|sched| {
                let cluster_ok = cluster_name.is_none_or(|c| sched.target.cluster_name == c);
                let ng_ok = nodegroup_name.is_none_or(|n| sched.target.nodegroup_name == n);
                cluster_ok && ng_ok
            })
            .collect())
    }

    /// Applies only the fields `patch` sets; `None` leaves a field
    /// unchanged. Returns the updated schedule.
    pub async fn update_schedule(&self, schedule_id: &str, patch: &ScheduleUpdate, clock: &dyn Clock) -> Result<Schedule> {
        let now = clock.now();
        let mut update_expr = vec!["updated_at = :now".to_string()];
        let mut values: HashMap<String, AttributeValue> = HashMap::from([(":now".to_string(), s(now.to_rfc3339()))]);

        if let Some(v) = &patch.recurrence {
            update_expr.push("recurrence = :recurrence".to_string());
            values.insert(":recurrence".to_string(), s(v));
        }
        if let Some(v) = &patch.time_zone {
            update_expr.push("time_zone = :time_zone".to_string());
            values.insert(":time_zone".to_string(), s(v));
        }
        if let Some(v) = patch.desired {
            update_expr.push("desired = :desired".to_string());
            values.insert(":desired".to_string(), attr::n(v));
        }
        if let Some(v) = patch.min {
            update_expr.push("min = :min".to_string());
            values.insert(":min".to_string(), attr::n(v));
        }
        if let Some(v) = patch.max {
            update_expr.push("max = :max".to_string());
            values.insert(":max".to_string(), attr::n(v));
        }
        if let Some(v) = patch.enabled {
            update_expr.push("enabled = :enabled".to_string());
            values.insert(":enabled".to_string(), AttributeValue::Bool(v));
        }
        if let Some(paused_until) = &patch.paused_until {
            match paused_until {
                Some(at) => {
                    update_expr.push("paused_until = :paused_until".to_string());
                    values.insert(":paused_until".to_string(), s(at.to_rfc3339()));
                }
                None => {
                    update_expr.push("paused_until = :paused_until".to_string());
                    values.insert(":paused_until".to_string(), AttributeValue::Null(true));
                }
            }
        }

        let resp = self
            .client
            .update_item()
            .table_name(&self.schedules_table)
            .key("PK", s(format!("SCHEDULE#{schedule_id}")))
            .key("SK", s("CONFIG"))
            .update_expression(format!("SET {}", update_expr.join(", ")))
            .set_expression_attribute_values(Some(values))
            .return_values(aws_sdk_dynamodb::types::ReturnValue::AllNew)
            .send()
            .await
            .map_err(|e| Error::Transient(format!("update_schedule failed: {e}")))?;

        let attrs = resp.attributes.ok_or_else(|| Error::not_found(format!("schedule {schedule_id} not found")))?;
        attr::from_item(&attrs)
    }

    /// Soft-delete: disables the schedule rather than removing its row,
    /// so history and mapping-conflict checks keep working against it.
    pub async fn delete_schedule(&self, schedule_id: &str, clock: &dyn Clock) -> Result<()> {
        let patch = ScheduleUpdate { enabled: Some(false), ..Default::default() };
        self.update_schedule(schedule_id, &patch, clock).await?;
        Ok(())
    }

    pub async fn pause_schedule(&self, schedule_id: &str, until: Option<DateTime<Utc>>, clock: &dyn Clock) -> Result<Schedule> {
        let patch = ScheduleUpdate { enabled: Some(false), paused_until: Some(until), ..Default::default() };
        self.update_schedule(schedule_id, &patch, clock).await
    }

    pub async fn record_execution(&self, execution: &ScheduleExecution, clock: &dyn Clock) -> Result<()> {
        let ttl = clock.now().timestamp() + EXECUTION_TTL_SECONDS;
        let mut item = attr::to_item(execution);
        item.insert("PK".to_string(), s(format!("SCHEDULE#{}", execution.schedule_id)));
        item.insert("SK".to_string(), s(format!("EXEC#{}", execution.executed_at.to_rfc3339())));
        item.insert("ttl".to_string(), attr::n(ttl));

        self.client
            .put_item()
            .table_name(&self.schedules_table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| Error::Transient(format!("record_execution failed: {e}")))?;
        Ok(())
    }

    pub async fn get_schedule_history(&self, schedule_id: &str, limit: i32) -> Result<Vec<ScheduleExecution>> {
        let resp = self
            .client
            .query()
            .table_name(&self.schedules_table)
            .key_condition_expression("PK = :pk AND begins_with(SK, :prefix)")
            .expression_attribute_values(":pk", s(format!("SCHEDULE#{schedule_id}")))
            .expression_attribute_values(":prefix", s("EXEC#"))
            .scan_index_forward(false)
            .limit(limit)
            .send()
            .await
            .map_err(|e| Error::Transient(format!("get_schedule_history failed: {e}")))?;

        resp.items().iter().map(attr::from_item).collect()
    }
}
