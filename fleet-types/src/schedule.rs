use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTarget {
    pub account_id: String,
    pub region: String,
    pub cluster_name: String,
    pub nodegroup_name: String,
}

impl ScheduleTarget {
    /// `"{account}:{region}:{cluster}:{nodegroup}"`, the key under which
    /// the owning schedule id is recorded in the mapping row.
    pub fn nodegroup_fqn(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.account_id, self.region, self.cluster_name, self.nodegroup_name
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub schedule_id: String,
    pub recurrence: String,
    pub time_zone: String,
    pub desired: i32,
    pub min: i32,
    pub max: i32,
    pub target: ScheduleTarget,
    pub enabled: bool,
    pub paused_until: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a caller may patch via `ScheduleManager::update`. `None` means
/// "leave unchanged" — distinct from an explicit null, which this system
/// never needs since every field here is otherwise required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleUpdate {
    pub recurrence: Option<String>,
    pub time_zone: Option<String>,
    pub desired: Option<i32>,
    pub min: Option<i32>,
    pub max: Option<i32>,
    pub enabled: Option<bool>,
    pub paused_until: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleExecution {
    pub schedule_id: String,
    pub executed_at: DateTime<Utc>,
    pub action: crate::operation::Action,
    pub operation_id: String,
    pub nodegroup_count: usize,
}
