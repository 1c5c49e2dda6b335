use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Stop,
    Start,
    Scale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pending,
    InProgress,
    Completed,
    Failed,
    PartialFailure,
    Unknown,
}

/// Folds the statuses of a row's children into its own aggregate status.
/// Pure and total: the same rules apply whether folding NG statuses into a
/// CLUSTER row or CLUSTER statuses into the META row.
///
/// Rules, in order:
///   - empty                                      -> UNKNOWN
///   - the only distinct status is COMPLETED       -> COMPLETED
///   - the only distinct status is FAILED          -> FAILED
///   - any PENDING or IN_PROGRESS present          -> IN_PROGRESS
///   - distinct statuses are exactly {COMPLETED, FAILED} -> PARTIAL_FAILURE
///   - otherwise                                   -> IN_PROGRESS
pub fn derive(statuses: &[Status]) -> Status {
    if statuses.is_empty() {
        return Status::Unknown;
    }

    let distinct: BTreeSet<Status> = statuses.iter().copied().collect();

    if distinct == BTreeSet::from([Status::Completed]) {
        return Status::Completed;
    }
    if distinct == BTreeSet::from([Status::Failed]) {
        return Status::Failed;
    }
    if distinct.contains(&Status::Pending) || distinct.contains(&Status::InProgress) {
        return Status::InProgress;
    }
    if distinct == BTreeSet::from([Status::Completed, Status::Failed]) {
        return Status::PartialFailure;
    }
    Status::InProgress
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationMeta {
    pub operation_id: String,
    pub action: Action,
    pub status: Status,
    pub initiated_by: String,
    pub schedule_id: Option<String>,
    pub total_clusters: usize,
    pub total_nodegroups: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ttl: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationCluster {
    pub operation_id: String,
    pub cluster_id: String,
    pub status: Status,
    pub updated_at: DateTime<Utc>,
    pub ttl: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationNodeGroup {
    pub operation_id: String,
    pub ng_id: String,
    pub cluster_id: String,
    pub nodegroup_name: String,
    pub action: Action,
    pub status: Status,
    pub original_desired: i32,
    pub original_min: i32,
    pub original_max: i32,
    pub current_desired: Option<i32>,
    pub retry_count: u32,
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub ttl: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use Status::*;

    #[test]
    fn empty_is_unknown() {
        assert_eq!(derive(&[]), Unknown);
    }

    #[test]
    fn all_completed_is_completed() {
        assert_eq!(derive(&[Completed, Completed]), Completed);
    }

    #[test]
    fn all_failed_is_failed() {
        assert_eq!(derive(&[Failed, Failed]), Failed);
    }

    #[test]
    fn any_pending_or_in_progress_dominates() {
        assert_eq!(derive(&[Completed, Pending]), InProgress);
        assert_eq!(derive(&[Failed, InProgress]), InProgress);
        assert_eq!(derive(&[Pending]), InProgress);
    }

    #[test]
    fn completed_and_failed_only_is_partial_failure() {
        assert_eq!(derive(&[Completed, Failed]), PartialFailure);
        assert_eq!(derive(&[Completed, Completed, Failed]), PartialFailure);
    }

    #[test]
    fn s4_scenario_two_completed_one_failed() {
        // Batch of 3 messages, middle one fails: CLUSTER and META both
        // become PARTIAL_FAILURE.
        let ng_statuses = [Completed, Failed, Completed];
        assert_eq!(derive(&ng_statuses), PartialFailure);
    }
}
