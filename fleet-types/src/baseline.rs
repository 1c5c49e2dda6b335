use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Captured `(desired, min, max)` sizes recorded before a stop, so a later
/// start can restore them. Keyed by `(cluster_id, nodegroup_name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    pub cluster_id: String,
    pub nodegroup_name: String,
    pub desired: i32,
    pub min: i32,
    pub max: i32,
    pub version: u32,
    pub saved_at: DateTime<Utc>,
}

impl Baseline {
    pub fn new(cluster_id: impl Into<String>, nodegroup_name: impl Into<String>, desired: i32, min: i32, max: i32, saved_at: DateTime<Utc>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            nodegroup_name: nodegroup_name.into(),
            desired,
            min,
            max,
            version: 1,
            saved_at,
        }
    }
}
