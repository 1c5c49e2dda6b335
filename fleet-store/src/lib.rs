mod attr;
pub mod baseline;
pub mod lock;
pub mod operations;
pub mod schedules;

pub use operations::{ClusterSummary, OperationSummary};

use aws_sdk_dynamodb::Client;

/// DynamoDB-backed persistence for operations, baselines, and schedules.
/// One client, three tables, matching the three `dynamodb_*_table`
/// configuration keys. Every method here is a thin, typed wrapper around
/// a single `get_item`/`put_item`/`update_item`/`query` call; the
/// item-shape conversions live in [`attr`].
#[derive(Clone)]
pub struct Store {
    client: Client,
    operations_table: String,
    cluster_state_table: String,
    schedules_table: String,
}

impl Store {
    pub fn new(
        client: Client,
        operations_table: impl Into<String>,
        cluster_state_table: impl Into<String>,
        schedules_table: impl Into<String>,
    ) -> Self {
        Self {
            client,
            operations_table: operations_table.into(),
            cluster_state_table: cluster_state_table.into(),
            schedules_table: schedules_table.into(),
        }
    }
}
