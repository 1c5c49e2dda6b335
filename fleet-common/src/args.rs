use crate::logging::LogFormat;
use clap::Parser;

/// Credential broker and account/region scope configuration.
#[derive(Parser, Debug, Clone)]
pub struct AwsArgs {
    /// Account that hosts the operator role assumed into every target account.
    #[arg(long, env = "MANAGEMENT_ACCOUNT_ID")]
    pub management_account_id: String,

    /// Comma-separated target account ids. Empty means "discover via Organizations".
    #[arg(long, env = "TARGET_ACCOUNT_IDS", value_delimiter = ',', default_value = "")]
    pub target_account_ids: Vec<String>,

    /// Role name assumed in each target account, as `role/{operator_role_name}`.
    #[arg(long, env = "OPERATOR_ROLE_NAME", default_value = "eks-operator-spoke")]
    pub operator_role_name: String,

    /// Shared secret required by the target role's trust policy.
    #[arg(long, env = "EXTERNAL_ID")]
    pub external_id: String,

    /// Region the management-account client itself runs in.
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    pub aws_region: String,

    /// Comma-separated regions to discover within each target account.
    #[arg(long, env = "TARGET_REGIONS", value_delimiter = ',')]
    pub target_regions: Vec<String>,

    /// Bound on concurrent (account, region) discovery tasks.
    #[arg(long, env = "MAX_DISCOVERY_WORKERS", default_value = "10")]
    pub max_discovery_workers: usize,
}

impl AwsArgs {
    pub fn target_account_ids(&self) -> Vec<String> {
        self.target_account_ids
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// DynamoDB-backed document store configuration.
#[derive(Parser, Debug, Clone)]
pub struct StoreArgs {
    #[arg(long, env = "DYNAMODB_OPERATIONS_TABLE")]
    pub dynamodb_operations_table: String,

    #[arg(long, env = "DYNAMODB_CLUSTER_STATE_TABLE")]
    pub dynamodb_cluster_state_table: String,

    #[arg(long, env = "DYNAMODB_SCHEDULES_TABLE")]
    pub dynamodb_schedules_table: String,
}

/// Fan-out bus configuration. Replaces the distilled spec's
/// `sns_topic_arn`/`sqs_queue_url` pair with this fleet's own NATS
/// JetStream bus; the wire message schema is unchanged.
#[derive(Parser, Debug, Clone)]
pub struct BusArgs {
    #[arg(long, env = "NATS_URL", default_value = "nats://127.0.0.1:4222")]
    pub nats_url: String,

    #[arg(long, env = "BUS_STREAM_NAME", default_value = "fleet-ops")]
    pub bus_stream_name: String,
}

impl BusArgs {
    pub async fn connect(&self) -> Result<async_nats::Client, async_nats::ConnectError> {
        async_nats::connect(&self.nats_url).await
    }
}

/// Worker/poller tuning knobs shared across binaries.
#[derive(Parser, Debug, Clone)]
pub struct OperationalArgs {
    /// Visibility timeout, in seconds, a worker holds a message before the
    /// bus considers it abandoned and redelivers it.
    #[arg(long, env = "TASK_VISIBILITY_TIMEOUT", default_value = "900")]
    pub task_visibility_timeout: u64,

    /// Upper bound on concurrently in-flight worker invocations.
    #[arg(long, env = "LAMBDA_MAX_CONCURRENCY", default_value = "10")]
    pub lambda_max_concurrency: usize,
}

#[derive(Parser, Debug, Clone)]
pub struct LoggingArgs {
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "pretty")]
    pub log_format: LogFormat,

    /// Port the Prometheus `/metrics` endpoint listens on. 0 disables it.
    #[arg(long, env = "METRICS_PORT", default_value = "0")]
    pub metrics_port: u16,
}
