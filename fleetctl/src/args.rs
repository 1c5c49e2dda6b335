use clap::{Args, Parser, Subcommand};
use fleet_common::args::{AwsArgs, BusArgs, LoggingArgs, StoreArgs};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Operator CLI for fleet discovery, operations, and schedules", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub aws: AwsArgs,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub bus: BusArgs,

    #[command(flatten)]
    pub logging: LoggingArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List eligible clusters and their nodegroups.
    Discover(DiscoverArgs),
    /// Stop one or all eligible clusters' nodegroups.
    Stop(StopArgs),
    /// Start nodegroups, restoring sizes recorded by a prior stop operation.
    Start(StartArgs),
    /// Scale one cluster's nodegroups to an explicit target.
    Scale(ScaleArgs),
    /// Inspect operations.
    #[command(subcommand)]
    Operation(OperationCommands),
    /// Manage schedules.
    #[command(subcommand)]
    Schedule(ScheduleCommands),
}

#[derive(Args, Debug, Clone)]
pub struct DiscoverArgs {
    /// Tag filter as `key=value`; repeatable, all must match.
    #[arg(long = "label", value_parser = parse_label)]
    pub labels: Vec<(String, String)>,
}

#[derive(Args, Debug, Clone)]
pub struct StopArgs {
    /// `{account_id}:{region}:{cluster_name}`. Mutually exclusive with `--all`.
    #[arg(long)]
    pub cluster: Option<String>,

    /// Stop every eligible cluster returned by discovery.
    #[arg(long)]
    pub all: bool,

    #[arg(long, default_value = "fleetctl")]
    pub initiated_by: String,
}

#[derive(Args, Debug, Clone)]
pub struct StartArgs {
    /// Operation id of the stop operation to restore from.
    #[arg(long)]
    pub operation: String,

    #[arg(long, default_value = "fleetctl")]
    pub initiated_by: String,
}

#[derive(Args, Debug, Clone)]
pub struct ScaleArgs {
    /// `{account_id}:{region}:{cluster_name}`.
    #[arg(long)]
    pub cluster: String,

    #[arg(long)]
    pub desired: i32,

    #[arg(long)]
    pub min: Option<i32>,

    #[arg(long)]
    pub max: Option<i32>,

    #[arg(long, default_value = "fleetctl")]
    pub initiated_by: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum OperationCommands {
    /// Show one operation's META/CLUSTER/NG summary.
    Get { operation_id: String },
    /// Show the most recent operations.
    List {
        #[arg(long, default_value = "5")]
        limit: usize,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ScheduleCommands {
    Create(ScheduleCreateArgs),
    Get { schedule_id: String },
    List {
        #[arg(long)]
        enabled_only: bool,
        #[arg(long)]
        cluster_name: Option<String>,
        #[arg(long)]
        nodegroup_name: Option<String>,
    },
    Update(ScheduleUpdateArgs),
    Delete { schedule_id: String },
    Pause {
        schedule_id: String,
        /// RFC 3339 timestamp to auto-resume at; omit to pause indefinitely.
        #[arg(long)]
        until: Option<chrono::DateTime<chrono::Utc>>,
    },
    History {
        schedule_id: String,
        #[arg(long, default_value = "20")]
        limit: i32,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ScheduleCreateArgs {
    #[arg(long)]
    pub name: String,
    /// 5-field cron expression, evaluated in `--time-zone`.
    #[arg(long)]
    pub recurrence: String,
    #[arg(long, default_value = "UTC")]
    pub time_zone: String,
    #[arg(long)]
    pub desired: i32,
    #[arg(long)]
    pub min: i32,
    #[arg(long)]
    pub max: i32,
    #[arg(long)]
    pub account_id: String,
    #[arg(long)]
    pub region: String,
    #[arg(long)]
    pub cluster_name: String,
    #[arg(long)]
    pub nodegroup_name: String,
    #[arg(long, default_value = "fleetctl")]
    pub created_by: String,
}

#[derive(Args, Debug, Clone)]
pub struct ScheduleUpdateArgs {
    pub schedule_id: String,
    #[arg(long)]
    pub recurrence: Option<String>,
    #[arg(long)]
    pub time_zone: Option<String>,
    #[arg(long)]
    pub desired: Option<i32>,
    #[arg(long)]
    pub min: Option<i32>,
    #[arg(long)]
    pub max: Option<i32>,
    #[arg(long)]
    pub enabled: Option<bool>,
}

fn parse_label(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=').map(|(k, v)| (k.to_string(), v.to_string())).ok_or_else(|| format!("expected key=value, got {raw}"))
}
