use clap::Parser;
use fleet_common::args::{AwsArgs, BusArgs, LoggingArgs, OperationalArgs, StoreArgs};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Consumes fan-out messages and applies stop/start/scale to ASGs", long_about = None)]
pub struct WorkerArgs {
    #[command(flatten)]
    pub aws: AwsArgs,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub bus: BusArgs,

    #[command(flatten)]
    pub operational: OperationalArgs,

    #[command(flatten)]
    pub logging: LoggingArgs,

    /// Durable JetStream consumer name.
    #[arg(long, env = "CONSUMER_NAME", default_value = "fleet-worker")]
    pub consumer_name: String,

    /// Process one batch of currently-available messages, then exit.
    #[arg(long)]
    pub once: bool,
}
