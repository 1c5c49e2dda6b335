use clap::Parser;
use fleet_common::args::{AwsArgs, BusArgs, LoggingArgs, StoreArgs};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Evaluates enabled schedules once a minute and triggers due ones", long_about = None)]
pub struct PollerArgs {
    #[command(flatten)]
    pub aws: AwsArgs,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub bus: BusArgs,

    #[command(flatten)]
    pub logging: LoggingArgs,

    /// Run a single tick, then exit.
    #[arg(long)]
    pub once: bool,
}
