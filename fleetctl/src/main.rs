use clap::Parser;

mod args;
mod context;
mod discover;
mod operate;
mod operation;
mod schedule;

use args::{Cli, Commands};
use context::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    fleet_common::logging::init(cli.logging.log_format);

    let ctx = Context::build(&cli).await?;

    let result = match &cli.command {
        Commands::Discover(args) => discover::run(&ctx, args).await,
        Commands::Stop(args) => operate::run_stop(&ctx, args).await,
        Commands::Start(args) => operate::run_start(&ctx, args).await,
        Commands::Scale(args) => operate::run_scale(&ctx, args).await,
        Commands::Operation(cmd) => operation::run(&ctx, cmd).await,
        Commands::Schedule(cmd) => schedule::run(&ctx, cmd).await,
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "command failed");
    }
    result
}
