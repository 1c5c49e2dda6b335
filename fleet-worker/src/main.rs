use clap::Parser;

mod args;
mod consumer;
mod dispatch;

use args::WorkerArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = WorkerArgs::parse();
    consumer::run(args).await
}
