use clap::Parser;

mod args;
mod tick;

use args::PollerArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = PollerArgs::parse();
    tick::run(args).await
}
