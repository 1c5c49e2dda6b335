use crate::args::DiscoverArgs;
use crate::context::Context;
use std::collections::BTreeMap;

pub async fn run(ctx: &Context, args: &DiscoverArgs) -> anyhow::Result<()> {
    let label_filter = if args.labels.is_empty() { None } else { Some(args.labels.iter().cloned().collect::<BTreeMap<_, _>>()) };

    let clusters = ctx.discovery.discover(label_filter.as_ref()).await;
    println!("{}", serde_json::to_string_pretty(&clusters)?);
    tracing::info!(count = clusters.len(), "discovery complete");
    Ok(())
}
