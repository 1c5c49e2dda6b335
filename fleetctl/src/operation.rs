use crate::args::OperationCommands;
use crate::context::Context;

pub async fn run(ctx: &Context, cmd: &OperationCommands) -> anyhow::Result<()> {
    match cmd {
        OperationCommands::Get { operation_id } => {
            let Some(summary) = ctx.store.get_full_operation_summary(operation_id).await? else {
                anyhow::bail!("operation {operation_id} not found");
            };
            println!("{}", serde_json::to_string_pretty(&summary_json(&summary))?);
        }
        OperationCommands::List { limit } => {
            let operations = ctx.store.list_operations(*limit).await?;
            println!("{}", serde_json::to_string_pretty(&operations)?);
        }
    }
    Ok(())
}

/// `OperationSummary` isn't itself `Serialize` (its nested `ClusterSummary`
/// isn't either) since it's a store-internal read shape; fold it into a
/// plain JSON value for display here rather than adding a serde impl the
/// store itself has no use for.
fn summary_json(summary: &fleet_store::OperationSummary) -> serde_json::Value {
    serde_json::json!({
        "meta": summary.meta,
        "clusters": summary.clusters.iter().map(|c| serde_json::json!({
            "cluster": c.cluster,
            "nodegroups": c.nodegroups,
        })).collect::<Vec<_>>(),
    })
}
