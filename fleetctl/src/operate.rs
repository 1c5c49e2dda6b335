use crate::args::{ScaleArgs, StartArgs, StopArgs};
use crate::context::{Context, split_cluster_id};
use aws_config::BehaviorVersion;
use fleet_bus::fan_out_operation;
use fleet_common::clock::system_clock;
use fleet_discovery::asg;
use fleet_types::{Action, CapacityType, Cluster, NodeGroup, NodeGroupStatus};

/// Re-describes exactly one named cluster and its associated ASGs,
/// applying the mandatory production guard. Used by `stop --cluster` and
/// `scale`, which name a cluster explicitly rather than relying on a
/// fresh discovery pass over the whole fleet.
async fn resolve_single_cluster(ctx: &Context, account_id: &str, region: &str, cluster_name: &str) -> anyhow::Result<Option<Cluster>> {
    let session = ctx.broker.session(account_id, region).await?;

    let eks_config = aws_config::defaults(BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()))
        .credentials_provider(session.credentials_provider())
        .load()
        .await;
    let eks = aws_sdk_eks::Client::new(&eks_config);
    let described = eks.describe_cluster().name(cluster_name).send().await?;
    let Some(cluster_meta) = described.cluster() else {
        return Ok(None);
    };
    let tags: std::collections::BTreeMap<String, String> =
        cluster_meta.tags().map(|tags| tags.iter().map(|(k, v)| (k.clone(), v.clone())).collect()).unwrap_or_default();

    let candidate = Cluster {
        account_id: account_id.to_string(),
        region: region.to_string(),
        cluster_name: cluster_name.to_string(),
        tags,
        node_groups: Vec::new(),
    };

    if candidate.is_production() {
        tracing::warn!(cluster = %cluster_name, "cluster is tagged production, refusing to resolve it");
        return Ok(None);
    }

    let asgs = fleet_discovery::list_region_asgs(&session, region).await?;
    let node_groups = asg::associate_cluster(&asgs, cluster_name).into_iter().map(asg::normalize).collect();

    Ok(Some(Cluster { node_groups, ..candidate }))
}

pub async fn run_stop(ctx: &Context, args: &StopArgs) -> anyhow::Result<()> {
    let clusters = match (&args.cluster, args.all) {
        (Some(_), true) => anyhow::bail!("--cluster and --all are mutually exclusive"),
        (None, false) => anyhow::bail!("specify either --cluster <id> or --all"),
        (Some(cluster_id), false) => {
            let (account_id, region, cluster_name) = split_cluster_id(cluster_id)?;
            resolve_single_cluster(ctx, &account_id, &region, &cluster_name).await?.into_iter().collect()
        }
        (None, true) => ctx.discovery.discover(None).await,
    };

    if clusters.is_empty() {
        anyhow::bail!("no clusters matched");
    }

    create_and_fan_out(ctx, Action::Stop, &clusters, &args.initiated_by, None).await
}

pub async fn run_start(ctx: &Context, args: &StartArgs) -> anyhow::Result<()> {
    let Some(source) = ctx.store.get_full_operation_summary(&args.operation).await? else {
        anyhow::bail!("source operation {} not found", args.operation);
    };
    if !matches!(source.meta.action, Action::Stop) {
        anyhow::bail!("source operation must be a stop operation");
    }

    let mut clusters = Vec::with_capacity(source.clusters.len());
    for cluster_summary in source.clusters {
        let (account_id, region, cluster_name) = split_cluster_id(&cluster_summary.cluster.cluster_id)?;
        let node_groups = cluster_summary
            .nodegroups
            .into_iter()
            .map(|ng| NodeGroup {
                name: ng.nodegroup_name,
                asg_name: String::new(),
                desired: ng.original_desired,
                min: ng.original_min,
                max: ng.original_max,
                instance_types: Vec::new(),
                capacity_type: CapacityType::OnDemand,
                status: NodeGroupStatus::Stopped,
                tags: Default::default(),
            })
            .collect();
        clusters.push(Cluster { account_id, region, cluster_name, tags: Default::default(), node_groups });
    }

    create_and_fan_out(ctx, Action::Start, &clusters, &args.initiated_by, None).await
}

pub async fn run_scale(ctx: &Context, args: &ScaleArgs) -> anyhow::Result<()> {
    let (account_id, region, cluster_name) = split_cluster_id(&args.cluster)?;
    let Some(cluster) = resolve_single_cluster(ctx, &account_id, &region, &cluster_name).await? else {
        anyhow::bail!("no clusters matched");
    };
    if cluster.node_groups.is_empty() {
        anyhow::bail!("no clusters matched");
    }

    // `--min`/`--max` default to each nodegroup's current value, so an
    // unspecified bound passes through as "no change" the way the
    // capacity controller's own nil-field semantics intend.
    let scale_target = (args.desired, args.min.unwrap_or(cluster.node_groups[0].min), args.max.unwrap_or(cluster.node_groups[0].max));

    create_and_fan_out(ctx, Action::Scale, &[cluster], &args.initiated_by, Some(scale_target)).await
}

async fn create_and_fan_out(ctx: &Context, action: Action, clusters: &[Cluster], initiated_by: &str, scale_target: Option<(i32, i32, i32)>) -> anyhow::Result<()> {
    let clock = system_clock();
    let operation_id = uuid::Uuid::new_v4().to_string();

    ctx.store.create_operation(&operation_id, action, initiated_by, clusters, None, clock.as_ref()).await?;
    let fan_out = fan_out_operation(&ctx.bus, &operation_id, action, clusters, initiated_by, scale_target).await;

    println!(
        "{}",
        serde_json::json!({
            "operation_id": operation_id,
            "clusters_queued": fan_out.clusters_count,
            "nodegroups_queued": fan_out.nodegroups_count,
            "published": fan_out.published_count,
        })
    );
    Ok(())
}
