use aws_config::BehaviorVersion;
use fleet_bus::{Bus, fan_out_operation};
use fleet_common::clock::Clock;
use fleet_common::error::{Error, Result};
use fleet_credentials::CredentialBroker;
use fleet_discovery::{asg, list_region_asgs};
use fleet_store::Store;
use fleet_types::{Action, Cluster};

#[derive(Debug, Clone, Default)]
pub struct TriggerResult {
    pub operation_id: Option<String>,
    pub clusters_queued: usize,
    pub nodegroups_queued: usize,
}

/// Resolves a schedule's single `(account, region, cluster, nodegroup)`
/// target by re-describing it directly, rather than through the
/// label-filtered fleet discovery pass: a schedule owns exactly one ASG,
/// so there is nothing to search for beyond that one resolution. This is
/// this fleet's equivalent of resolving an explicitly named cluster
/// reference instead of a label filter.
pub async fn resolve_schedule_target(broker: &CredentialBroker, target: &fleet_types::ScheduleTarget) -> Result<Option<Cluster>> {
    let session = broker
        .session(&target.account_id, &target.region)
        .await
        .map_err(|e| Error::AssumeRole(e.to_string()))?;

    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(aws_config::Region::new(target.region.clone()))
        .credentials_provider(session.credentials_provider())
        .load()
        .await;
    let eks = aws_sdk_eks::Client::new(&config);

    let described = eks
        .describe_cluster()
        .name(&target.cluster_name)
        .send()
        .await
        .map_err(|e| Error::not_found(format!("describe_cluster({}) failed: {e}", target.cluster_name)))?;
    let Some(cluster_meta) = described.cluster() else {
        return Ok(None);
    };
    let tags: std::collections::BTreeMap<String, String> = cluster_meta
        .tags()
        .map(|tags| tags.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();

    let candidate = Cluster {
        account_id: target.account_id.clone(),
        region: target.region.clone(),
        cluster_name: target.cluster_name.clone(),
        tags,
        node_groups: Vec::new(),
    };

    if candidate.is_production() {
        tracing::warn!(cluster = %target.cluster_name, "schedule target is tagged production, refusing to resolve it");
        return Ok(None);
    }

    let all_asgs = list_region_asgs(&session, &target.region).await?;
    let Some(raw) = asg::resolve_single(&all_asgs, &target.cluster_name, &target.nodegroup_name) else {
        return Ok(None);
    };

    Ok(Some(Cluster { node_groups: vec![asg::normalize(raw)], ..candidate }))
}

/// Triggers an operation from a schedule: resolves its target, applies
/// `target_{desired,min,max}` onto the (single) resulting node group,
/// creates the operation row, and fans it out to the bus.
pub async fn trigger_schedule_operation(
    broker: &CredentialBroker,
    store: &Store,
    bus: &dyn Bus,
    schedule: &fleet_types::Schedule,
    action: Action,
    clock: &dyn Clock,
) -> Result<TriggerResult> {
    let Some(cluster) = resolve_schedule_target(broker, &schedule.target).await? else {
        tracing::warn!(schedule_id = %schedule.schedule_id, "no cluster matched schedule target");
        return Ok(TriggerResult::default());
    };

    let operation_id = uuid::Uuid::new_v4().to_string();
    let initiated_by = format!("schedule:{}", schedule.schedule_id);
    let clusters = vec![cluster];

    store
        .create_operation(&operation_id, action, &initiated_by, &clusters, Some(schedule.schedule_id.clone()), clock)
        .await?;

    let scale_target = matches!(action, Action::Scale).then_some((schedule.desired, schedule.min, schedule.max));
    let fan_out = fan_out_operation(bus, &operation_id, action, &clusters, &initiated_by, scale_target).await;

    Ok(TriggerResult {
        operation_id: Some(operation_id),
        clusters_queued: fan_out.clusters_count,
        nodegroups_queued: fan_out.nodegroups_count,
    })
}
