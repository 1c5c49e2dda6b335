use fleet_capacity::CapacityController;
use fleet_common::clock::Clock;
use fleet_common::error::Result;
use fleet_credentials::CredentialBroker;
use fleet_discovery::{asg, list_region_asgs};
use fleet_store::Store;
use fleet_types::{Action, Baseline, BusMessage, Status};
use tokio_util::sync::CancellationToken;

/// What happened to a message, short of a hard failure. [`Outcome::Dropped`]
/// is reported exactly like a success to the caller — it's a message the
/// worker correctly decided never to act on, not a failure to redeliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Processed,
    Dropped,
}

/// Handles one [`BusMessage`]: re-resolves its target ASG (the cached
/// resolution in the message may be stale), dispatches by `action`, and
/// updates the NG row. Any error bubbles up after the NG row is marked
/// `FAILED`, so the caller leaves the underlying bus message un-acked.
pub async fn handle_message(
    message: &BusMessage,
    store: &Store,
    broker: &CredentialBroker,
    controller: &CapacityController,
    clock: &dyn Clock,
    cancel: &CancellationToken,
) -> Result<Outcome> {
    match try_handle(message, store, broker, controller, clock, cancel).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            tracing::error!(
                operation_id = %message.operation_id,
                ng_id = %message.nodegroup_id,
                error = %e,
                "failed to process message"
            );
            if let Err(update_err) = store
                .update_nodegroup_status(
                    &message.operation_id,
                    &message.cluster_id,
                    &message.nodegroup_id,
                    Status::Failed,
                    Some(&e.to_string()),
                    None,
                    clock,
                )
                .await
            {
                tracing::error!(error = %update_err, "failed to record NG failure status");
            }
            Err(e)
        }
    }
}

async fn try_handle(
    message: &BusMessage,
    store: &Store,
    broker: &CredentialBroker,
    controller: &CapacityController,
    clock: &dyn Clock,
    cancel: &CancellationToken,
) -> Result<Outcome> {
    let session = broker
        .session(&message.account_id, &message.region)
        .await
        .map_err(|e| fleet_common::Error::AssumeRole(e.to_string()))?;
    let candidates = list_region_asgs(&session, &message.region).await?;
    let Some(resolved) = asg::resolve_single(&candidates, &message.cluster_name, &message.nodegroup_name) else {
        tracing::warn!(
            cluster = %message.cluster_name,
            nodegroup = %message.nodegroup_name,
            "target ASG no longer resolves, dropping message"
        );
        return Ok(Outcome::Dropped);
    };
    let asg_name = resolved.name.as_str();

    let current_desired = match message.action {
        Action::Stop => dispatch_stop(message, store, controller, asg_name, clock, cancel).await?,
        Action::Start => dispatch_start(message, store, controller, asg_name, cancel).await?,
        Action::Scale => dispatch_scale(message, controller, asg_name, cancel).await?,
    };

    store
        .update_nodegroup_status(
            &message.operation_id,
            &message.cluster_id,
            &message.nodegroup_id,
            Status::Completed,
            None,
            Some(current_desired),
            clock,
        )
        .await?;

    Ok(Outcome::Processed)
}

async fn dispatch_stop(message: &BusMessage, store: &Store, controller: &CapacityController, asg_name: &str, clock: &dyn Clock, cancel: &CancellationToken) -> Result<i32> {
    let outcome = controller
        .stop_nodegroup(&message.account_id, &message.region, &message.cluster_name, &message.nodegroup_name, Some(asg_name), cancel)
        .await?;

    let original = match outcome {
        fleet_capacity::StopOutcome::Applied { original, .. } => original,
        fleet_capacity::StopOutcome::AlreadyAtZero { original } => original,
    };

    let baseline = Baseline::new(message.cluster_id.clone(), message.nodegroup_name.clone(), original.desired, original.min, original.max, clock.now());
    store.save_baseline(&baseline).await?;

    Ok(0)
}

async fn dispatch_start(message: &BusMessage, store: &Store, controller: &CapacityController, asg_name: &str, cancel: &CancellationToken) -> Result<i32> {
    let restore = match store.get_baseline(&message.cluster_id, &message.nodegroup_name).await? {
        Some(baseline) => (baseline.desired, baseline.min, baseline.max),
        None => {
            tracing::warn!(
                cluster_id = %message.cluster_id,
                nodegroup = %message.nodegroup_name,
                "no baseline recorded for start, falling back to current min_size"
            );
            let current = controller
                .describe_nodegroup(&message.account_id, &message.region, &message.cluster_name, &message.nodegroup_name, Some(asg_name), cancel)
                .await?;
            (current.min, current.min, current.min)
        }
    };

    controller
        .start_nodegroup(
            &message.account_id,
            &message.region,
            &message.cluster_name,
            &message.nodegroup_name,
            Some(asg_name),
            restore.0,
            restore.1,
            restore.2,
            cancel,
        )
        .await?;

    store.delete_baseline(&message.cluster_id, &message.nodegroup_name).await?;

    Ok(restore.0)
}

async fn dispatch_scale(message: &BusMessage, controller: &CapacityController, asg_name: &str, cancel: &CancellationToken) -> Result<i32> {
    let sizes = controller
        .scale_nodegroup(
            &message.account_id,
            &message.region,
            &message.cluster_name,
            &message.nodegroup_name,
            Some(asg_name),
            message.target_desired,
            message.target_min,
            message.target_max,
            cancel,
        )
        .await?;
    Ok(sizes.desired)
}
