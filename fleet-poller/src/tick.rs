use crate::args::PollerArgs;
use fleet_bus::NatsBus;
use fleet_common::clock::system_clock;
use fleet_common::shutdown::wire_shutdown;
use fleet_credentials::CredentialBroker;
use fleet_schedule::ScheduleManager;
use fleet_store::Store;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Drives [`fleet_schedule::poll_once`] on a `tokio::time::interval(60s)`
/// tick, under the same shutdown idiom as the worker. `--once` runs a
/// single tick and exits, for deployments that prefer a Kubernetes
/// `CronJob` over a long-running process.
pub async fn run(args: PollerArgs) -> anyhow::Result<()> {
    fleet_common::logging::init(args.logging.log_format);

    tracing::info!("starting schedule poller");

    let sts = aws_sdk_sts::Client::new(&aws_config::defaults(aws_config::BehaviorVersion::latest()).load().await);
    let broker = CredentialBroker::new(sts, &args.aws.management_account_id, &args.aws.operator_role_name, &args.aws.external_id);

    let dynamodb = aws_sdk_dynamodb::Client::new(&aws_config::defaults(aws_config::BehaviorVersion::latest()).load().await);
    let store = Store::new(
        dynamodb,
        args.store.dynamodb_operations_table.clone(),
        args.store.dynamodb_cluster_state_table.clone(),
        args.store.dynamodb_schedules_table.clone(),
    );

    let bus = NatsBus::connect(&args.bus.nats_url, &args.bus.bus_stream_name, vec!["fleet.ops.>".to_string()]).await?;

    let manager = ScheduleManager::new(Arc::new(store.clone()));
    let clock = system_clock();

    if args.once {
        let summary = fleet_schedule::poll_once(&manager, &broker, &store, &bus, clock.as_ref()).await;
        tracing::info!(?summary, "poll tick complete");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    wire_shutdown(cancel.clone());

    let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!("shutdown signal received, stopping poller");
                break;
            }
            _ = interval.tick() => {
                let summary = fleet_schedule::poll_once(&manager, &broker, &store, &bus, clock.as_ref()).await;
                tracing::info!(?summary, "poll tick complete");
            }
        }
    }

    tracing::info!("poller stopped");
    Ok(())
}
