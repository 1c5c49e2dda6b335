use crate::args::WorkerArgs;
use crate::dispatch::{Outcome, handle_message};
use async_nats::jetstream::{self, consumer::PullConsumer};
use fleet_capacity::CapacityController;
use fleet_common::clock::{Clock, system_clock};
use fleet_common::error::Result;
use fleet_common::shutdown::wire_shutdown;
use fleet_credentials::CredentialBroker;
use fleet_store::Store;
use fleet_types::message::parse_payload;
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs the durable JetStream pull-consumer loop: connect, get-or-create
/// the stream and a durable consumer bound to `fleet.ops.>`, then select
/// over a shutdown signal and the message stream. Each message is acked
/// on success and left un-acked on failure so JetStream redelivers it —
/// the JetStream-native expression of a batch-item-failure list.
pub async fn run(args: WorkerArgs) -> anyhow::Result<()> {
    fleet_common::logging::init(args.logging.log_format);

    tracing::info!(consumer = %args.consumer_name, stream = %args.bus.bus_stream_name, "starting worker");

    let sts = aws_sdk_sts::Client::new(&aws_config::defaults(aws_config::BehaviorVersion::latest()).load().await);
    let broker = Arc::new(CredentialBroker::new(sts, &args.aws.management_account_id, &args.aws.operator_role_name, &args.aws.external_id));
    let controller = CapacityController::new(broker.clone());

    let dynamodb = aws_sdk_dynamodb::Client::new(&aws_config::defaults(aws_config::BehaviorVersion::latest()).load().await);
    let store = Store::new(
        dynamodb,
        args.store.dynamodb_operations_table.clone(),
        args.store.dynamodb_cluster_state_table.clone(),
        args.store.dynamodb_schedules_table.clone(),
    );

    let nats = args.bus.connect().await?;
    let jetstream = jetstream::new(nats);
    let stream = jetstream
        .get_or_create_stream(jetstream::stream::Config {
            name: args.bus.bus_stream_name.clone(),
            subjects: vec!["fleet.ops.>".to_string()],
            ..Default::default()
        })
        .await?;
    tracing::info!(stream = %args.bus.bus_stream_name, "connected to stream");

    let consumer: PullConsumer = stream
        .get_or_create_consumer(
            &args.consumer_name,
            jetstream::consumer::pull::Config {
                durable_name: Some(args.consumer_name.clone()),
                filter_subject: "fleet.ops.>".to_string(),
                ack_wait: std::time::Duration::from_secs(args.operational.task_visibility_timeout),
                max_ack_pending: args.operational.lambda_max_concurrency as i64,
                ..Default::default()
            },
        )
        .await?;
    tracing::info!(consumer = %args.consumer_name, "consumer ready");

    let clock = system_clock();

    if args.once {
        return run_once(consumer, &store, &broker, &controller, clock.as_ref()).await;
    }

    let cancel = CancellationToken::new();
    wire_shutdown(cancel.clone());

    let mut messages = consumer.messages().await?;
    tracing::info!("listening for fleet operation messages");

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!("shutdown signal received, stopping worker");
                break;
            }
            msg = messages.next() => {
                match msg {
                    Some(Ok(message)) => {
                        process_and_ack(message, &store, &broker, &controller, clock.as_ref(), &cancel).await;
                    }
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "error receiving message");
                    }
                    None => {
                        tracing::warn!("message stream ended unexpectedly");
                        break;
                    }
                }
            }
        }
    }

    tracing::info!("worker stopped");
    Ok(())
}

/// `--once`: drains whatever is currently available on the consumer, then
/// exits. Used for deployments that prefer per-invocation scheduling (a
/// Kubernetes `Job`/`CronJob`) over a long-running process.
async fn run_once(consumer: PullConsumer, store: &Store, broker: &CredentialBroker, controller: &CapacityController, clock: &dyn Clock) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let mut batch = consumer
        .batch()
        .max_messages(100)
        .expires(std::time::Duration::from_secs(2))
        .messages()
        .await?;

    let mut processed = 0usize;
    while let Some(msg) = batch.next().await {
        match msg {
            Ok(message) => {
                process_and_ack(message, store, broker, controller, clock, &cancel).await;
                processed += 1;
            }
            Err(e) => tracing::error!(error = %e, "error receiving message"),
        }
    }
    tracing::info!(processed, "worker batch complete");
    Ok(())
}

async fn process_and_ack(
    message: async_nats::jetstream::Message,
    store: &Store,
    broker: &CredentialBroker,
    controller: &CapacityController,
    clock: &dyn Clock,
    cancel: &CancellationToken,
) {
    let parsed = match parse_payload(&message.payload) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::error!(error = %e, "malformed message payload, dropping without redelivery");
            if let Err(e) = message.ack().await {
                tracing::error!(error = %e, "failed to ack malformed message");
            }
            return;
        }
    };

    match handle_message(&parsed, store, broker, controller, clock, cancel).await {
        Ok(Outcome::Processed) | Ok(Outcome::Dropped) => {
            if let Err(e) = message.ack().await {
                tracing::error!(error = %e, "failed to ack message");
            }
        }
        Err(_) => {
            // Leave un-acked: JetStream redelivers after ack_wait elapses.
        }
    }
}
