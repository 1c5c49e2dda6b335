use crate::args::Cli;
use fleet_bus::NatsBus;
use fleet_credentials::CredentialBroker;
use fleet_discovery::Discovery;
use fleet_store::Store;
use std::sync::Arc;

pub struct Context {
    pub broker: Arc<CredentialBroker>,
    pub discovery: Discovery,
    pub store: Store,
    pub bus: NatsBus,
}

impl Context {
    pub async fn build(cli: &Cli) -> anyhow::Result<Self> {
        let sts = aws_sdk_sts::Client::new(&aws_config::defaults(aws_config::BehaviorVersion::latest()).load().await);
        let broker = Arc::new(CredentialBroker::new(sts, &cli.aws.management_account_id, &cli.aws.operator_role_name, &cli.aws.external_id));

        let organizations_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(cli.aws.aws_region.clone()))
            .load()
            .await;
        let organizations = aws_sdk_organizations::Client::new(&organizations_config);
        let discovery = Discovery::new(
            broker.clone(),
            organizations,
            cli.aws.target_account_ids(),
            cli.aws.target_regions.clone(),
            cli.aws.max_discovery_workers,
        );

        let dynamodb = aws_sdk_dynamodb::Client::new(&aws_config::defaults(aws_config::BehaviorVersion::latest()).load().await);
        let store = Store::new(
            dynamodb,
            cli.store.dynamodb_operations_table.clone(),
            cli.store.dynamodb_cluster_state_table.clone(),
            cli.store.dynamodb_schedules_table.clone(),
        );

        let bus = NatsBus::connect(&cli.bus.nats_url, &cli.bus.bus_stream_name, vec!["fleet.ops.>".to_string()]).await?;

        Ok(Self { broker, discovery, store, bus })
    }
}

/// Splits a `{account_id}:{region}:{cluster_name}` cluster id into its parts.
pub fn split_cluster_id(cluster_id: &str) -> anyhow::Result<(String, String, String)> {
    let mut parts = cluster_id.splitn(3, ':');
    let account_id = parts.next().ok_or_else(|| anyhow::anyhow!("malformed cluster id: {cluster_id}"))?;
    let region = parts.next().ok_or_else(|| anyhow::anyhow!("malformed cluster id: {cluster_id}"))?;
    let cluster_name = parts.next().ok_or_else(|| anyhow::anyhow!("malformed cluster id: {cluster_id}"))?;
    Ok((account_id.to_string(), region.to_string(), cluster_name.to_string()))
}
