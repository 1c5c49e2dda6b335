pub mod accounts;
pub mod asg;
pub mod clusters;

use fleet_credentials::{CredentialBroker, Session};
use fleet_types::Cluster;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub use asg::RawAsg;

/// Cross-account, cross-region cluster+ASG discovery, bounded by a worker
/// pool sized from configuration. See [`clusters::discover_account_region`]
/// for the per-(account, region) algorithm.
pub struct Discovery {
    broker: Arc<CredentialBroker>,
    organizations: aws_sdk_organizations::Client,
    configured_account_ids: Vec<String>,
    regions: Vec<String>,
    max_discovery_workers: usize,
}

impl Discovery {
    pub fn new(
        broker: Arc<CredentialBroker>,
        organizations: aws_sdk_organizations::Client,
        configured_account_ids: Vec<String>,
        regions: Vec<String>,
        max_discovery_workers: usize,
    ) -> Self {
        Self {
            broker,
            organizations,
            configured_account_ids,
            regions,
            max_discovery_workers: max_discovery_workers.max(1),
        }
    }

    /// Enumerates every eligible cluster across every resolved account and
    /// configured region, applying the mandatory production guard and the
    /// optional label filter. Never fails: partial results from individual
    /// (account, region) pairs are logged and the rest proceed.
    pub async fn discover(&self, label_filter: Option<&BTreeMap<String, String>>) -> Vec<Cluster> {
        let account_ids = accounts::resolve_account_ids(
            &self.organizations,
            self.broker.management_account_id(),
            &self.configured_account_ids,
        )
        .await;

        let semaphore = Arc::new(Semaphore::new(self.max_discovery_workers));
        let mut tasks = Vec::with_capacity(account_ids.len() * self.regions.len());

        for account_id in account_ids {
            for region in self.regions.clone() {
                let semaphore = semaphore.clone();
                let broker = self.broker.clone();
                let account_id = account_id.clone();
                let label_filter = label_filter.cloned();
                tasks.push(tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .expect("discovery semaphore closed unexpectedly");
                    clusters::discover_account_region(&broker, &account_id, &region, label_filter.as_ref()).await
                }));
            }
        }

        let mut found = Vec::new();
        for task in tasks {
            match task.await {
                Ok(clusters) => found.extend(clusters),
                Err(e) => tracing::error!(error = %e, "discovery task panicked"),
            }
        }
        found
    }
}

/// Re-lists every ASG in `region` under the given session. Shared by the
/// capacity controller (§4.C ASG resolution) so both components use the
/// identical listing/normalisation path discovery itself uses.
pub async fn list_region_asgs(session: &Session, region: &str) -> Result<Vec<RawAsg>, fleet_common::Error> {
    let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()))
        .credentials_provider(session.credentials_provider())
        .load()
        .await;
    let client = aws_sdk_autoscaling::Client::new(&config);
    clusters::list_all_asgs(&client)
        .await
        .map_err(|e| fleet_common::Error::Transient(format!("describe_auto_scaling_groups failed: {e}")))
}
