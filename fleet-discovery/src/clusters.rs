use crate::asg::{self, RawAsg};
use aws_config::BehaviorVersion;
use aws_sdk_autoscaling::types::AutoScalingGroup;
use aws_sdk_eks::Client as EksClient;
use fleet_credentials::CredentialBroker;
use fleet_types::Cluster;
use futures::TryStreamExt;
use std::collections::BTreeMap;

/// Runs discovery for a single `(account_id, region)` pair. Never
/// propagates an error to the caller: any failure assuming the role,
/// listing clusters, or listing ASGs is logged and yields an empty (or
/// partial) result for this pair, per the "one bad account/region must
/// not abort the fleet" rule.
pub async fn discover_account_region(
    broker: &CredentialBroker,
    account_id: &str,
    region: &str,
    label_filter: Option<&BTreeMap<String, String>>,
) -> Vec<Cluster> {
    let session = match broker.session(account_id, region).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(account_id, region, error = %e, "failed to assume discovery session, skipping");
            return Vec::new();
        }
    };

    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()))
        .credentials_provider(session.credentials_provider())
        .load()
        .await;

    let eks = EksClient::new(&config);
    let asg_client = aws_sdk_autoscaling::Client::new(&config);

    let cluster_names = match list_cluster_names(&eks).await {
        Ok(names) => names,
        Err(e) => {
            tracing::warn!(account_id, region, error = %e, "failed to list clusters, skipping account/region");
            return Vec::new();
        }
    };

    let all_asgs = match list_all_asgs(&asg_client).await {
        Ok(asgs) => asgs,
        Err(e) => {
            tracing::warn!(account_id, region, error = %e, "failed to list autoscaling groups, clusters will have no nodegroups");
            Vec::new()
        }
    };

    let mut clusters = Vec::with_capacity(cluster_names.len());
    for name in cluster_names {
        let described = match eks.describe_cluster().name(&name).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(account_id, region, cluster = %name, error = %e, "describe_cluster failed, skipping cluster");
                continue;
            }
        };
        let Some(cluster) = described.cluster() else {
            continue;
        };
        let tags: BTreeMap<String, String> = cluster
            .tags()
            .map(|tags| tags.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        let candidate = Cluster {
            account_id: account_id.to_string(),
            region: region.to_string(),
            cluster_name: name.clone(),
            tags,
            node_groups: Vec::new(),
        };

        if candidate.is_production() {
            tracing::warn!(account_id, region, cluster = %name, "dropping production-tagged cluster");
            continue;
        }
        if let Some(filter) = label_filter {
            if !candidate.matches_labels(filter) {
                continue;
            }
        }

        let node_groups = asg::associate_cluster(&all_asgs, &name)
            .into_iter()
            .map(asg::normalize)
            .collect();

        clusters.push(Cluster { node_groups, ..candidate });
    }

    clusters
}

async fn list_cluster_names(eks: &EksClient) -> Result<Vec<String>, aws_sdk_eks::Error> {
    eks.list_clusters()
        .into_paginator()
        .items()
        .send()
        .try_collect()
        .await
        .map_err(aws_sdk_eks::Error::from)
}

pub async fn list_all_asgs(asg_client: &aws_sdk_autoscaling::Client) -> Result<Vec<RawAsg>, aws_sdk_autoscaling::Error> {
    let groups: Vec<AutoScalingGroup> = asg_client
        .describe_auto_scaling_groups()
        .into_paginator()
        .items()
        .send()
        .try_collect()
        .await
        .map_err(aws_sdk_autoscaling::Error::from)?;

    Ok(groups.iter().map(to_raw_asg).collect())
}

fn to_raw_asg(group: &AutoScalingGroup) -> RawAsg {
    let tags = group
        .tags()
        .iter()
        .filter_map(|t| Some((t.key().map(str::to_string)?, t.value().unwrap_or_default().to_string())))
        .collect();

    let distribution = group
        .mixed_instances_policy()
        .and_then(|p| p.instances_distribution());

    let mixed_instance_overrides = group
        .mixed_instances_policy()
        .and_then(|p| p.launch_template())
        .map(|lt| {
            lt.overrides()
                .iter()
                .filter_map(|o| o.instance_type().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    RawAsg {
        name: group.auto_scaling_group_name().unwrap_or_default().to_string(),
        tags,
        desired: group.desired_capacity().unwrap_or(0),
        min: group.min_size().unwrap_or(0),
        max: group.max_size().unwrap_or(0),
        on_demand_pct_above_base: distribution.and_then(|d| d.on_demand_percentage_above_base_capacity()),
        mixed_instance_overrides,
        has_launch_template: group.launch_template().is_some() || group.mixed_instances_policy().is_some(),
        has_launch_config: group.launch_configuration_name().is_some(),
    }
}
