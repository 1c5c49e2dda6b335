use crate::bus::Bus;
use crate::subjects;
use fleet_types::{Action, BusMessage, Cluster};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct FanOutResult {
    pub clusters_count: usize,
    pub nodegroups_count: usize,
    pub published_count: usize,
}

/// Publishes one [`BusMessage`] per nodegroup across `clusters`.
/// Publication is best-effort per message: one failure is logged and
/// counted but does not stop the remaining fan-out, matching the
/// "never let one bad message abort the batch" rule this system applies
/// throughout discovery and dispatch.
pub async fn fan_out_operation(
    bus: &dyn Bus,
    operation_id: &str,
    action: Action,
    clusters: &[Cluster],
    initiated_by: &str,
    scale_target: Option<(i32, i32, i32)>,
) -> FanOutResult {
    let mut result = FanOutResult { clusters_count: clusters.len(), ..Default::default() };

    for cluster in clusters {
        let cluster_id = cluster.id();
        for ng in &cluster.node_groups {
            result.nodegroups_count += 1;
            let nodegroup_id = ng.id(&cluster_id);

            let message = BusMessage {
                operation_id: operation_id.to_string(),
                action,
                account_id: cluster.account_id.clone(),
                region: cluster.region.clone(),
                cluster_name: cluster.cluster_name.clone(),
                cluster_id: cluster_id.clone(),
                nodegroup_name: ng.name.clone(),
                nodegroup_id: nodegroup_id.clone(),
                asg_name: ng.asg_name.clone(),
                original_desired: ng.desired,
                original_min: ng.min,
                original_max: ng.max,
                initiated_by: initiated_by.to_string(),
                node_type: capacity_type_str(ng.capacity_type).to_string(),
                target_desired: scale_target.map(|(d, _, _)| d),
                target_min: scale_target.map(|(_, m, _)| m),
                target_max: scale_target.map(|(_, _, x)| x),
            };

            let payload = match serde_json::to_vec(&message) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!(operation_id, %nodegroup_id, error = %e, "failed to serialize bus message, skipping");
                    continue;
                }
            };

            let subject = subjects::ops(action, &cluster.account_id);
            let message_id = format!("{operation_id}:{nodegroup_id}");

            let attrs = BTreeMap::from([
                ("action".to_string(), action_str(action).to_string()),
                ("account_id".to_string(), cluster.account_id.clone()),
            ]);

            match bus.publish(&subject, &message_id, payload, attrs).await {
                Ok(()) => result.published_count += 1,
                Err(e) => {
                    tracing::error!(operation_id, %nodegroup_id, error = %e, "failed to publish bus message");
                }
            }
        }
    }

    result
}

fn action_str(action: Action) -> &'static str {
    match action {
        Action::Stop => "stop",
        Action::Start => "start",
        Action::Scale => "scale",
    }
}

fn capacity_type_str(ct: fleet_types::CapacityType) -> &'static str {
    match ct {
        fleet_types::CapacityType::OnDemand => "on-demand",
        fleet_types::CapacityType::Spot => "spot",
        fleet_types::CapacityType::Mixed => "mixed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fleet_common::error::Result;
    use fleet_types::{CapacityType, NodeGroup, NodeGroupStatus};
    use std::collections::BTreeMap as Map;
    use std::sync::Mutex;

    struct RecordingBus {
        published: Mutex<Vec<String>>,
        fail_subjects: Vec<String>,
    }

    #[async_trait]
    impl Bus for RecordingBus {
        async fn publish(&self, subject: &str, _message_id: &str, _payload: Vec<u8>, _attrs: Map<String, String>) -> Result<()> {
            if self.fail_subjects.iter().any(|s| s == subject) {
                return Err(fleet_common::error::Error::fatal("simulated publish failure"));
            }
            self.published.lock().unwrap().push(subject.to_string());
            Ok(())
        }
    }

    fn sample_cluster(ng_count: usize) -> Cluster {
        Cluster {
            account_id: "111111111111".into(),
            region: "us-east-1".into(),
            cluster_name: "demo".into(),
            tags: Default::default(),
            node_groups: (0..ng_count)
                .map(|i| NodeGroup {
                    name: format!("ng-{i}"),
                    asg_name: format!("asg-{i}"),
                    desired: 3,
                    min: 1,
                    max: 5,
                    instance_types: vec!["m5.large".into()],
                    capacity_type: CapacityType::OnDemand,
                    status: NodeGroupStatus::Active,
                    tags: Default::default(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn publishes_one_message_per_nodegroup() {
        let bus = RecordingBus { published: Mutex::new(Vec::new()), fail_subjects: vec![] };
        let clusters = vec![sample_cluster(3)];

        let result = fan_out_operation(&bus, "op-1", Action::Stop, &clusters, "test", None).await;

        assert_eq!(result.nodegroups_count, 3);
        assert_eq!(result.published_count, 3);
        assert_eq!(bus.published.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn one_publish_failure_does_not_abort_the_rest() {
        let bus = RecordingBus {
            published: Mutex::new(Vec::new()),
            fail_subjects: vec!["fleet.ops.stop.111111111111".to_string()],
        };
        let mut failing_cluster = sample_cluster(1);
        let mut ok_cluster = sample_cluster(1);
        ok_cluster.account_id = "222222222222".to_string();
        failing_cluster.node_groups[0].name = "failing".to_string();
        ok_cluster.node_groups[0].name = "ok".to_string();
        let clusters = vec![failing_cluster, ok_cluster];

        let result = fan_out_operation(&bus, "op-1", Action::Stop, &clusters, "test", None).await;

        assert_eq!(result.nodegroups_count, 2);
        assert_eq!(result.published_count, 1);
    }
}
