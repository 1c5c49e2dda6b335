use fleet_types::{CapacityType, NodeGroup, NodeGroupStatus};
use std::collections::BTreeMap;

/// Cloud-agnostic shape of an Auto Scaling Group, as read off the wire
/// before it is folded into a [`NodeGroup`]. Kept separate from the SDK
/// type so the matching/normalisation rules below are unit-testable
/// without constructing `aws_sdk_autoscaling` types.
#[derive(Debug, Clone)]
pub struct RawAsg {
    pub name: String,
    pub tags: BTreeMap<String, String>,
    pub desired: i32,
    pub min: i32,
    pub max: i32,
    /// `MixedInstancesPolicy.InstancesDistribution.OnDemandPercentageAboveBaseCapacity`,
    /// when the ASG uses a mixed-instances policy.
    pub on_demand_pct_above_base: Option<i32>,
    pub mixed_instance_overrides: Vec<String>,
    pub has_launch_template: bool,
    pub has_launch_config: bool,
}

const TAG_CLUSTER_NAME: &str = "eks:cluster-name";
const TAG_NODEGROUP_NAME: &str = "eks:nodegroup-name";
const TAG_NAME: &str = "Name";
const TAG_SKIP: &str = "eks-operator/skip";

fn kubernetes_io_cluster_tag(cluster_name: &str) -> String {
    format!("kubernetes.io/cluster/{cluster_name}")
}

/// Whether `asg` belongs to `cluster_name`, per the discovery association
/// rule: tagged `eks:cluster-name = <cluster_name>`, or carrying a tag key
/// equal to `kubernetes.io/cluster/<cluster_name>` (any value).
pub fn matches_cluster(asg: &RawAsg, cluster_name: &str) -> bool {
    if asg.tags.get(TAG_CLUSTER_NAME).map(String::as_str) == Some(cluster_name) {
        return true;
    }
    asg.tags.contains_key(&kubernetes_io_cluster_tag(cluster_name))
}

pub fn is_skip_tagged(asg: &RawAsg) -> bool {
    asg.tags
        .get(TAG_SKIP)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// All ASGs in `candidates` associated with `cluster_name`, excluding any
/// tagged `eks-operator/skip = true`. Each surviving ASG becomes one
/// nodegroup under the cluster.
pub fn associate_cluster<'a>(candidates: &'a [RawAsg], cluster_name: &str) -> Vec<&'a RawAsg> {
    candidates
        .iter()
        .filter(|asg| matches_cluster(asg, cluster_name) && !is_skip_tagged(asg))
        .collect()
}

/// Selects the single best-matching ASG for `(cluster_name, nodegroup_name)`
/// when the caller didn't already know the `asg_name`. Three-tier fallback,
/// in order: exact `eks:nodegroup-name` tag match; ASG name containing the
/// nodegroup name; the first cluster-matched ASG. The final fallback is
/// documented as non-deterministic when multiple un-tagged ASGs exist
/// under one cluster — callers that can avoid hitting it (by recording
/// `asg_name` at discovery time) should.
pub fn resolve_single<'a>(candidates: &'a [RawAsg], cluster_name: &str, nodegroup_name: &str) -> Option<&'a RawAsg> {
    let cluster_matched = associate_cluster(candidates, cluster_name);

    if let Some(tagged) = cluster_matched
        .iter()
        .find(|asg| asg.tags.get(TAG_NODEGROUP_NAME).map(String::as_str) == Some(nodegroup_name))
    {
        return Some(tagged);
    }

    if let Some(by_name) = cluster_matched.iter().find(|asg| asg.name.contains(nodegroup_name)) {
        return Some(by_name);
    }

    cluster_matched.into_iter().next()
}

pub fn nodegroup_name(asg: &RawAsg) -> String {
    if let Some(tagged) = asg.tags.get(TAG_NODEGROUP_NAME) {
        return tagged.clone();
    }
    if let Some(name_tag) = asg.tags.get(TAG_NAME) {
        return name_tag.clone();
    }
    asg.name.clone()
}

pub fn status(asg: &RawAsg) -> NodeGroupStatus {
    if asg.desired == 0 && asg.min == 0 {
        NodeGroupStatus::Stopped
    } else {
        NodeGroupStatus::Active
    }
}

pub fn capacity_type(asg: &RawAsg) -> CapacityType {
    match asg.on_demand_pct_above_base {
        Some(0) => CapacityType::Spot,
        Some(pct) if pct > 0 && pct < 100 => CapacityType::Mixed,
        _ => CapacityType::OnDemand,
    }
}

pub fn instance_types(asg: &RawAsg) -> Vec<String> {
    if !asg.mixed_instance_overrides.is_empty() {
        return asg.mixed_instance_overrides.clone();
    }
    if asg.has_launch_template {
        return vec!["(from-launch-template)".to_string()];
    }
    if asg.has_launch_config {
        return vec!["(from-launch-config)".to_string()];
    }
    vec![]
}

pub fn normalize(asg: &RawAsg) -> NodeGroup {
    NodeGroup {
        name: nodegroup_name(asg),
        asg_name: asg.name.clone(),
        desired: asg.desired,
        min: asg.min,
        max: asg.max,
        instance_types: instance_types(asg),
        capacity_type: capacity_type(asg),
        status: status(asg),
        tags: asg.tags.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asg(name: &str, tags: &[(&str, &str)]) -> RawAsg {
        RawAsg {
            name: name.to_string(),
            tags: tags.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            desired: 3,
            min: 1,
            max: 5,
            on_demand_pct_above_base: None,
            mixed_instance_overrides: vec![],
            has_launch_template: true,
            has_launch_config: false,
        }
    }

    #[test]
    fn matches_via_eks_cluster_name_tag() {
        let a = asg("eks-workers", &[("eks:cluster-name", "demo")]);
        assert!(matches_cluster(&a, "demo"));
        assert!(!matches_cluster(&a, "other"));
    }

    #[test]
    fn matches_via_kubernetes_io_tag_key() {
        let a = asg("eks-workers", &[("kubernetes.io/cluster/demo", "owned")]);
        assert!(matches_cluster(&a, "demo"));
    }

    #[test]
    fn skip_tagged_asgs_are_excluded_from_association() {
        let asgs = vec![
            asg("a", &[("eks:cluster-name", "demo"), ("eks-operator/skip", "true")]),
            asg("b", &[("eks:cluster-name", "demo")]),
        ];
        let matched = associate_cluster(&asgs, "demo");
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "b");
    }

    #[test]
    fn resolve_single_prefers_nodegroup_tag() {
        let asgs = vec![
            asg("a", &[("eks:cluster-name", "demo")]),
            asg("b", &[("eks:cluster-name", "demo"), ("eks:nodegroup-name", "workers")]),
        ];
        let resolved = resolve_single(&asgs, "demo", "workers").unwrap();
        assert_eq!(resolved.name, "b");
    }

    #[test]
    fn resolve_single_falls_back_to_name_contains() {
        let asgs = vec![asg("eks-demo-workers-xyz", &[("eks:cluster-name", "demo")])];
        let resolved = resolve_single(&asgs, "demo", "workers").unwrap();
        assert_eq!(resolved.name, "eks-demo-workers-xyz");
    }

    #[test]
    fn resolve_single_falls_back_to_first_cluster_matched() {
        let asgs = vec![
            asg("a", &[("eks:cluster-name", "demo")]),
            asg("z", &[("eks:cluster-name", "demo")]),
        ];
        // Neither ASG references "gpu" anywhere; the non-deterministic
        // fallback picks the first cluster-matched ASG in input order.
        let resolved = resolve_single(&asgs, "demo", "gpu").unwrap();
        assert_eq!(resolved.name, "a");
    }

    #[test]
    fn nodegroup_name_prefers_tag_then_name_tag_then_asg_name() {
        assert_eq!(nodegroup_name(&asg("eks-workers", &[("eks:nodegroup-name", "workers")])), "workers");
        assert_eq!(nodegroup_name(&asg("eks-workers", &[("Name", "my-workers")])), "my-workers");
        assert_eq!(nodegroup_name(&asg("eks-workers", &[])), "eks-workers");
    }

    #[test]
    fn status_is_stopped_only_when_both_desired_and_min_are_zero() {
        let mut a = asg("a", &[]);
        a.desired = 0;
        a.min = 1;
        assert_eq!(status(&a), NodeGroupStatus::Active);
        a.min = 0;
        assert_eq!(status(&a), NodeGroupStatus::Stopped);
    }

    #[test]
    fn capacity_type_thresholds() {
        let mut a = asg("a", &[]);
        a.on_demand_pct_above_base = Some(0);
        assert_eq!(capacity_type(&a), CapacityType::Spot);
        a.on_demand_pct_above_base = Some(50);
        assert_eq!(capacity_type(&a), CapacityType::Mixed);
        a.on_demand_pct_above_base = Some(100);
        assert_eq!(capacity_type(&a), CapacityType::OnDemand);
        a.on_demand_pct_above_base = None;
        assert_eq!(capacity_type(&a), CapacityType::OnDemand);
    }

    #[test]
    fn instance_types_falls_back_to_launch_template_sentinel() {
        let mut a = asg("a", &[]);
        a.has_launch_template = true;
        a.has_launch_config = false;
        assert_eq!(instance_types(&a), vec!["(from-launch-template)".to_string()]);
        a.has_launch_template = false;
        a.has_launch_config = true;
        assert_eq!(instance_types(&a), vec!["(from-launch-config)".to_string()]);
    }
}
