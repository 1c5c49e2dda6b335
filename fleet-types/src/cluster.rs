use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeGroupStatus {
    Active,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CapacityType {
    OnDemand,
    Spot,
    Mixed,
}

/// A single Auto Scaling Group backing exactly one nodegroup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeGroup {
    pub name: String,
    pub asg_name: String,
    pub desired: i32,
    pub min: i32,
    pub max: i32,
    pub instance_types: Vec<String>,
    pub capacity_type: CapacityType,
    pub status: NodeGroupStatus,
    pub tags: BTreeMap<String, String>,
}

impl NodeGroup {
    pub fn is_already_at_zero(&self) -> bool {
        self.desired == 0 && self.min == 0
    }

    pub fn id(&self, cluster_id: &str) -> String {
        format!("{cluster_id}:{}", self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub account_id: String,
    pub region: String,
    pub cluster_name: String,
    pub tags: BTreeMap<String, String>,
    pub node_groups: Vec<NodeGroup>,
}

impl Cluster {
    pub fn id(&self) -> String {
        format!("{}:{}:{}", self.account_id, self.region, self.cluster_name)
    }

    /// Mandatory production guard: drop any cluster tagged `env`/`environment`
    /// (case-insensitive key) with value `prod`/`production` (case-insensitive).
    /// This check cannot be overridden by configuration.
    pub fn is_production(&self) -> bool {
        self.tags.iter().any(|(k, v)| {
            let k = k.to_ascii_lowercase();
            let v = v.to_ascii_lowercase();
            (k == "env" || k == "environment") && (v == "prod" || v == "production")
        })
    }

    /// Whether every `key=value` pair in `filter` is present (exact match)
    /// among this cluster's tags.
    pub fn matches_labels(&self, filter: &BTreeMap<String, String>) -> bool {
        filter.iter().all(|(k, v)| self.tags.get(k) == Some(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster_with_tags(tags: &[(&str, &str)]) -> Cluster {
        Cluster {
            account_id: "111111111111".into(),
            region: "us-east-1".into(),
            cluster_name: "demo".into(),
            tags: tags.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            node_groups: vec![],
        }
    }

    #[test]
    fn production_guard_matches_case_insensitively() {
        assert!(cluster_with_tags(&[("Environment", "Production")]).is_production());
        assert!(cluster_with_tags(&[("env", "prod")]).is_production());
        assert!(!cluster_with_tags(&[("env", "staging")]).is_production());
        assert!(!cluster_with_tags(&[]).is_production());
    }

    #[test]
    fn label_filter_requires_every_pair() {
        let cluster = cluster_with_tags(&[("team", "platform"), ("tier", "worker")]);
        let mut filter = BTreeMap::new();
        filter.insert("team".to_string(), "platform".to_string());
        assert!(cluster.matches_labels(&filter));
        filter.insert("tier".to_string(), "gpu".to_string());
        assert!(!cluster.matches_labels(&filter));
    }

    #[test]
    fn cluster_id_is_colon_joined() {
        let cluster = cluster_with_tags(&[]);
        assert_eq!(cluster.id(), "111111111111:us-east-1:demo");
    }
}
