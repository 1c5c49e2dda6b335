use crate::operation::Action;
use serde::{Deserialize, Serialize};

/// One work unit, published once per nodegroup by the fan-out router and
/// consumed by the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusMessage {
    pub operation_id: String,
    pub action: Action,
    pub account_id: String,
    pub region: String,
    pub cluster_name: String,
    pub cluster_id: String,
    pub nodegroup_name: String,
    pub nodegroup_id: String,
    pub asg_name: String,
    pub original_desired: i32,
    pub original_min: i32,
    pub original_max: i32,
    pub initiated_by: String,
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_desired: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_min: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_max: Option<i32>,
}

/// The SNS-style fan-out envelope some upstream publishers still use.
/// Workers must accept both this and a direct [`BusMessage`] payload.
#[derive(Debug, Clone, Deserialize)]
pub struct BusEnvelope {
    #[serde(rename = "Message")]
    pub message: String,
}

/// Parses a raw payload as either a direct [`BusMessage`] or an
/// SNS-style `{"Message": "<json>"}` envelope wrapping one.
pub fn parse_payload(payload: &[u8]) -> Result<BusMessage, serde_json::Error> {
    if let Ok(envelope) = serde_json::from_slice::<BusEnvelope>(payload) {
        return serde_json::from_str(&envelope.message);
    }
    serde_json::from_slice(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BusMessage {
        BusMessage {
            operation_id: "op-1".into(),
            action: Action::Stop,
            account_id: "111111111111".into(),
            region: "us-east-1".into(),
            cluster_name: "demo".into(),
            cluster_id: "111111111111:us-east-1:demo".into(),
            nodegroup_name: "workers".into(),
            nodegroup_id: "111111111111:us-east-1:demo:workers".into(),
            asg_name: "eks-workers-abc123".into(),
            original_desired: 3,
            original_min: 1,
            original_max: 5,
            initiated_by: "test".into(),
            node_type: "on-demand".into(),
            target_desired: None,
            target_min: None,
            target_max: None,
        }
    }

    #[test]
    fn parses_direct_payload() {
        let payload = serde_json::to_vec(&sample()).unwrap();
        let parsed = parse_payload(&payload).unwrap();
        assert_eq!(parsed.operation_id, "op-1");
    }

    #[test]
    fn parses_sns_envelope() {
        let inner = serde_json::to_string(&sample()).unwrap();
        let envelope = serde_json::json!({ "Message": inner });
        let payload = serde_json::to_vec(&envelope).unwrap();
        let parsed = parse_payload(&payload).unwrap();
        assert_eq!(parsed.nodegroup_name, "workers");
    }
}
