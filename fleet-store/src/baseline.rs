use crate::Store;
use crate::attr::{self, s};
use aws_sdk_dynamodb::types::AttributeValue;
use fleet_common::error::{Error, Result};
use fleet_types::Baseline;
use std::collections::HashMap;

/// Captured-before-stop nodegroup sizes, keyed by `(cluster_id,
/// nodegroup_name)`. Protected by a conditional write so a stop that runs
/// twice in a row (the ASG already at rest, e.g. §8 S3) never clobbers the
/// true original with the already-stopped sizes.
impl Store {
    /// Writes the baseline only if one is not already present for this
    /// key. Returns `false`, not an error, when a baseline already exists.
    pub async fn save_baseline(&self, baseline: &Baseline) -> Result<bool> {
        let item = attr::to_item(baseline);
        let result = self
            .client
            .put_item()
            .table_name(&self.cluster_state_table)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(cluster_id)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_conditional_check_failed_exception())
                    .unwrap_or(false)
                {
                    tracing::info!(
                        cluster_id = %baseline.cluster_id,
                        nodegroup_name = %baseline.nodegroup_name,
                        "baseline already exists, skipping overwrite"
                    );
                    Ok(false)
                } else {
                    Err(Error::Transient(format!("save_baseline failed: {err}")))
                }
            }
        }
    }

    pub async fn get_baseline(&self, cluster_id: &str, nodegroup_name: &str) -> Result<Option<Baseline>> {
        let resp = self
            .client
            .get_item()
            .table_name(&self.cluster_state_table)
            .key("cluster_id", s(cluster_id))
            .key("nodegroup_name", s(nodegroup_name))
            .send()
            .await
            .map_err(|e| Error::Transient(format!("get_baseline failed: {e}")))?;

        resp.item.as_ref().map(attr::from_item).transpose()
    }

    pub async fn delete_baseline(&self, cluster_id: &str, nodegroup_name: &str) -> Result<()> {
        self.client
            .delete_item()
            .table_name(&self.cluster_state_table)
            .key("cluster_id", s(cluster_id))
            .key("nodegroup_name", s(nodegroup_name))
            .send()
            .await
            .map_err(|e| Error::Transient(format!("delete_baseline failed: {e}")))?;
        Ok(())
    }

    pub async fn list_cluster_baselines(&self, cluster_id: &str) -> Result<Vec<Baseline>> {
        let resp = self
            .client
            .query()
            .table_name(&self.cluster_state_table)
            .key_condition_expression("cluster_id = :cid")
            .expression_attribute_values(":cid", s(cluster_id))
            .send()
            .await
            .map_err(|e| Error::Transient(format!("list_cluster_baselines failed: {e}")))?;

        resp.items()
            .iter()
            .map(|item: &HashMap<String, AttributeValue>| attr::from_item(item))
            .collect()
    }
}
