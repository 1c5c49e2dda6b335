use crate::Store;
use crate::attr::{self, s};
use aws_sdk_dynamodb::types::{AttributeValue, PutRequest, WriteRequest};
use fleet_common::clock::Clock;
use fleet_common::error::{Error, Result};
use fleet_types::{Action, Cluster, OperationCluster, OperationMeta, OperationNodeGroup, Status, derive};
use std::collections::HashMap;

const OPERATION_TTL_SECONDS: i64 = 30 * 86_400;

/// Rows for one cluster's worth of an operation, plus its nodegroups —
/// the shape `fleetctl operation get --detail` renders.
#[derive(Debug, Clone)]
pub struct ClusterSummary {
    pub cluster: OperationCluster,
    pub nodegroups: Vec<OperationNodeGroup>,
}

#[derive(Debug, Clone)]
pub struct OperationSummary {
    pub meta: OperationMeta,
    pub clusters: Vec<ClusterSummary>,
}

/// Tracks one stop/start/scale operation across META, CLUSTER, and NG
/// rows in the operations table, all sharing partition key
/// `OP#{operation_id}`. [`Store::update_nodegroup_status`] is the only
/// write path after creation; it re-derives and rewrites the owning
/// CLUSTER and META rows on every call.
impl Store {
    pub async fn create_operation(
        &self,
        operation_id: &str,
        action: Action,
        initiated_by: &str,
        clusters: &[Cluster],
        schedule_id: Option<String>,
        clock: &dyn Clock,
    ) -> Result<OperationMeta> {
        let now = clock.now();
        let ttl = now.timestamp() + OPERATION_TTL_SECONDS;
        let total_clusters = clusters.len();
        let total_nodegroups: usize = clusters.iter().map(|c| c.node_groups.len()).sum();

        let meta = OperationMeta {
            operation_id: operation_id.to_string(),
            action,
            status: Status::Pending,
            initiated_by: initiated_by.to_string(),
            schedule_id,
            total_clusters,
            total_nodegroups,
            created_at: now,
            updated_at: now,
            ttl,
        };

        let mut items = vec![keyed_item("OP", operation_id, "META", attr::to_item(&meta))];

        for cluster in clusters {
            let cluster_id = cluster.id();
            let op_cluster = OperationCluster {
                operation_id: operation_id.to_string(),
                cluster_id: cluster_id.clone(),
                status: Status::Pending,
                updated_at: now,
                ttl,
            };
            items.push(keyed_item(
                "OP",
                operation_id,
                &format!("CLUSTER#{cluster_id}"),
                attr::to_item(&op_cluster),
            ));

            for ng in &cluster.node_groups {
                let ng_id = ng.id(&cluster_id);
                let op_ng = OperationNodeGroup {
                    operation_id: operation_id.to_string(),
                    ng_id: ng_id.clone(),
                    cluster_id: cluster_id.clone(),
                    nodegroup_name: ng.name.clone(),
                    action,
                    status: Status::Pending,
                    original_desired: ng.desired,
                    original_min: ng.min,
                    original_max: ng.max,
                    current_desired: None,
                    retry_count: 0,
                    error_message: None,
                    updated_at: now,
                    ttl,
                };
                items.push(keyed_item(
                    "OP",
                    operation_id,
                    &format!("NG#{ng_id}"),
                    attr::to_item(&op_ng),
                ));
            }
        }

        self.batch_put(&self.operations_table.clone(), items).await?;

        tracing::info!(operation_id, clusters = total_clusters, nodegroups = total_nodegroups, "operation created");
        Ok(meta)
    }

    /// Updates one NG row, then re-derives and rewrites its owning CLUSTER
    /// row, then the META row. Three sequential round trips per call,
    /// matching the read-then-fold-then-write shape the aggregate
    /// derivation requires.
    pub async fn update_nodegroup_status(
        &self,
        operation_id: &str,
        cluster_id: &str,
        ng_id: &str,
        status: Status,
        error_message: Option<&str>,
        current_desired: Option<i32>,
        clock: &dyn Clock,
    ) -> Result<()> {
        let now = clock.now();
        let sk = format!("NG#{ng_id}");

        let mut update_expr = "SET #status = :status, updated_at = :now".to_string();
        let names = HashMap::from([("#status".to_string(), "status".to_string())]);
        let mut values = HashMap::from([
            (":status".to_string(), s(status_str(status))),
            (":now".to_string(), s(now.to_rfc3339())),
        ]);

        if let Some(msg) = error_message {
            update_expr.push_str(", error_message = :error");
            values.insert(":error".to_string(), s(msg));
        }
        if let Some(desired) = current_desired {
            update_expr.push_str(", current_desired = :desired");
            values.insert(":desired".to_string(), attr::n(desired));
        }
        if status == Status::Failed {
            update_expr.push_str(", retry_count = retry_count + :one");
            values.insert(":one".to_string(), attr::n(1));
        }

        self.client
            .update_item()
            .table_name(&self.operations_table)
            .key("PK", s(format!("OP#{operation_id}")))
            .key("SK", s(sk))
            .update_expression(update_expr)
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values(Some(values))
            .send()
            .await
            .map_err(|e| Error::Transient(format!("update_nodegroup_status failed: {e}")))?;

        self.update_cluster_status(operation_id, cluster_id, now).await?;
        self.update_meta_status(operation_id, now).await?;
        Ok(())
    }

    async fn update_cluster_status(&self, operation_id: &str, cluster_id: &str, now: chrono::DateTime<chrono::Utc>) -> Result<()> {
        let ngs = self.get_cluster_nodegroups(operation_id, cluster_id).await?;
        let derived = derive(&ngs.iter().map(|ng| ng.status).collect::<Vec<_>>());

        self.client
            .update_item()
            .table_name(&self.operations_table)
            .key("PK", s(format!("OP#{operation_id}")))
            .key("SK", s(format!("CLUSTER#{cluster_id}")))
            .update_expression("SET #status = :status, updated_at = :now")
            .expression_attribute_names("#status", "status")
            .expression_attribute_values(":status", s(status_str(derived)))
            .expression_attribute_values(":now", s(now.to_rfc3339()))
            .send()
            .await
            .map_err(|e| Error::Transient(format!("update_cluster_status failed: {e}")))?;
        Ok(())
    }

    async fn update_meta_status(&self, operation_id: &str, now: chrono::DateTime<chrono::Utc>) -> Result<()> {
        let clusters = self.get_operation_clusters(operation_id).await?;
        let derived = derive(&clusters.iter().map(|c| c.status).collect::<Vec<_>>());

        self.client
            .update_item()
            .table_name(&self.operations_table)
            .key("PK", s(format!("OP#{operation_id}")))
            .key("SK", s("META"))
            .update_expression("SET #status = :status, updated_at = :now")
            .expression_attribute_names("#status", "status")
            .expression_attribute_values(":status", s(status_str(derived)))
            .expression_attribute_values(":now", s(now.to_rfc3339()))
            .send()
            .await
            .map_err(|e| Error::Transient(format!("update_meta_status failed: {e}")))?;
        Ok(())
    }

    /// Most recent operations, newest first. A full-table scan filtered to
    /// META rows — acceptable on the operations table's expected size
    /// (operations TTL out after 30 days); a GSI on `SK` + `created_at`
    /// would be the production upgrade if this ever shows up hot.
    pub async fn list_operations(&self, limit: usize) -> Result<Vec<OperationMeta>> {
        let resp = self
            .client
            .scan()
            .table_name(&self.operations_table)
            .filter_expression("SK = :sk")
            .expression_attribute_values(":sk", s("META"))
            .send()
            .await
            .map_err(|e| Error::Transient(format!("list_operations failed: {e}")))?;

        let mut metas: Vec<OperationMeta> = resp.items().iter().map(attr::from_item).collect::<Result<_>>()?;
        metas.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        metas.truncate(limit);
        Ok(metas)
    }

    pub async fn get_operation_meta(&self, operation_id: &str) -> Result<Option<OperationMeta>> {
        let resp = self
            .client
            .get_item()
            .table_name(&self.operations_table)
            .key("PK", s(format!("OP#{operation_id}")))
            .key("SK", s("META"))
            .send()
            .await
            .map_err(|e| Error::Transient(format!("get_operation_meta failed: {e}")))?;

        resp.item.as_ref().map(attr::from_item).transpose()
    }

    pub async fn get_operation_clusters(&self, operation_id: &str) -> Result<Vec<OperationCluster>> {
        let items = self.query_by_sk_prefix(&self.operations_table.clone(), &format!("OP#{operation_id}"), "CLUSTER#").await?;
        items.iter().map(attr::from_item).collect()
    }

    pub async fn get_cluster_nodegroups(&self, operation_id: &str, cluster_id: &str) -> Result<Vec<OperationNodeGroup>> {
        let prefix = format!("NG#{cluster_id}:");
        let items = self.query_by_sk_prefix(&self.operations_table.clone(), &format!("OP#{operation_id}"), &prefix).await?;
        items.iter().map(attr::from_item).collect()
    }

    pub async fn get_full_operation_summary(&self, operation_id: &str) -> Result<Option<OperationSummary>> {
        let Some(meta) = self.get_operation_meta(operation_id).await? else {
            return Ok(None);
        };
        let clusters = self.get_operation_clusters(operation_id).await?;
        let mut summaries = Vec::with_capacity(clusters.len());
        for cluster in clusters {
            let nodegroups = self.get_cluster_nodegroups(operation_id, &cluster.cluster_id).await?;
            summaries.push(ClusterSummary { cluster, nodegroups });
        }
        Ok(Some(OperationSummary { meta, clusters: summaries }))
    }

    async fn query_by_sk_prefix(&self, table: &str, pk: &str, sk_prefix: &str) -> Result<Vec<HashMap<String, AttributeValue>>> {
        let resp = self
            .client
            .query()
            .table_name(table)
            .key_condition_expression("PK = :pk AND begins_with(SK, :prefix)")
            .expression_attribute_values(":pk", s(pk))
            .expression_attribute_values(":prefix", s(sk_prefix))
            .send()
            .await
            .map_err(|e| Error::Transient(format!("query failed: {e}")))?;
        Ok(resp.items().to_vec())
    }

    async fn batch_put(&self, table: &str, items: Vec<HashMap<String, AttributeValue>>) -> Result<()> {
        for chunk in items.chunks(25) {
            let mut requests: Vec<WriteRequest> = chunk
                .iter()
                .map(|item| WriteRequest::builder().put_request(PutRequest::builder().set_item(Some(item.clone())).build().expect("item always has attributes")).build())
                .collect();

            let mut attempt = 0;
            loop {
                let resp = self
                    .client
                    .batch_write_item()
                    .request_items(table, requests.clone())
                    .send()
                    .await
                    .map_err(|e| Error::Transient(format!("batch_write_item failed: {e}")))?;

                let unprocessed = resp.unprocessed_items().and_then(|m| m.get(table)).cloned().unwrap_or_default();
                if unprocessed.is_empty() {
                    break;
                }
                attempt += 1;
                if attempt >= 5 {
                    return Err(Error::Transient(format!("batch_write_item left {} unprocessed items after 5 attempts", unprocessed.len())));
                }
                requests = unprocessed;
            }
        }
        Ok(())
    }
}

fn keyed_item(pk_prefix: &str, pk_id: &str, sk: &str, mut item: HashMap<String, AttributeValue>) -> HashMap<String, AttributeValue> {
    item.insert("PK".to_string(), s(format!("{pk_prefix}#{pk_id}")));
    item.insert("SK".to_string(), s(sk));
    item
}

fn status_str(status: Status) -> String {
    serde_json::to_value(status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_str_matches_serde_rename() {
        assert_eq!(status_str(Status::InProgress), "IN_PROGRESS");
        assert_eq!(status_str(Status::PartialFailure), "PARTIAL_FAILURE");
    }
}
