use aws_sdk_autoscaling::Client as AsgClient;
use fleet_common::error::{Error, Result};
use fleet_common::retry::retry_with_backoff;
use fleet_credentials::CredentialBroker;
use fleet_discovery::{RawAsg, asg, list_region_asgs};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sizes {
    pub desired: i32,
    pub min: i32,
    pub max: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    Applied { original: Sizes, applied: Sizes },
    AlreadyAtZero { original: Sizes },
}

/// Reads and mutates ASG sizes with exponential backoff on throttling.
/// Every operation is idempotent by construction: stop is a no-op when
/// already at zero; start and scale are unconditional set-to-target.
pub struct CapacityController {
    broker: Arc<CredentialBroker>,
}

impl CapacityController {
    pub fn new(broker: Arc<CredentialBroker>) -> Self {
        Self { broker }
    }

    async fn client_for(&self, account_id: &str, region: &str) -> Result<AsgClient> {
        let session = self
            .broker
            .session(account_id, region)
            .await
            .map_err(|e| Error::AssumeRole(e.to_string()))?;
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .credentials_provider(session.credentials_provider())
            .load()
            .await;
        Ok(AsgClient::new(&config))
    }

    async fn resolve_asg_name(
        &self,
        account_id: &str,
        region: &str,
        cluster_name: &str,
        nodegroup_name: &str,
        asg_name: Option<&str>,
    ) -> Result<String> {
        if let Some(name) = asg_name {
            return Ok(name.to_string());
        }

        let session = self
            .broker
            .session(account_id, region)
            .await
            .map_err(|e| Error::AssumeRole(e.to_string()))?;
        let candidates: Vec<RawAsg> = list_region_asgs(&session, region).await?;
        asg::resolve_single(&candidates, cluster_name, nodegroup_name)
            .map(|a| a.name.clone())
            .ok_or_else(|| Error::not_found(format!("no ASG found for {cluster_name}/{nodegroup_name}")))
    }

    async fn describe_sizes(&self, client: &AsgClient, cancel: &CancellationToken, asg_name: &str) -> Result<Sizes> {
        retry_with_backoff(cancel, Error::is_retryable, || async {
            let resp = client
                .describe_auto_scaling_groups()
                .auto_scaling_group_names(asg_name)
                .send()
                .await
                .map_err(classify_asg_error)?;
            let group = resp
                .auto_scaling_groups()
                .first()
                .ok_or_else(|| Error::not_found(format!("ASG {asg_name} not found")))?;
            Ok(Sizes {
                desired: group.desired_capacity().unwrap_or(0),
                min: group.min_size().unwrap_or(0),
                max: group.max_size().unwrap_or(0),
            })
        })
        .await
    }

    async fn apply_sizes(
        &self,
        client: &AsgClient,
        cancel: &CancellationToken,
        asg_name: &str,
        desired: Option<i32>,
        min: Option<i32>,
        max: Option<i32>,
    ) -> Result<()> {
        retry_with_backoff(cancel, Error::is_retryable, || async {
            let mut req = client.update_auto_scaling_group().auto_scaling_group_name(asg_name);
            if let Some(desired) = desired {
                req = req.desired_capacity(desired);
            }
            if let Some(min) = min {
                req = req.min_size(min);
            }
            if let Some(max) = max {
                req = req.max_size(max);
            }
            req.send().await.map(|_| ()).map_err(classify_asg_error)
        })
        .await
    }

    /// Describes the live sizes of a nodegroup's ASG, resolving it first if
    /// `asg_name` is not already known. Used by the start path to recover a
    /// sane fallback when no baseline was ever recorded.
    pub async fn describe_nodegroup(
        &self,
        account_id: &str,
        region: &str,
        cluster_name: &str,
        nodegroup_name: &str,
        asg_name: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Sizes> {
        let asg_name = self
            .resolve_asg_name(account_id, region, cluster_name, nodegroup_name, asg_name)
            .await?;
        let client = self.client_for(account_id, region).await?;
        self.describe_sizes(&client, cancel, &asg_name).await
    }

    /// Sets `min=0, desired=0` (max unchanged). No-op, reported as
    /// [`StopOutcome::AlreadyAtZero`], when the ASG is already at zero.
    pub async fn stop_nodegroup(
        &self,
        account_id: &str,
        region: &str,
        cluster_name: &str,
        nodegroup_name: &str,
        asg_name: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<StopOutcome> {
        let asg_name = self
            .resolve_asg_name(account_id, region, cluster_name, nodegroup_name, asg_name)
            .await?;
        let client = self.client_for(account_id, region).await?;
        let original = self.describe_sizes(&client, cancel, &asg_name).await?;

        if original.desired == 0 && original.min == 0 {
            return Ok(StopOutcome::AlreadyAtZero { original });
        }

        self.apply_sizes(&client, cancel, &asg_name, Some(0), Some(0), None).await?;
        Ok(StopOutcome::Applied {
            original,
            applied: Sizes { desired: 0, min: 0, max: original.max },
        })
    }

    /// Applies `(desired, min, max)` in one update call.
    pub async fn start_nodegroup(
        &self,
        account_id: &str,
        region: &str,
        cluster_name: &str,
        nodegroup_name: &str,
        asg_name: Option<&str>,
        desired: i32,
        min: i32,
        max: i32,
        cancel: &CancellationToken,
    ) -> Result<Sizes> {
        let asg_name = self
            .resolve_asg_name(account_id, region, cluster_name, nodegroup_name, asg_name)
            .await?;
        let client = self.client_for(account_id, region).await?;
        self.apply_sizes(&client, cancel, &asg_name, Some(desired), Some(min), Some(max)).await?;
        Ok(Sizes { desired, min, max })
    }

    /// Applies only the fields the caller provided; `None` means "leave
    /// unchanged", never a default.
    pub async fn scale_nodegroup(
        &self,
        account_id: &str,
        region: &str,
        cluster_name: &str,
        nodegroup_name: &str,
        asg_name: Option<&str>,
        desired: Option<i32>,
        min: Option<i32>,
        max: Option<i32>,
        cancel: &CancellationToken,
    ) -> Result<Sizes> {
        let asg_name = self
            .resolve_asg_name(account_id, region, cluster_name, nodegroup_name, asg_name)
            .await?;
        let client = self.client_for(account_id, region).await?;
        let before = self.describe_sizes(&client, cancel, &asg_name).await?;
        self.apply_sizes(&client, cancel, &asg_name, desired, min, max).await?;
        Ok(Sizes {
            desired: desired.unwrap_or(before.desired),
            min: min.unwrap_or(before.min),
            max: max.unwrap_or(before.max),
        })
    }
}

fn classify_asg_error<E, R>(err: aws_sdk_autoscaling::error::SdkError<E, R>) -> Error
where
    E: std::error::Error + aws_sdk_autoscaling::error::ProvideErrorMetadata,
{
    let code = err.as_service_error().and_then(|e| e.code()).unwrap_or_default();
    match code {
        "Throttling" | "ThrottlingException" | "RequestLimitExceeded" | "TooManyRequestsException" => {
            Error::Throttled(err.to_string())
        }
        "ResourceContention" | "ServiceUnavailable" | "InternalFailure" => Error::Transient(err.to_string()),
        "ResourceNotFoundFault" => Error::not_found(err.to_string()),
        _ => Error::fatal(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_at_zero_is_reported_distinctly_from_applied() {
        let zero = Sizes { desired: 0, min: 0, max: 5 };
        let outcome = StopOutcome::AlreadyAtZero { original: zero };
        assert_eq!(outcome, StopOutcome::AlreadyAtZero { original: zero });
        assert_ne!(
            outcome,
            StopOutcome::Applied { original: zero, applied: Sizes { desired: 0, min: 0, max: 5 } }
        );
    }
}
