use crate::Store;
use crate::attr::{n, s};
use fleet_common::clock::Clock;
use fleet_common::error::{Error, Result};

/// Idempotency lock used by the poller to guarantee a given schedule
/// triggers at most once per eligible minute, even with multiple poller
/// replicas racing. Colocated in the operations table as `LOCK#{key}` /
/// `LOCK` rows, matching where the original acquisition logic lived
/// alongside operation state.
impl Store {
    /// Attempts to acquire `lock_key` for `ttl_seconds`. Returns `true` if
    /// acquired (either no lock existed, or the existing one had expired),
    /// `false` if another holder still owns it.
    pub async fn acquire_lock(&self, lock_key: &str, ttl_seconds: i64, clock: &dyn Clock) -> Result<bool> {
        let now = clock.now();
        let expires_at = now.timestamp() + ttl_seconds;

        let result = self
            .client
            .put_item()
            .table_name(&self.operations_table)
            .item("PK", s(format!("LOCK#{lock_key}")))
            .item("SK", s("LOCK"))
            .item("acquired_at", s(now.to_rfc3339()))
            .item("expires_at", n(expires_at))
            .condition_expression("attribute_not_exists(PK) OR expires_at < :now")
            .expression_attribute_values(":now", n(now.timestamp()))
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
                    Ok(false)
                } else {
                    Err(Error::Transient(format!("acquire_lock failed: {err}")))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    // Exercised against a real table in integration tests; the
    // conditional-expression logic itself has no pure-function surface to
    // unit test here beyond what `attr` already covers.
}
