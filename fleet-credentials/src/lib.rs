use aws_credential_types::Credentials;
use aws_credential_types::provider::SharedCredentialsProvider;
use chrono::{DateTime, Duration, Utc};
use fleet_common::clock::{SharedClock, system_clock};
use fleet_common::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// How long a cached session is trusted before the broker re-assumes,
/// independent of the 1-hour duration requested from STS itself.
const CACHE_TTL: Duration = Duration::minutes(45);
const ASSUME_ROLE_DURATION_SECONDS: i32 = 3600;

#[derive(Debug, Clone)]
pub struct Session {
    pub account_id: String,
    pub region: String,
    credentials: Credentials,
    expires_at: DateTime<Utc>,
}

impl Session {
    pub fn credentials_provider(&self) -> SharedCredentialsProvider {
        SharedCredentialsProvider::new(self.credentials.clone())
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Mints and TTL-caches per-(account, region) scoped sessions by assuming
/// a fixed operator role in each target account. The cache mutex is held
/// only across lookup/insert; the `AssumeRole` call itself runs outside it
/// so concurrent callers for *different* accounts never block on the
/// network round trip, only on each other's cache bookkeeping.
pub struct CredentialBroker {
    sts: aws_sdk_sts::Client,
    operator_role_name: String,
    external_id: String,
    management_account_id: String,
    cache: Mutex<HashMap<(String, String), Session>>,
    clock: SharedClock,
}

impl CredentialBroker {
    pub fn new(
        sts: aws_sdk_sts::Client,
        management_account_id: impl Into<String>,
        operator_role_name: impl Into<String>,
        external_id: impl Into<String>,
    ) -> Self {
        Self {
            sts,
            operator_role_name: operator_role_name.into(),
            external_id: external_id.into(),
            management_account_id: management_account_id.into(),
            cache: Mutex::new(HashMap::new()),
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn management_account_id(&self) -> &str {
        &self.management_account_id
    }

    /// Returns a cached, unexpired session for `(account_id, region)`, or
    /// assumes a fresh one.
    pub async fn session(&self, account_id: &str, region: &str) -> Result<Session> {
        let key = (account_id.to_string(), region.to_string());
        let now = self.clock.now();

        if let Some(cached) = self.lookup(&key, now) {
            return Ok(cached);
        }

        let session = self.assume_role(account_id, region, now).await?;
        self.store(key, session.clone());
        Ok(session)
    }

    fn lookup(&self, key: &(String, String), now: DateTime<Utc>) -> Option<Session> {
        let cache = self.cache.lock().expect("credential cache mutex poisoned");
        cache.get(key).filter(|s| !s.is_expired(now)).cloned()
    }

    fn store(&self, key: (String, String), session: Session) {
        let mut cache = self.cache.lock().expect("credential cache mutex poisoned");
        cache.insert(key, session);
    }

    async fn assume_role(&self, account_id: &str, region: &str, now: DateTime<Utc>) -> Result<Session> {
        let role_arn = format!("arn:aws:iam::{account_id}:role/{}", self.operator_role_name);
        let session_name = format!("fleet-scheduler-{account_id}");

        tracing::debug!(account_id, region, %role_arn, "assuming role");

        let resp = self
            .sts
            .assume_role()
            .role_arn(&role_arn)
            .role_session_name(&session_name)
            .external_id(&self.external_id)
            .duration_seconds(ASSUME_ROLE_DURATION_SECONDS)
            .send()
            .await
            .map_err(|e| Error::AssumeRole(format!("assume_role {role_arn} failed: {e}")))?;

        let creds = resp
            .credentials
            .ok_or_else(|| Error::AssumeRole(format!("assume_role {role_arn} returned no credentials")))?;

        let credentials = Credentials::new(
            creds.access_key_id,
            creds.secret_access_key,
            Some(creds.session_token),
            None,
            "fleet-credential-broker",
        );

        Ok(Session {
            account_id: account_id.to_string(),
            region: region.to_string(),
            credentials,
            expires_at: now + CACHE_TTL,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_common::clock::FixedClock;
    use std::sync::Arc;

    fn fixed_session(expires_at: DateTime<Utc>) -> Session {
        Session {
            account_id: "222222222222".into(),
            region: "us-east-1".into(),
            credentials: Credentials::new("AKIA", "secret", Some("token".into()), None, "test"),
            expires_at,
        }
    }

    #[test]
    fn unexpired_session_is_not_expired() {
        let now: DateTime<Utc> = "2025-01-01T12:00:00Z".parse().unwrap();
        let session = fixed_session(now + Duration::minutes(44));
        assert!(!session.is_expired(now + Duration::minutes(10)));
    }

    #[test]
    fn expired_session_is_expired() {
        let now: DateTime<Utc> = "2025-01-01T12:00:00Z".parse().unwrap();
        let session = fixed_session(now + Duration::minutes(45));
        assert!(session.is_expired(now + Duration::minutes(46)));
    }

    #[test]
    fn clock_injection_compiles_with_fixed_clock() {
        let clock: SharedClock = Arc::new(FixedClock::new("2025-01-01T00:00:00Z".parse().unwrap()));
        assert_eq!(clock.now().to_string(), "2025-01-01 00:00:00 UTC");
    }
}
