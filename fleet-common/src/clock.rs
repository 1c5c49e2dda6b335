use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Injected time source. Production code uses [`SystemClock`]; tests use
/// [`FixedClock`] so cron evaluation, lock TTLs, and session-cache expiry
/// are deterministic.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that always returns the same instant, optionally advanced
/// manually between calls in a test.
#[derive(Debug, Clone)]
pub struct FixedClock {
    at: std::sync::Arc<std::sync::Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            at: std::sync::Arc::new(std::sync::Mutex::new(at)),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.at.lock().expect("fixed clock mutex poisoned") = at;
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.at.lock().expect("fixed clock mutex poisoned");
        *guard += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.at.lock().expect("fixed clock mutex poisoned")
    }
}

pub type SharedClock = Arc<dyn Clock>;

pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances_deterministically() {
        let start = "2025-01-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance(chrono::Duration::minutes(1));
        assert_eq!(clock.now(), start + chrono::Duration::minutes(1));
    }
}
