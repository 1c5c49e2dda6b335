use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use std::str::FromStr;

/// Adapts a 5-field cron expression (`min hour dom mon dow`) to the
/// 6-field, seconds-prefixed syntax the `cron` crate parses.
fn to_six_field(expression: &str) -> String {
    format!("0 {expression}")
}

pub fn validate(expression: &str) -> bool {
    Schedule::from_str(&to_six_field(expression)).is_ok()
}

/// Does `expression`, interpreted in `tz`, fire at the minute starting at
/// `reference_minute` (already truncated to `:00` seconds)? Resolved via
/// `Schedule::includes`, which is exact to the second (and so to the
/// minute, since our reference always carries `:00`) — equivalent to the
/// "does the previous scheduled time equal the reference" check, without
/// needing to reconstruct a `get_prev`-style walk.
pub fn is_triggered(expression: &str, tz: Tz, reference_minute: DateTime<Utc>) -> bool {
    let Ok(schedule) = Schedule::from_str(&to_six_field(expression)) else {
        tracing::warn!(expression, "invalid cron expression");
        return false;
    };
    let local_reference = reference_minute.with_timezone(&tz);
    schedule.includes(local_reference)
}

/// Next fire time at or after `from`, in UTC. `None` when the expression
/// is invalid.
pub fn next_trigger(expression: &str, tz: Tz, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let schedule = Schedule::from_str(&to_six_field(expression)).ok()?;
    let local_from = from.with_timezone(&tz);
    schedule.after(&local_from).next().map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn validates_well_formed_five_field_expressions() {
        assert!(validate("0 9 * * *"));
        assert!(validate("*/15 * * * *"));
        assert!(!validate("not a cron"));
    }

    #[test]
    fn triggers_exactly_on_the_scheduled_minute() {
        let reference = Utc.with_ymd_and_hms(2026, 7, 26, 9, 0, 0).unwrap();
        assert!(is_triggered("0 9 * * *", chrono_tz::UTC, reference));

        let one_minute_later = Utc.with_ymd_and_hms(2026, 7, 26, 9, 1, 0).unwrap();
        assert!(!is_triggered("0 9 * * *", chrono_tz::UTC, one_minute_later));
    }

    #[test]
    fn honors_timezone_offset_from_utc() {
        // 9am US/Eastern (UTC-4 in July, DST) is 13:00 UTC.
        let reference = Utc.with_ymd_and_hms(2026, 7, 26, 13, 0, 0).unwrap();
        assert!(is_triggered("0 9 * * *", chrono_tz::US::Eastern, reference));
    }

    #[test]
    fn next_trigger_advances_past_from_time() {
        let from = Utc.with_ymd_and_hms(2026, 7, 26, 9, 0, 30).unwrap();
        let next = next_trigger("0 9 * * *", chrono_tz::UTC, from).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 7, 27, 9, 0, 0).unwrap());
    }
}
