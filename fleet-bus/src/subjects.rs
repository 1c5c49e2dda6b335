//! NATS subject naming, following this codebase's `dorch.*` subject
//! module convention: plain functions over string formatting, grouped
//! under one module rather than scattered `format!` calls at call sites.
use fleet_types::Action;

fn action_token(action: Action) -> &'static str {
    match action {
        Action::Stop => "stop",
        Action::Start => "start",
        Action::Scale => "scale",
    }
}

/// `fleet.ops.{action}.{account_id}`. A worker subscribes to
/// `fleet.ops.*.{account_id}` or `fleet.ops.{action}.*` to filter by the
/// same attributes the distilled spec's SNS/SQS filter policy named.
pub fn ops(action: Action, account_id: &str) -> String {
    format!("fleet.ops.{}.{account_id}", action_token(action))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_action_and_account() {
        assert_eq!(ops(Action::Stop, "111111111111"), "fleet.ops.stop.111111111111");
        assert_eq!(ops(Action::Scale, "222222222222"), "fleet.ops.scale.222222222222");
    }
}
