pub mod cron_eval;
pub mod manager;
pub mod poll;
pub mod trigger;

pub use manager::ScheduleManager;
pub use poll::{PollSummary, poll_once};
pub use trigger::{TriggerResult, resolve_schedule_target, trigger_schedule_operation};
