//! Recurring and one-shot todos with daily reset and code-verified completion.

mod item;
mod manager;

pub use item::{parse_scheduled_time, TodoItem, TodoStatus};
pub use manager::{next_midnight_reset, TodoManager, CHECK_INTERVAL_SECS, VERIFICATION_CODE_LEN};
