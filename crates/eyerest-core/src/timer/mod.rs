mod alarm;
mod breaks;

pub use alarm::AlarmQueue;
pub use breaks::{BreakPhase, BreakTimerConfig, TimerManager};
