//! Pomodoro work/break cycle that advances only on user confirmation.

mod manager;
mod state;

pub use manager::{format_mm_ss, PomodoroConfig, PomodoroManager, CONFIRMATION_REMINDER_SECS};
pub use state::{BreakKind, NextStep, PomodoroState};
