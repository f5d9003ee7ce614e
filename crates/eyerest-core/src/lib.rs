//! # eyerest Core Library
//!
//! Scheduling logic for the eyerest break reminder: an eye-rest break timer,
//! an alternative Pomodoro cycle that waits for confirmation between periods,
//! and daily recurring todos completed with a verification code.
//!
//! ## Architecture
//!
//! - **Alarms**: every manager owns an [`AlarmQueue`] of one-shot and repeating
//!   deadlines. Nothing runs on its own thread; the caller passes the current
//!   local time to `poll(now)` and the manager fires whatever is due.
//! - **Events**: managers buffer [`Event`]s; `poll` returns them and
//!   `drain_events` collects the ones produced by commands.
//! - **Storage**: TOML-based configuration holding preferences and the todo list.
//!
//! ## Key Components
//!
//! - [`TimerManager`]: break countdown, pre-notification, break ticks
//! - [`PomodoroManager`]: work/short break/long break cycle
//! - [`TodoManager`]: due checks, daily reset, verification codes
//! - [`Config`]: application configuration management

pub mod error;
pub mod events;
pub mod pomodoro;
pub mod storage;
pub mod timer;
pub mod todo;

pub use error::{ConfigError, CoreError, ValidationError};
pub use events::Event;
pub use pomodoro::{BreakKind, NextStep, PomodoroConfig, PomodoroManager, PomodoroState};
pub use storage::Config;
pub use timer::{AlarmQueue, BreakPhase, BreakTimerConfig, TimerManager};
pub use todo::{TodoItem, TodoManager, TodoStatus};
