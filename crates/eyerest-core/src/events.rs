use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pomodoro::{BreakKind, PomodoroState};
use crate::todo::TodoItem;

/// Every state change a manager wants the outside world to see produces an Event.
/// Managers buffer them; the coordinator drains and reacts (tray, overlay, dialogs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // ── Break timer ──────────────────────────────────────────────────
    TimerStarted {
        next_break_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    TimerStopped {
        breaks_taken: u32,
        at: DateTime<Utc>,
    },
    TimerPaused {
        at: DateTime<Utc>,
    },
    TimerResumed {
        next_break_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    /// Fired immediately before `BreakStarted`.
    BreakStarting {
        at: DateTime<Utc>,
    },
    BreakStarted {
        duration_secs: u32,
        at: DateTime<Utc>,
    },
    BreakTick {
        seconds_remaining: u32,
        at: DateTime<Utc>,
    },
    BreakEnded {
        breaks_taken: u32,
        at: DateTime<Utc>,
    },
    BreakPostponed {
        minutes: u32,
        next_break_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    PreNotification {
        seconds: u32,
        at: DateTime<Utc>,
    },
    WaterReminder {
        at: DateTime<Utc>,
    },

    // ── Pomodoro ─────────────────────────────────────────────────────
    PomodoroStarted {
        at: DateTime<Utc>,
    },
    PomodoroEnded {
        cycles_completed: u32,
        at: DateTime<Utc>,
    },
    PomodoroStateChanged {
        state: PomodoroState,
        at: DateTime<Utc>,
    },
    PomodoroTick {
        seconds_remaining: u32,
        at: DateTime<Utc>,
    },
    CycleCompleted {
        cycles_completed: u32,
        at: DateTime<Utc>,
    },
    ConfirmationNeeded {
        message: String,
        at: DateTime<Utc>,
    },
    /// Repeats every 30 seconds while waiting for confirmation.
    ConfirmationReminder {
        at: DateTime<Utc>,
    },
    PomodoroBreakStarted {
        kind: BreakKind,
        duration_secs: u32,
        at: DateTime<Utc>,
    },
    PomodoroBreakEnded {
        at: DateTime<Utc>,
    },

    // ── Todos ────────────────────────────────────────────────────────
    TodoDue {
        todo: TodoItem,
        at: DateTime<Utc>,
    },
    TodoCompleted {
        todo: TodoItem,
        at: DateTime<Utc>,
    },
    TodosChanged {
        at: DateTime<Utc>,
    },
    VerificationRequired {
        todo: TodoItem,
        code: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Short snake_case name of the variant, used for log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Event::TimerStarted { .. } => "timer_started",
            Event::TimerStopped { .. } => "timer_stopped",
            Event::TimerPaused { .. } => "timer_paused",
            Event::TimerResumed { .. } => "timer_resumed",
            Event::BreakStarting { .. } => "break_starting",
            Event::BreakStarted { .. } => "break_started",
            Event::BreakTick { .. } => "break_tick",
            Event::BreakEnded { .. } => "break_ended",
            Event::BreakPostponed { .. } => "break_postponed",
            Event::PreNotification { .. } => "pre_notification",
            Event::WaterReminder { .. } => "water_reminder",
            Event::PomodoroStarted { .. } => "pomodoro_started",
            Event::PomodoroEnded { .. } => "pomodoro_ended",
            Event::PomodoroStateChanged { .. } => "pomodoro_state_changed",
            Event::PomodoroTick { .. } => "pomodoro_tick",
            Event::CycleCompleted { .. } => "cycle_completed",
            Event::ConfirmationNeeded { .. } => "confirmation_needed",
            Event::ConfirmationReminder { .. } => "confirmation_reminder",
            Event::PomodoroBreakStarted { .. } => "pomodoro_break_started",
            Event::PomodoroBreakEnded { .. } => "pomodoro_break_ended",
            Event::TodoDue { .. } => "todo_due",
            Event::TodoCompleted { .. } => "todo_completed",
            Event::TodosChanged { .. } => "todos_changed",
            Event::VerificationRequired { .. } => "verification_required",
        }
    }
}
