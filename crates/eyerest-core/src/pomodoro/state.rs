use serde::{Deserialize, Serialize};
use std::fmt;

/// Pomodoro cycle state.
///
///   IDLE ──start──> WORKING ──0s──> WAITING(next: break)
///                      ^                   │ confirm
///                      │ confirm           v
///   WAITING(next: work) <──0s── SHORT_BREAK | LONG_BREAK
///
/// Any state goes back to IDLE on stop / end_session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PomodoroState {
    Idle,
    Working,
    ShortBreak,
    LongBreak,
    WaitingConfirmation,
}

impl PomodoroState {
    pub fn as_str(self) -> &'static str {
        match self {
            PomodoroState::Idle => "idle",
            PomodoroState::Working => "working",
            PomodoroState::ShortBreak => "short_break",
            PomodoroState::LongBreak => "long_break",
            PomodoroState::WaitingConfirmation => "waiting_confirmation",
        }
    }
}

impl fmt::Display for PomodoroState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What confirming will start while in `WaitingConfirmation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextStep {
    Work,
    Break,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakKind {
    Short,
    Long,
}

impl BreakKind {
    /// A break is long once every `cycles_before_long_break` completed cycles.
    /// Zero completed cycles is never long; a zero divisor never yields long.
    pub fn after_cycles(cycles_completed: u32, cycles_before_long_break: u32) -> Self {
        match cycles_completed.checked_rem(cycles_before_long_break) {
            Some(0) if cycles_completed > 0 => BreakKind::Long,
            _ => BreakKind::Short,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BreakKind::Short => "short",
            BreakKind::Long => "long",
        }
    }

    pub(crate) fn state(self) -> PomodoroState {
        match self {
            BreakKind::Short => PomodoroState::ShortBreak,
            BreakKind::Long => PomodoroState::LongBreak,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_fourth_cycle_is_long() {
        let kinds: Vec<_> = (1..=8).map(|c| BreakKind::after_cycles(c, 4)).collect();
        assert_eq!(
            kinds,
            vec![
                BreakKind::Short,
                BreakKind::Short,
                BreakKind::Short,
                BreakKind::Long,
                BreakKind::Short,
                BreakKind::Short,
                BreakKind::Short,
                BreakKind::Long,
            ]
        );
    }

    #[test]
    fn zero_cycles_is_short() {
        assert_eq!(BreakKind::after_cycles(0, 4), BreakKind::Short);
        assert_eq!(BreakKind::after_cycles(3, 0), BreakKind::Short);
    }

    #[test]
    fn single_cycle_setting_makes_every_break_long() {
        assert_eq!(BreakKind::after_cycles(1, 1), BreakKind::Long);
        assert_eq!(BreakKind::after_cycles(2, 1), BreakKind::Long);
    }
}
