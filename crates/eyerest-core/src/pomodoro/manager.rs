//! Pomodoro cycle manager.
//!
//! Same driving model as the break timer: commands and `poll` take the current
//! local time, alarms live in an [`AlarmQueue`], events go to an outbox.
//! A cycle only advances when the user confirms.

use chrono::{DateTime, Duration, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::state::{BreakKind, NextStep, PomodoroState};
use crate::events::Event;
use crate::timer::AlarmQueue;

/// Seconds between reminders while waiting for confirmation.
pub const CONFIRMATION_REMINDER_SECS: i64 = 30;

/// Immutable Pomodoro settings snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroConfig {
    pub work_min: u32,
    pub short_break_min: u32,
    pub long_break_min: u32,
    pub cycles_before_long_break: u32,
}

impl Default for PomodoroConfig {
    fn default() -> Self {
        Self {
            work_min: 25,
            short_break_min: 5,
            long_break_min: 15,
            cycles_before_long_break: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Working,
    OnBreak(BreakKind),
    Waiting(NextStep),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PomodoroAlarm {
    Tick,
    Reminder,
}

#[derive(Debug, Clone)]
pub struct PomodoroManager {
    config: PomodoroConfig,
    phase: Phase,
    cycles_completed: u32,
    seconds_remaining: u32,
    alarms: AlarmQueue<PomodoroAlarm>,
    outbox: Vec<Event>,
}

impl Default for PomodoroManager {
    fn default() -> Self {
        Self::new(PomodoroConfig::default())
    }
}

impl PomodoroManager {
    pub fn new(config: PomodoroConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            cycles_completed: 0,
            seconds_remaining: 0,
            alarms: AlarmQueue::new(),
            outbox: Vec::new(),
        }
    }

    /// Applies from the next work or break period.
    pub fn configure(&mut self, config: PomodoroConfig) {
        debug!(?config, "pomodoro reconfigured");
        self.config = config;
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> &PomodoroConfig {
        &self.config
    }

    pub fn state(&self) -> PomodoroState {
        match self.phase {
            Phase::Idle => PomodoroState::Idle,
            Phase::Working => PomodoroState::Working,
            Phase::OnBreak(kind) => kind.state(),
            Phase::Waiting(_) => PomodoroState::WaitingConfirmation,
        }
    }

    /// What `confirm_next_cycle` would start; `None` unless waiting.
    pub fn next_step(&self) -> Option<NextStep> {
        match self.phase {
            Phase::Waiting(next) => Some(next),
            _ => None,
        }
    }

    pub fn cycles_completed(&self) -> u32 {
        self.cycles_completed
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Kind of the break that follows the cycles completed so far.
    pub fn upcoming_break(&self) -> BreakKind {
        BreakKind::after_cycles(self.cycles_completed, self.config.cycles_before_long_break)
    }

    pub fn status_text(&self) -> String {
        let clock = format_mm_ss(self.seconds_remaining);
        match self.phase {
            Phase::Idle => "Pomodoro idle".to_string(),
            Phase::Working => format!("Work - {clock}"),
            Phase::OnBreak(BreakKind::Short) => format!("Short break - {clock}"),
            Phase::OnBreak(BreakKind::Long) => format!("Long break - {clock}"),
            Phase::Waiting(_) => "Waiting for confirmation".to_string(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, now: DateTime<Local>) {
        if self.phase != Phase::Idle {
            return;
        }
        self.cycles_completed = 0;
        info!("pomodoro started");
        self.emit(now, |at| Event::PomodoroStarted { at });
        self.start_work(now);
    }

    pub fn stop(&mut self, now: DateTime<Local>) {
        if self.phase == Phase::Idle {
            return;
        }
        self.alarms.cancel_all();
        let cycles_completed = self.cycles_completed;
        self.cycles_completed = 0;
        self.seconds_remaining = 0;
        self.set_phase(now, Phase::Idle);

        info!(cycles_completed, "pomodoro ended");
        self.emit(now, |at| Event::PomodoroEnded {
            cycles_completed,
            at,
        });
    }

    /// The user chose to finish instead of confirming.
    pub fn end_session(&mut self, now: DateTime<Local>) {
        self.stop(now);
    }

    pub fn confirm_next_cycle(&mut self, now: DateTime<Local>) {
        let Phase::Waiting(next) = self.phase else {
            return;
        };
        self.alarms.cancel(PomodoroAlarm::Reminder);
        match next {
            NextStep::Work => self.start_work(now),
            NextStep::Break => self.start_break(now),
        }
    }

    pub fn poll(&mut self, now: DateTime<Local>) -> Vec<Event> {
        while let Some(alarm) = self.alarms.pop_due(now) {
            match alarm {
                PomodoroAlarm::Tick => self.on_tick(now),
                PomodoroAlarm::Reminder => {
                    if matches!(self.phase, Phase::Waiting(_)) {
                        self.emit(now, |at| Event::ConfirmationReminder { at });
                    }
                }
            }
        }
        self.drain_events()
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.outbox)
    }

    pub fn next_wakeup(&self) -> Option<DateTime<Local>> {
        self.alarms.next_deadline()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn start_work(&mut self, now: DateTime<Local>) {
        self.seconds_remaining = self.config.work_min.saturating_mul(60);
        self.set_phase(now, Phase::Working);
        self.arm_tick(now);
    }

    fn start_break(&mut self, now: DateTime<Local>) {
        let kind = self.upcoming_break();
        let minutes = match kind {
            BreakKind::Short => self.config.short_break_min,
            BreakKind::Long => self.config.long_break_min,
        };
        self.seconds_remaining = minutes.saturating_mul(60);
        self.set_phase(now, Phase::OnBreak(kind));

        let duration_secs = self.seconds_remaining;
        self.emit(now, |at| Event::PomodoroBreakStarted {
            kind,
            duration_secs,
            at,
        });
        self.arm_tick(now);
    }

    fn arm_tick(&mut self, now: DateTime<Local>) {
        let second = Duration::seconds(1);
        self.alarms.arm_repeating(PomodoroAlarm::Tick, now + second, second);
    }

    fn on_tick(&mut self, now: DateTime<Local>) {
        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        let seconds_remaining = self.seconds_remaining;
        self.emit(now, |at| Event::PomodoroTick {
            seconds_remaining,
            at,
        });
        if seconds_remaining > 0 {
            return;
        }

        self.alarms.cancel(PomodoroAlarm::Tick);
        match self.phase {
            Phase::Working => {
                self.cycles_completed += 1;
                let cycles_completed = self.cycles_completed;
                info!(cycles_completed, "pomodoro cycle completed");
                self.emit(now, |at| Event::CycleCompleted {
                    cycles_completed,
                    at,
                });
                self.enter_waiting(now, NextStep::Break);
            }
            Phase::OnBreak(_) => {
                self.emit(now, |at| Event::PomodoroBreakEnded { at });
                self.enter_waiting(now, NextStep::Work);
            }
            Phase::Idle | Phase::Waiting(_) => {}
        }
    }

    fn enter_waiting(&mut self, now: DateTime<Local>, next: NextStep) {
        self.set_phase(now, Phase::Waiting(next));

        let message = self.waiting_message(next);
        self.emit(now, |at| Event::ConfirmationNeeded { message, at });

        let period = Duration::seconds(CONFIRMATION_REMINDER_SECS);
        self.alarms
            .arm_repeating(PomodoroAlarm::Reminder, now + period, period);
    }

    fn waiting_message(&self, next: NextStep) -> String {
        match next {
            NextStep::Work => format!(
                "Break finished! Cycle {} of {}. Start the next work period or end the session.",
                self.cycles_completed, self.config.cycles_before_long_break
            ),
            NextStep::Break => format!(
                "Cycle {} complete! Start the {} break or end the Pomodoro.",
                self.cycles_completed,
                self.upcoming_break().label()
            ),
        }
    }

    fn set_phase(&mut self, now: DateTime<Local>, phase: Phase) {
        self.phase = phase;
        let state = self.state();
        debug!(%state, "pomodoro state changed");
        self.emit(now, |at| Event::PomodoroStateChanged { state, at });
    }

    fn emit(&mut self, now: DateTime<Local>, make: impl FnOnce(DateTime<Utc>) -> Event) {
        self.outbox.push(make(now.with_timezone(&Utc)));
    }
}

/// `mm:ss`; minutes are not capped at 59.
pub fn format_mm_ss(total_secs: u32) -> String {
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}
