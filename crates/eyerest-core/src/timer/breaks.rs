//! Eye-rest break scheduler.
//!
//! Wall-clock state machine on top of [`AlarmQueue`]. The caller passes the
//! current local time to every command and calls `poll(now)` periodically;
//! `poll` fires due alarms and returns the events they produced.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Counting -> OnBreak -> Counting -> ...
//!           |   ^
//!           v   |
//!          (paused)
//! ```
//!
//! Breaks cannot be paused. Pausing drops the countdown entirely and resuming
//! starts a fresh full interval.

use chrono::{DateTime, Duration, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::alarm::AlarmQueue;
use crate::events::Event;

/// Immutable break-timer settings snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakTimerConfig {
    /// Minutes between breaks.
    pub break_interval_min: u32,
    /// Break length in seconds.
    pub break_duration_secs: u32,
    /// Lead time of the pre-notification. 0 disables it.
    pub pre_notification_secs: u32,
    /// Minutes between water reminders. 0 disables them.
    pub water_interval_min: u32,
}

impl Default for BreakTimerConfig {
    fn default() -> Self {
        Self {
            break_interval_min: 20,
            break_duration_secs: 20,
            pre_notification_secs: 30,
            water_interval_min: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakPhase {
    Idle,
    Counting { paused: bool },
    OnBreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreakAlarm {
    Countdown,
    PreNotify,
    Tick,
    Water,
}

/// Break scheduler. See the module docs for the state machine.
#[derive(Debug, Clone)]
pub struct TimerManager {
    config: BreakTimerConfig,
    phase: BreakPhase,
    break_seconds_remaining: u32,
    next_break_time: Option<DateTime<Local>>,
    session_start_time: Option<DateTime<Local>>,
    breaks_taken: u32,
    alarms: AlarmQueue<BreakAlarm>,
    outbox: Vec<Event>,
}

impl Default for TimerManager {
    fn default() -> Self {
        Self::new(BreakTimerConfig::default())
    }
}

impl TimerManager {
    pub fn new(config: BreakTimerConfig) -> Self {
        Self {
            config,
            phase: BreakPhase::Idle,
            break_seconds_remaining: 0,
            next_break_time: None,
            session_start_time: None,
            breaks_taken: 0,
            alarms: AlarmQueue::new(),
            outbox: Vec::new(),
        }
    }

    /// Replace the settings. An in-flight countdown or break keeps its old
    /// timing; the new values apply from the next countdown.
    pub fn configure(&mut self, config: BreakTimerConfig) {
        debug!(?config, "break timer reconfigured");
        self.config = config;
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> &BreakTimerConfig {
        &self.config
    }

    pub fn phase(&self) -> BreakPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase != BreakPhase::Idle
    }

    pub fn is_on_break(&self) -> bool {
        self.phase == BreakPhase::OnBreak
    }

    pub fn is_paused(&self) -> bool {
        self.phase == BreakPhase::Counting { paused: true }
    }

    pub fn break_seconds_remaining(&self) -> u32 {
        self.break_seconds_remaining
    }

    pub fn next_break_time(&self) -> Option<DateTime<Local>> {
        self.next_break_time
    }

    pub fn session_start_time(&self) -> Option<DateTime<Local>> {
        self.session_start_time
    }

    pub fn breaks_taken(&self) -> u32 {
        self.breaks_taken
    }

    /// Remaining time until the next break; zero when no countdown is active
    /// or its target already passed.
    pub fn time_until_break(&self, now: DateTime<Local>) -> Duration {
        match self.next_break_time {
            Some(target) if target > now => target - now,
            _ => Duration::zero(),
        }
    }

    pub fn session_duration(&self, now: DateTime<Local>) -> Duration {
        self.session_start_time
            .map(|start| (now - start).max(Duration::zero()))
            .unwrap_or_else(Duration::zero)
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, now: DateTime<Local>) {
        if self.is_running() {
            return;
        }
        self.session_start_time = Some(now);
        self.breaks_taken = 0;
        let next_break_at = self.arm_countdown(now, self.interval());

        if self.config.water_interval_min >= 1 {
            let period = minutes(self.config.water_interval_min);
            self.alarms.arm_repeating(BreakAlarm::Water, now + period, period);
        }

        info!(
            interval_min = self.config.break_interval_min,
            duration_secs = self.config.break_duration_secs,
            "break timer started"
        );
        self.emit(now, |at| Event::TimerStarted { next_break_at, at });
    }

    pub fn stop(&mut self, now: DateTime<Local>) {
        let was_running = self.is_running();
        self.alarms.cancel_all();
        self.next_break_time = None;
        self.break_seconds_remaining = 0;
        self.phase = BreakPhase::Idle;

        if was_running {
            info!(breaks_taken = self.breaks_taken, "break timer stopped");
            let breaks_taken = self.breaks_taken;
            self.emit(now, |at| Event::TimerStopped { breaks_taken, at });
        }
    }

    pub fn pause(&mut self, now: DateTime<Local>) {
        if self.phase != (BreakPhase::Counting { paused: false }) {
            return;
        }
        self.alarms.cancel(BreakAlarm::Countdown);
        self.alarms.cancel(BreakAlarm::PreNotify);
        self.next_break_time = None;
        self.phase = BreakPhase::Counting { paused: true };
        debug!("break countdown paused");
        self.emit(now, |at| Event::TimerPaused { at });
    }

    /// Restart a full-interval countdown. Progress made before `pause` is lost.
    pub fn resume(&mut self, now: DateTime<Local>) {
        if !self.is_paused() {
            return;
        }
        let next_break_at = self.arm_countdown(now, self.interval());
        debug!("break countdown resumed");
        self.emit(now, |at| Event::TimerResumed { next_break_at, at });
    }

    pub fn skip_break(&mut self, now: DateTime<Local>) {
        if self.is_on_break() {
            debug!("break skipped");
            self.end_break(now);
        }
    }

    /// End the current break (if any) and push the next one `minutes` out,
    /// regardless of the configured interval.
    pub fn postpone_break(&mut self, now: DateTime<Local>, minutes_out: u32) {
        if !self.is_running() {
            return;
        }
        if self.is_on_break() {
            self.end_break(now);
        }
        let next_break_at = self.arm_countdown(now, minutes(minutes_out));

        info!(minutes = minutes_out, "break postponed");
        self.emit(now, |at| Event::BreakPostponed {
            minutes: minutes_out,
            next_break_at,
            at,
        });
    }

    /// Start a break right away instead of waiting for the countdown.
    pub fn take_break_now(&mut self, now: DateTime<Local>) {
        if !matches!(self.phase, BreakPhase::Counting { .. }) {
            return;
        }
        self.alarms.cancel(BreakAlarm::Countdown);
        self.alarms.cancel(BreakAlarm::PreNotify);
        self.start_break(now);
    }

    /// Fire every due alarm and return the produced events.
    pub fn poll(&mut self, now: DateTime<Local>) -> Vec<Event> {
        while let Some(alarm) = self.alarms.pop_due(now) {
            match alarm {
                BreakAlarm::Countdown => self.start_break(now),
                BreakAlarm::PreNotify => {
                    let seconds = self.config.pre_notification_secs;
                    debug!(seconds, "pre-notification");
                    self.emit(now, |at| Event::PreNotification { seconds, at });
                }
                BreakAlarm::Tick => self.on_tick(now),
                BreakAlarm::Water => self.emit(now, |at| Event::WaterReminder { at }),
            }
        }
        self.drain_events()
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.outbox)
    }

    /// Earliest pending alarm, for callers that want to sleep until it.
    pub fn next_wakeup(&self) -> Option<DateTime<Local>> {
        self.alarms.next_deadline()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn interval(&self) -> Duration {
        minutes(self.config.break_interval_min)
    }

    /// Arm the countdown `delay` from now, with the pre-notification when the
    /// lead time fits inside the delay. Returns the break target.
    ///
    /// The delay is at least one second, so a zero interval cannot re-fire
    /// within the same `poll`.
    fn arm_countdown(&mut self, now: DateTime<Local>, delay: Duration) -> DateTime<Utc> {
        let delay = delay.max(Duration::seconds(1));
        let target = now + delay;
        self.alarms.arm_once(BreakAlarm::Countdown, target);
        self.next_break_time = Some(target);
        self.phase = BreakPhase::Counting { paused: false };

        let lead = Duration::seconds(i64::from(self.config.pre_notification_secs));
        if lead > Duration::zero() && delay > lead {
            self.alarms.arm_once(BreakAlarm::PreNotify, target - lead);
        } else {
            self.alarms.cancel(BreakAlarm::PreNotify);
        }
        target.with_timezone(&Utc)
    }

    fn start_break(&mut self, now: DateTime<Local>) {
        let duration_secs = self.config.break_duration_secs;
        self.phase = BreakPhase::OnBreak;
        self.next_break_time = None;
        self.break_seconds_remaining = duration_secs;

        info!(duration_secs, "break started");
        self.emit(now, |at| Event::BreakStarting { at });
        self.emit(now, |at| Event::BreakStarted { duration_secs, at });
        self.emit(now, |at| Event::BreakTick {
            seconds_remaining: duration_secs,
            at,
        });

        if duration_secs == 0 {
            self.end_break(now);
        } else {
            let second = Duration::seconds(1);
            self.alarms.arm_repeating(BreakAlarm::Tick, now + second, second);
        }
    }

    fn on_tick(&mut self, now: DateTime<Local>) {
        self.break_seconds_remaining = self.break_seconds_remaining.saturating_sub(1);
        let seconds_remaining = self.break_seconds_remaining;
        self.emit(now, |at| Event::BreakTick {
            seconds_remaining,
            at,
        });
        if seconds_remaining == 0 {
            self.end_break(now);
        }
    }

    fn end_break(&mut self, now: DateTime<Local>) {
        self.alarms.cancel(BreakAlarm::Tick);
        self.break_seconds_remaining = 0;
        self.breaks_taken += 1;

        info!(breaks_taken = self.breaks_taken, "break ended");
        let breaks_taken = self.breaks_taken;
        self.emit(now, |at| Event::BreakEnded { breaks_taken, at });

        // Only reachable while running; the next countdown starts immediately.
        self.arm_countdown(now, self.interval());
    }

    fn emit(&mut self, now: DateTime<Local>, make: impl FnOnce(DateTime<Utc>) -> Event) {
        self.outbox.push(make(now.with_timezone(&Utc)));
    }
}

fn minutes(m: u32) -> Duration {
    Duration::minutes(i64::from(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn secs(n: i64) -> Duration {
        Duration::seconds(n)
    }

    fn config(interval: u32, duration: u32, pre: u32) -> BreakTimerConfig {
        BreakTimerConfig {
            break_interval_min: interval,
            break_duration_secs: duration,
            pre_notification_secs: pre,
            water_interval_min: 0,
        }
    }

    #[test]
    fn start_arms_full_interval() {
        let mut timer = TimerManager::new(config(20, 20, 30));
        timer.start(t0());
        assert!(timer.is_running());
        assert_eq!(timer.time_until_break(t0()), Duration::minutes(20));
        assert_eq!(timer.time_until_break(t0() + secs(60)), Duration::minutes(19));
        let expected = (t0() + Duration::minutes(20)).with_timezone(&Utc);
        assert!(matches!(
            timer.drain_events().as_slice(),
            [Event::TimerStarted { next_break_at, .. }] if *next_break_at == expected
        ));
    }

    #[test]
    fn start_twice_is_noop() {
        let mut timer = TimerManager::new(config(20, 20, 30));
        timer.start(t0());
        timer.start(t0() + secs(100));
        assert_eq!(timer.session_start_time(), Some(t0()));
        assert_eq!(timer.drain_events().len(), 1);
    }

    #[test]
    fn pre_notification_skipped_when_lead_does_not_fit() {
        let mut timer = TimerManager::new(config(1, 5, 60));
        timer.start(t0());
        let events = timer.poll(t0() + secs(59));
        assert!(!events
            .iter()
            .any(|e| matches!(e, Event::PreNotification { .. })));
    }

    #[test]
    fn pause_is_noop_on_break() {
        let mut timer = TimerManager::new(config(1, 5, 0));
        timer.start(t0());
        timer.poll(t0() + secs(60));
        assert!(timer.is_on_break());
        timer.pause(t0() + secs(61));
        assert!(timer.is_on_break());
        assert!(!timer.is_paused());
    }

    #[test]
    fn pause_then_resume_restarts_full_interval() {
        let mut timer = TimerManager::new(config(20, 20, 30));
        timer.start(t0());
        timer.pause(t0() + Duration::minutes(15));
        assert!(timer.is_paused());
        assert_eq!(timer.time_until_break(t0() + Duration::minutes(15)), Duration::zero());

        // Paused countdown never fires.
        timer.drain_events();
        assert!(timer.poll(t0() + Duration::minutes(30)).is_empty());

        let resumed_at = t0() + Duration::minutes(30);
        timer.resume(resumed_at);
        // Elapsed progress is discarded: a full 20 minutes again, not 5.
        assert_eq!(timer.time_until_break(resumed_at), Duration::minutes(20));
    }

    #[test]
    fn skip_break_ends_break_and_rearms() {
        let mut timer = TimerManager::new(config(1, 20, 0));
        timer.start(t0());
        timer.poll(t0() + secs(60));
        timer.skip_break(t0() + secs(62));
        assert!(!timer.is_on_break());
        assert_eq!(timer.breaks_taken(), 1);
        assert_eq!(timer.next_break_time(), Some(t0() + secs(122)));
    }

    #[test]
    fn postpone_while_on_break_uses_given_minutes() {
        let mut timer = TimerManager::new(config(20, 20, 30));
        timer.start(t0());
        timer.poll(t0() + Duration::minutes(20));
        assert!(timer.is_on_break());

        let now = t0() + Duration::minutes(20) + secs(3);
        timer.postpone_break(now, 5);
        assert!(!timer.is_on_break());
        assert_eq!(timer.time_until_break(now), Duration::minutes(5));

        // Pre-notification re-armed 30 s before the postponed break.
        let events = timer.poll(now + Duration::minutes(5) - secs(30));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::PreNotification { seconds: 30, .. })));
    }

    #[test]
    fn postpone_while_idle_is_noop() {
        let mut timer = TimerManager::default();
        timer.postpone_break(t0(), 5);
        assert!(!timer.is_running());
        assert!(timer.next_wakeup().is_none());
    }

    #[test]
    fn take_break_now_starts_break_immediately() {
        let mut timer = TimerManager::new(config(20, 10, 30));
        timer.start(t0());
        timer.drain_events();
        timer.take_break_now(t0() + secs(5));
        assert!(timer.is_on_break());
        assert_eq!(timer.break_seconds_remaining(), 10);
        let events = timer.drain_events();
        assert!(matches!(events[0], Event::BreakStarting { .. }));
        assert!(matches!(
            events[1],
            Event::BreakStarted {
                duration_secs: 10,
                ..
            }
        ));
    }

    #[test]
    fn stop_cancels_everything_but_keeps_session_metadata() {
        let mut timer = TimerManager::new(BreakTimerConfig {
            water_interval_min: 10,
            ..config(1, 5, 30)
        });
        timer.start(t0());
        timer.poll(t0() + secs(60));
        for n in 61..=65 {
            timer.poll(t0() + secs(n));
        }
        assert_eq!(timer.breaks_taken(), 1);

        timer.stop(t0() + secs(70));
        assert!(!timer.is_running());
        assert!(timer.next_wakeup().is_none());
        assert_eq!(timer.next_break_time(), None);
        assert_eq!(timer.breaks_taken(), 1);
        assert_eq!(timer.session_start_time(), Some(t0()));
        assert!(matches!(
            timer.drain_events().as_slice(),
            [Event::TimerStopped { breaks_taken: 1, .. }]
        ));
        assert!(timer.poll(t0() + Duration::hours(2)).is_empty());
    }

    #[test]
    fn water_reminder_repeats_independently() {
        let mut timer = TimerManager::new(BreakTimerConfig {
            water_interval_min: 1,
            ..config(20, 20, 0)
        });
        timer.start(t0());
        let mut reminders = 0;
        for n in 1..=180 {
            reminders += timer
                .poll(t0() + secs(n))
                .iter()
                .filter(|e| matches!(e, Event::WaterReminder { .. }))
                .count();
        }
        assert_eq!(reminders, 3);
    }

    #[test]
    fn configure_applies_from_next_countdown() {
        let mut timer = TimerManager::new(config(20, 20, 0));
        timer.start(t0());
        timer.configure(config(5, 20, 0));
        assert_eq!(timer.time_until_break(t0()), Duration::minutes(20));
        timer.take_break_now(t0());
        timer.skip_break(t0());
        assert_eq!(timer.time_until_break(t0()), Duration::minutes(5));
    }

    #[test]
    fn zero_interval_and_duration_do_not_spin() {
        let mut timer = TimerManager::new(config(0, 0, 0));
        timer.start(t0());
        assert_eq!(timer.next_break_time(), Some(t0() + secs(1)));

        let events = timer.poll(t0() + secs(1));
        let ended = events
            .iter()
            .filter(|e| matches!(e, Event::BreakEnded { .. }))
            .count();
        assert_eq!(ended, 1);
        assert_eq!(timer.next_break_time(), Some(t0() + secs(2)));
    }

    #[test]
    fn postpone_event_carries_armed_target() {
        let mut timer = TimerManager::new(config(20, 20, 0));
        timer.start(t0());
        timer.drain_events();
        timer.postpone_break(t0() + secs(10), 3);
        let expected = (t0() + secs(10) + Duration::minutes(3)).with_timezone(&Utc);
        assert!(matches!(
            timer.drain_events().as_slice(),
            [Event::BreakPostponed { next_break_at, minutes: 3, .. }] if *next_break_at == expected
        ));
    }

    #[test]
    fn session_duration_tracks_start() {
        let mut timer = TimerManager::default();
        assert_eq!(timer.session_duration(t0()), Duration::zero());
        timer.start(t0());
        assert_eq!(timer.session_duration(t0() + secs(90)), secs(90));
    }
}
