//! Cooperative alarm queue.
//!
//! Managers never spawn threads or sleep. Each one owns an `AlarmQueue` keyed by
//! its own alarm enum, arms deadlines on it, and pops due alarms from `poll(now)`.
//! Popping one alarm at a time means a callback can arm or cancel other alarms
//! and the next pop already sees the result.
//!
//! ## Usage
//!
//! ```ignore
//! let mut alarms = AlarmQueue::new();
//! alarms.arm_repeating(Key::Tick, now + Duration::seconds(1), Duration::seconds(1));
//! while let Some(key) = alarms.pop_due(now) {
//!     // handle key
//! }
//! ```

use chrono::{DateTime, Duration, Local};

#[derive(Debug, Clone)]
struct Alarm<K> {
    key: K,
    deadline: DateTime<Local>,
    period: Option<Duration>,
    /// Arming order, breaks deadline ties.
    seq: u64,
}

/// A set of one-shot and repeating deadlines, at most one per key.
#[derive(Debug, Clone)]
pub struct AlarmQueue<K> {
    alarms: Vec<Alarm<K>>,
    next_seq: u64,
}

impl<K> Default for AlarmQueue<K> {
    fn default() -> Self {
        Self {
            alarms: Vec::new(),
            next_seq: 0,
        }
    }
}

impl<K: Copy + PartialEq> AlarmQueue<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a single fire at `at`. Replaces any alarm already armed under `key`.
    pub fn arm_once(&mut self, key: K, at: DateTime<Local>) {
        self.insert(key, at, None);
    }

    /// Arm a fire at `first_at` and every `period` after it.
    /// Replaces any alarm already armed under `key`.
    pub fn arm_repeating(&mut self, key: K, first_at: DateTime<Local>, period: Duration) {
        let period = period.max(Duration::milliseconds(1));
        self.insert(key, first_at, Some(period));
    }

    /// Returns true if an alarm was armed under `key`.
    pub fn cancel(&mut self, key: K) -> bool {
        let before = self.alarms.len();
        self.alarms.retain(|a| a.key != key);
        self.alarms.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.alarms.clear();
    }

    pub fn is_armed(&self, key: K) -> bool {
        self.alarms.iter().any(|a| a.key == key)
    }

    pub fn deadline(&self, key: K) -> Option<DateTime<Local>> {
        self.alarms.iter().find(|a| a.key == key).map(|a| a.deadline)
    }

    /// Earliest armed deadline, if any.
    pub fn next_deadline(&self) -> Option<DateTime<Local>> {
        self.alarms.iter().map(|a| a.deadline).min()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    /// Pop the earliest alarm whose deadline is at or before `now`.
    ///
    /// One-shot alarms are removed. Repeating alarms move to `deadline + period`,
    /// or to `now + period` when the poll is more than a period late; so a
    /// repeating alarm fires at most once per `now`.
    pub fn pop_due(&mut self, now: DateTime<Local>) -> Option<K> {
        let idx = self
            .alarms
            .iter()
            .enumerate()
            .filter(|(_, a)| a.deadline <= now)
            .min_by_key(|(_, a)| (a.deadline, a.seq))
            .map(|(i, _)| i)?;

        let key = self.alarms[idx].key;
        match self.alarms[idx].period {
            None => {
                self.alarms.swap_remove(idx);
            }
            Some(period) => {
                let seq = self.bump_seq();
                let alarm = &mut self.alarms[idx];
                let next = alarm.deadline + period;
                alarm.deadline = if next > now { next } else { now + period };
                alarm.seq = seq;
            }
        }
        Some(key)
    }

    fn insert(&mut self, key: K, at: DateTime<Local>, period: Option<Duration>) {
        self.cancel(key);
        let seq = self.bump_seq();
        self.alarms.push(Alarm {
            key,
            deadline: at,
            period,
            seq,
        });
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Key {
        A,
        B,
        Tick,
    }

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()
    }

    fn secs(n: i64) -> Duration {
        Duration::seconds(n)
    }

    #[test]
    fn nothing_fires_before_deadline() {
        let mut q = AlarmQueue::new();
        q.arm_once(Key::A, t0() + secs(10));
        assert_eq!(q.pop_due(t0() + secs(9)), None);
        assert_eq!(q.pop_due(t0() + secs(10)), Some(Key::A));
        assert!(q.is_empty());
    }

    #[test]
    fn fires_in_deadline_order() {
        let mut q = AlarmQueue::new();
        q.arm_once(Key::B, t0() + secs(5));
        q.arm_once(Key::A, t0() + secs(3));
        let now = t0() + secs(6);
        assert_eq!(q.pop_due(now), Some(Key::A));
        assert_eq!(q.pop_due(now), Some(Key::B));
        assert_eq!(q.pop_due(now), None);
    }

    #[test]
    fn ties_fire_in_arming_order() {
        let mut q = AlarmQueue::new();
        q.arm_once(Key::B, t0());
        q.arm_once(Key::A, t0());
        assert_eq!(q.pop_due(t0()), Some(Key::B));
        assert_eq!(q.pop_due(t0()), Some(Key::A));
    }

    #[test]
    fn rearming_replaces_existing_alarm() {
        let mut q = AlarmQueue::new();
        q.arm_once(Key::A, t0() + secs(5));
        q.arm_once(Key::A, t0() + secs(50));
        assert_eq!(q.len(), 1);
        assert_eq!(q.deadline(Key::A), Some(t0() + secs(50)));
        assert_eq!(q.pop_due(t0() + secs(5)), None);
    }

    #[test]
    fn cancel_removes_alarm() {
        let mut q = AlarmQueue::new();
        q.arm_once(Key::A, t0());
        assert!(q.cancel(Key::A));
        assert!(!q.cancel(Key::A));
        assert_eq!(q.pop_due(t0() + secs(1)), None);
    }

    #[test]
    fn repeating_alarm_keeps_its_cadence() {
        let mut q = AlarmQueue::new();
        q.arm_repeating(Key::Tick, t0() + secs(1), secs(1));
        for n in 1..=3 {
            assert_eq!(q.pop_due(t0() + secs(n)), Some(Key::Tick));
            assert_eq!(q.pop_due(t0() + secs(n)), None);
        }
        assert_eq!(q.deadline(Key::Tick), Some(t0() + secs(4)));
    }

    #[test]
    fn repeating_alarm_drops_missed_fires() {
        let mut q = AlarmQueue::new();
        q.arm_repeating(Key::Tick, t0() + secs(1), secs(1));
        let late = t0() + secs(10);
        assert_eq!(q.pop_due(late), Some(Key::Tick));
        assert_eq!(q.pop_due(late), None);
        assert_eq!(q.deadline(Key::Tick), Some(late + secs(1)));
    }

    #[test]
    fn next_deadline_is_earliest() {
        let mut q = AlarmQueue::new();
        assert_eq!(q.next_deadline(), None);
        q.arm_once(Key::A, t0() + secs(30));
        q.arm_repeating(Key::Tick, t0() + secs(2), secs(1));
        assert_eq!(q.next_deadline(), Some(t0() + secs(2)));
        q.cancel_all();
        assert!(q.is_empty());
    }
}
