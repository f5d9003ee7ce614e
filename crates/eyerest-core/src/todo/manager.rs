//! Recurring todo tracking.
//!
//! A 60 second poll resets recurring items on a new day and announces items
//! that became due (once per item per day). A one-shot alarm just after local
//! midnight resets everything regardless of the poll and re-arms itself.
//! Completing a recurring item takes a verification code the user has to
//! type back.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use super::item::TodoItem;
use crate::events::Event;
use crate::timer::AlarmQueue;

pub const CHECK_INTERVAL_SECS: i64 = 60;
pub const VERIFICATION_CODE_LEN: usize = 8;
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TodoAlarm {
    Check,
    Midnight,
}

#[derive(Debug, Clone, Default)]
pub struct TodoManager {
    todos: Vec<TodoItem>,
    /// Ids already announced as due today.
    notified: HashSet<String>,
    /// Todo id -> verification code awaiting confirmation.
    pending_codes: HashMap<String, String>,
    alarms: AlarmQueue<TodoAlarm>,
    outbox: Vec<Event>,
}

impl TodoManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_todos(todos: Vec<TodoItem>) -> Self {
        Self {
            todos,
            ..Self::default()
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn todos(&self) -> &[TodoItem] {
        &self.todos
    }

    pub fn get(&self, id: &str) -> Option<&TodoItem> {
        self.todos.iter().find(|t| t.id == id)
    }

    /// Items due right now.
    pub fn pending_todos(&self, now: DateTime<Local>) -> Vec<&TodoItem> {
        self.todos.iter().filter(|t| t.is_due(now)).collect()
    }

    pub fn recurring_todos(&self) -> Vec<&TodoItem> {
        self.todos.iter().filter(|t| t.is_recurring).collect()
    }

    pub fn is_running(&self) -> bool {
        self.alarms.is_armed(TodoAlarm::Check)
    }

    pub fn has_pending_verification(&self, id: &str) -> bool {
        self.pending_codes.contains_key(id)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Check once now, then every minute, plus the midnight reset.
    pub fn start(&mut self, now: DateTime<Local>) {
        self.check_todos(now);
        let period = Duration::seconds(CHECK_INTERVAL_SECS);
        self.alarms.arm_repeating(TodoAlarm::Check, now + period, period);
        self.alarms
            .arm_once(TodoAlarm::Midnight, next_midnight_reset(now));
        debug!(count = self.todos.len(), "todo manager started");
    }

    pub fn stop(&mut self) {
        self.alarms.cancel_all();
    }

    pub fn poll(&mut self, now: DateTime<Local>) -> Vec<Event> {
        while let Some(alarm) = self.alarms.pop_due(now) {
            match alarm {
                TodoAlarm::Check => self.check_todos(now),
                TodoAlarm::Midnight => self.midnight_reset(now),
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

    // ── Collection ───────────────────────────────────────────────────

    /// Replace the whole collection (e.g. after loading settings) and check it.
    pub fn set_todos(&mut self, todos: Vec<TodoItem>, now: DateTime<Local>) {
        self.todos = todos;
        self.notified.clear();
        self.pending_codes
            .retain(|id, _| self.todos.iter().any(|t| &t.id == id));
        self.check_todos(now);
    }

    pub fn add_todo(&mut self, todo: TodoItem, now: DateTime<Local>) {
        debug!(id = %todo.id, title = %todo.title, "todo added");
        self.todos.push(todo);
        self.emit(now, |at| Event::TodosChanged { at });
    }

    /// Replace the item with the same id. Unknown ids are ignored.
    pub fn update_todo(&mut self, todo: TodoItem, now: DateTime<Local>) {
        let Some(slot) = self.todos.iter_mut().find(|t| t.id == todo.id) else {
            return;
        };
        *slot = todo;
        self.emit(now, |at| Event::TodosChanged { at });
    }

    pub fn remove_todo(&mut self, id: &str, now: DateTime<Local>) -> Option<TodoItem> {
        let idx = self.todos.iter().position(|t| t.id == id)?;
        let removed = self.todos.remove(idx);
        self.pending_codes.remove(id);
        self.notified.remove(id);
        debug!(id, "todo removed");
        self.emit(now, |at| Event::TodosChanged { at });
        Some(removed)
    }

    // ── Completion ───────────────────────────────────────────────────

    /// Recurring items get a fresh verification code (returned and emitted)
    /// and stay pending. One-shot items complete right away and return `None`.
    pub fn request_completion(&mut self, id: &str, now: DateTime<Local>) -> Option<String> {
        let todo = self.get(id)?;
        if !todo.is_recurring {
            self.complete(id, now);
            return None;
        }

        let todo = todo.clone();
        let code = generate_verification_code();
        self.pending_codes.insert(id.to_string(), code.clone());
        debug!(id, "verification code issued");
        let event_code = code.clone();
        self.emit(now, |at| Event::VerificationRequired {
            todo,
            code: event_code,
            at,
        });
        Some(code)
    }

    /// Complete the item if `entered` matches its pending code (case-insensitive).
    /// A mismatch leaves everything untouched, including the pending code.
    pub fn verify_and_complete(&mut self, id: &str, entered: &str, now: DateTime<Local>) -> bool {
        let Some(expected) = self.pending_codes.get(id) else {
            return false;
        };
        if !entered.trim().eq_ignore_ascii_case(expected) {
            warn!(id, "verification code mismatch");
            return false;
        }
        if !self.complete(id, now) {
            return false;
        }
        self.pending_codes.remove(id);
        true
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete(&mut self, id: &str, now: DateTime<Local>) -> bool {
        let Some(todo) = self.todos.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        // Claim today first so the next check does not undo this completion.
        let today = now.date_naive();
        if todo.needs_reset(today) {
            todo.reset_for_new_day(today);
        }
        todo.mark_completed(now);
        let todo = todo.clone();
        self.notified.remove(id);

        info!(id, title = %todo.title, "todo completed");
        self.emit(now, |at| Event::TodoCompleted { todo, at });
        self.emit(now, |at| Event::TodosChanged { at });
        true
    }

    fn check_todos(&mut self, now: DateTime<Local>) {
        let today = now.date_naive();
        let at = now.with_timezone(&Utc);

        for todo in self.todos.iter_mut() {
            if todo.needs_reset(today) {
                todo.reset_for_new_day(today);
                self.notified.remove(&todo.id);
                debug!(id = %todo.id, %today, "recurring todo reset");
                self.outbox.push(Event::TodosChanged { at });
            }

            if todo.is_due(now) && self.notified.insert(todo.id.clone()) {
                info!(id = %todo.id, title = %todo.title, "todo due");
                self.outbox.push(Event::TodoDue {
                    todo: todo.clone(),
                    at,
                });
            }
        }
    }

    fn midnight_reset(&mut self, now: DateTime<Local>) {
        let today = now.date_naive();
        self.notified.clear();
        for todo in self.todos.iter_mut().filter(|t| t.is_recurring) {
            todo.reset_for_new_day(today);
        }
        info!(%today, "midnight reset");
        self.emit(now, |at| Event::TodosChanged { at });
        self.alarms
            .arm_once(TodoAlarm::Midnight, next_midnight_reset(now));
    }

    fn emit(&mut self, now: DateTime<Local>, make: impl FnOnce(DateTime<Utc>) -> Event) {
        self.outbox.push(make(now.with_timezone(&Utc)));
    }
}

/// One second past the next local midnight.
pub fn next_midnight_reset(now: DateTime<Local>) -> DateTime<Local> {
    now.date_naive()
        .succ_opt()
        .and_then(|tomorrow| tomorrow.and_hms_opt(0, 0, 1))
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .unwrap_or_else(|| now + Duration::days(1))
}

fn generate_verification_code() -> String {
    let mut rng = rand::thread_rng();
    (0..VERIFICATION_CODE_LEN)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect()
}
