//! Foreground session: drives the managers from a single-threaded runtime.
//!
//! Every event is printed to stdout as one JSON line. Commands are read from
//! stdin, one per line.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};
use eyerest_core::{Config, Event, PomodoroManager, TimerManager, TodoManager};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

enum Scheduler {
    Breaks(TimerManager),
    Pomodoro(PomodoroManager),
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct Session {
    config: Config,
    config_path: PathBuf,
    scheduler: Scheduler,
    todos: TodoManager,
}

pub fn run(pomodoro: bool) -> CliResult<()> {
    let config_path = Config::path()?;
    let config = Config::load_from(&config_path)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(Session::new(config, config_path, pomodoro).run())
}

impl Session {
    fn new(mut config: Config, config_path: PathBuf, pomodoro: bool) -> Self {
        let scheduler = if pomodoro {
            Scheduler::Pomodoro(PomodoroManager::new(config.pomodoro_config()))
        } else {
            Scheduler::Breaks(TimerManager::new(config.break_timer_config()))
        };
        let todos = TodoManager::with_todos(std::mem::take(&mut config.todos));
        Self {
            config,
            config_path,
            scheduler,
            todos,
        }
    }

    async fn run(mut self) -> CliResult<()> {
        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        self.start(Local::now())?;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll(Local::now())?;
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        info!("stdin closed; shutting down");
                        break;
                    };
                    if self.handle(line.trim(), Local::now())? == Flow::Quit {
                        break;
                    }
                }
                _ = &mut ctrl_c => {
                    info!("interrupted; shutting down");
                    break;
                }
            }
        }

        self.stop(Local::now())
    }

    fn start(&mut self, now: DateTime<Local>) -> CliResult<()> {
        match &mut self.scheduler {
            Scheduler::Breaks(timer) => timer.start(now),
            Scheduler::Pomodoro(pomo) => pomo.start(now),
        }
        self.todos.start(now);
        self.flush()
    }

    fn stop(&mut self, now: DateTime<Local>) -> CliResult<()> {
        match &mut self.scheduler {
            Scheduler::Breaks(timer) => timer.stop(now),
            Scheduler::Pomodoro(pomo) => pomo.stop(now),
        }
        self.todos.stop();
        self.flush()
    }

    fn poll(&mut self, now: DateTime<Local>) -> CliResult<()> {
        let mut events = match &mut self.scheduler {
            Scheduler::Breaks(timer) => timer.poll(now),
            Scheduler::Pomodoro(pomo) => pomo.poll(now),
        };
        events.extend(self.todos.poll(now));
        self.publish(events)
    }

    fn handle(&mut self, line: &str, now: DateTime<Local>) -> CliResult<Flow> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(Flow::Continue);
        };
        match command {
            "quit" => return Ok(Flow::Quit),
            "status" => {
                self.print_status(now)?;
                return Ok(Flow::Continue);
            }
            _ => {}
        }

        let breaks = &self.config.breaks;
        match (command, &mut self.scheduler) {
            ("pause", Scheduler::Breaks(timer)) => timer.pause(now),
            ("resume", Scheduler::Breaks(timer)) => timer.resume(now),
            ("break", Scheduler::Breaks(timer)) => timer.take_break_now(now),
            ("skip", Scheduler::Breaks(timer)) => {
                if !breaks.allow_skip {
                    warn!("skipping breaks is disabled");
                } else {
                    timer.skip_break(now);
                }
            }
            ("postpone", Scheduler::Breaks(timer)) => {
                let minutes = match words.next().map(str::parse::<u32>) {
                    None => breaks.postpone_min,
                    Some(Ok(m)) if m > 0 => m,
                    Some(_) => {
                        warn!(line, "postpone expects a positive number of minutes");
                        return Ok(Flow::Continue);
                    }
                };
                if !breaks.allow_postpone {
                    warn!("postponing breaks is disabled");
                } else {
                    timer.postpone_break(now, minutes);
                }
            }
            ("confirm", Scheduler::Pomodoro(pomo)) => pomo.confirm_next_cycle(now),
            ("end", Scheduler::Pomodoro(pomo)) => pomo.end_session(now),
            _ => warn!(command, "unknown or unavailable command"),
        }

        self.flush()?;
        Ok(Flow::Continue)
    }

    /// Publish whatever commands left in the outboxes.
    fn flush(&mut self) -> CliResult<()> {
        let mut events = match &mut self.scheduler {
            Scheduler::Breaks(timer) => timer.drain_events(),
            Scheduler::Pomodoro(pomo) => pomo.drain_events(),
        };
        events.extend(self.todos.drain_events());
        self.publish(events)
    }

    fn publish(&mut self, events: Vec<Event>) -> CliResult<()> {
        let mut todos_changed = false;
        for event in events {
            let mut line = serde_json::to_value(&event)?;
            match event {
                Event::BreakStarted { .. } => {
                    line["message"] = json!(self.config.random_break_message());
                }
                Event::TodosChanged { .. } => todos_changed = true,
                _ => {}
            }
            println!("{line}");
        }
        if todos_changed {
            self.persist_todos()?;
        }
        Ok(())
    }

    /// Re-read the file so edits made by other commands meanwhile survive;
    /// only the todo list is replaced.
    fn persist_todos(&self) -> CliResult<()> {
        let mut on_disk = Config::load_from(&self.config_path)?;
        on_disk.todos = self.todos.todos().to_vec();
        on_disk.save_to(&self.config_path)?;
        Ok(())
    }

    fn print_status(&self, now: DateTime<Local>) -> CliResult<()> {
        let mut status = match &self.scheduler {
            Scheduler::Breaks(timer) => json!({
                "type": "Status",
                "phase": timer.phase(),
                "breaks_taken": timer.breaks_taken(),
                "seconds_until_break": timer.time_until_break(now).num_seconds(),
                "break_seconds_remaining": timer.break_seconds_remaining(),
                "session_secs": timer.session_duration(now).num_seconds(),
            }),
            Scheduler::Pomodoro(pomo) => json!({
                "type": "Status",
                "state": pomo.state(),
                "status": pomo.status_text(),
                "cycles_completed": pomo.cycles_completed(),
                "seconds_remaining": pomo.seconds_remaining(),
            }),
        };
        status["pending_todos"] = json!(self.todos.pending_todos(now).len());
        println!("{status}");
        Ok(())
    }
}
