//! Todo management commands for CLI.

use std::io::{self, BufRead, Write};

use chrono::Local;
use clap::Subcommand;
use eyerest_core::todo::parse_scheduled_time;
use eyerest_core::{Config, TodoItem, TodoManager, TodoStatus};

#[derive(Subcommand)]
pub enum TodoAction {
    /// Add a todo
    Add {
        /// Todo title
        title: String,
        /// Todo description
        #[arg(long)]
        description: Option<String>,
        /// Daily time of day (HH:MM); makes the todo recurring
        #[arg(long)]
        at: Option<String>,
    },
    /// List todos
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a todo
    Remove {
        /// Todo ID
        id: String,
    },
    /// Complete a todo; recurring todos ask for a verification code
    Complete {
        /// Todo ID
        id: String,
    },
}

pub fn run(action: TodoAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    let now = Local::now();
    // Bring recurring items up to date before acting on them.
    let mut todos = TodoManager::new();
    todos.set_todos(std::mem::take(&mut config.todos), now);

    match action {
        TodoAction::Add {
            title,
            description,
            at,
        } => {
            let mut todo = match at {
                Some(raw) => TodoItem::recurring(title, parse_scheduled_time(&raw)?)?,
                None => TodoItem::new(title)?,
            };
            if let Some(d) = description {
                todo = todo.with_description(d);
            }
            let id = todo.id.clone();
            todos.add_todo(todo, now);
            save(config, &todos)?;
            println!("Todo added: {id}");
        }
        TodoAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(todos.todos())?);
                return Ok(());
            }
            if todos.todos().is_empty() {
                println!("No todos");
            }
            for todo in todos.todos() {
                let mark = match todo.status {
                    TodoStatus::Pending => " ",
                    TodoStatus::Completed => "x",
                };
                let schedule = match todo.scheduled_time {
                    Some(t) if todo.is_recurring => format!(" (daily {})", t.format("%H:%M")),
                    _ => String::new(),
                };
                println!("[{mark}] {}{schedule}  {}", todo.title, todo.id);
            }
        }
        TodoAction::Remove { id } => {
            todos
                .remove_todo(&id, now)
                .ok_or_else(|| format!("Todo not found: {id}"))?;
            save(config, &todos)?;
            println!("Todo removed: {id}");
        }
        TodoAction::Complete { id } => {
            if todos.get(&id).is_none() {
                return Err(format!("Todo not found: {id}").into());
            }
            if let Some(code) = todos.request_completion(&id, now) {
                let entered = prompt_code(&code)?;
                if !todos.verify_and_complete(&id, &entered, Local::now()) {
                    return Err("verification code does not match".into());
                }
            }
            save(config, &todos)?;
            println!("Todo completed: {id}");
        }
    }
    Ok(())
}

fn prompt_code(code: &str) -> io::Result<String> {
    let mut stderr = io::stderr();
    writeln!(stderr, "Verification code: {code}")?;
    write!(stderr, "Type the code to confirm: ")?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn save(mut config: Config, todos: &TodoManager) -> Result<(), Box<dyn std::error::Error>> {
    config.todos = todos.todos().to_vec();
    config.save()?;
    Ok(())
}
