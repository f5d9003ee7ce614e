use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "eyerest-cli", version, about = "eyerest break reminder CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the break timer and todo checks in the foreground
    Run {
        /// Use the Pomodoro cycle instead of the eye-rest timer
        #[arg(long)]
        pomodoro: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Todo management
    Todo {
        #[command(subcommand)]
        action: commands::todo::TodoAction,
    },
}

fn main() {
    // stdout carries JSON events; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run { pomodoro } => commands::run::run(pomodoro),
        Commands::Config { action } => commands::config::run(action),
        Commands::Todo { action } => commands::todo::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
