use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inmind_core::{ApiClient, Config, SessionController};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod app;
mod commands;
mod handler;
mod input;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "inmind", version)]
#[command(about = "Chat with the InMind product assistant")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// API root of the assistant backend
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// User identifier sent when starting a conversation
    #[arg(long, global = true)]
    user_id: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// Check backend and model service health
    Health,
    /// Show a conversation summary
    Conversation {
        /// Conversation id
        id: String,
    },
    /// End a conversation
    End {
        /// Conversation id
        id: String,
    },
    /// Show the resolved configuration; --api-url/--user-id are saved first
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Chat);

    // The chat screen owns the terminal, so it logs to a file
    let _guard = match command {
        Commands::Chat => Some(init_file_logging(cli.verbose)?),
        _ => {
            init_stderr_logging(cli.verbose);
            None
        }
    };

    if let Commands::Config = command {
        return commands::show_config(cli.api_url, cli.user_id);
    }

    let config = Config::load()
        .context("Failed to load config")?
        .with_env()
        .with_overrides(cli.api_url, cli.user_id);
    let client = ApiClient::new(config.api_url()).context("Failed to build HTTP client")?;

    match command {
        Commands::Chat => run_chat(client, config.user_id()).await,
        Commands::Health => commands::health(&client).await,
        Commands::Conversation { id } => commands::conversation(&client, &id).await,
        Commands::End { id } => commands::end(&client, &id).await,
        Commands::Config => Ok(()),
    }
}

fn env_filter(verbose: u8) -> EnvFilter {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

fn init_stderr_logging(verbose: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn log_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("inmind")
}

fn init_file_logging(verbose: u8) -> Result<WorkerGuard> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(&dir, "inmind.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_ansi(false)
        .with_writer(writer)
        .init();

    Ok(guard)
}

async fn run_chat(client: ApiClient, user_id: &str) -> Result<()> {
    info!(api_url = client.base_url(), user_id, "opening chat");

    let api_url = client.base_url().to_string();
    let session = SessionController::new(Arc::new(client), user_id);
    let mut app = App::new(session, api_url);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    app.activate();
    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    loop {
        app.poll_session();
        terminal.draw(|frame| ui::render(app, frame))?;

        if app.should_quit {
            return Ok(());
        }

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => return Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_command_takes_value_flags() {
        let cli = Cli::try_parse_from(["inmind", "config", "--api-url", "http://backend:9000/api"])
            .unwrap();
        assert!(matches!(cli.command, Some(Commands::Config)));
        assert_eq!(cli.api_url.as_deref(), Some("http://backend:9000/api"));
        assert_eq!(cli.user_id, None);
    }

    #[test]
    fn test_config_command_has_no_save_flag() {
        assert!(Cli::try_parse_from(["inmind", "config", "--save"]).is_err());
    }
}
