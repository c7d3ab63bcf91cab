use std::fs::{self, OpenOptions};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

mod app;
mod blocks;
mod canvas;
mod config;
mod error;
mod providers;
mod render;
mod spinner;
mod terminal;
mod transcript;

use config::Settings;
use render::Highlighter;
use terminal::TerminalSession;

const LOG_FILE: &str = "gpt-repl.log";

/// Chat with OpenAI and Anthropic models from the terminal.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// Open the config file in $EDITOR and exit.
    #[arg(long)]
    config: bool,

    /// Skip the chat picker and start a new chat.
    #[arg(long)]
    new: bool,

    /// Log at debug level.
    #[arg(long)]
    debug: bool,

    /// Model to use instead of the configured one.
    #[arg(long, short = 'm')]
    model: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = config::config_path();
    if cli.config {
        return config::open_in_editor(&config_path);
    }

    let _log_guard = match init_logging(cli.debug) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("logging disabled: {err:#}");
            None
        }
    };

    let mut settings = Settings::load_or_init(&config_path)?;
    if cli.new {
        settings.always_new_chat = true;
    }
    if let Some(model) = cli.model {
        settings.model = model;
    }
    tracing::info!(
        model = %settings.model,
        renderer = settings.renderer.as_str(),
        theme = settings.theme.as_str(),
        "starting"
    );

    // Syntax sets take a moment to load; start while the picker is up.
    let highlighter = Arc::new(Highlighter::preload());
    let session = TerminalSession::start().context("prepare terminal")?;
    let result = app::run_app(settings, highlighter);
    drop(session);
    if let Err(err) = &result {
        tracing::error!(error = %format!("{err:#}"), "exiting with error");
    }
    result
}

fn init_logging(debug: bool) -> Result<WorkerGuard> {
    let dir = config::data_dir();
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let log_file = options
        .open(dir.join(LOG_FILE))
        .with_context(|| format!("open {LOG_FILE}"))?;
    let (writer, guard) = non_blocking(log_file);

    let default_filter = if debug { "gpt_repl=debug" } else { "gpt_repl=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(false)
        .with_ansi(false)
        .with_filter(filter);
    tracing_subscriber::registry()
        .with(file_layer)
        .try_init()
        .context("install log subscriber")?;
    Ok(guard)
}
