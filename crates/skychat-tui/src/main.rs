//! SkyChat: a terminal chat front-end for Google Gemini.

mod app;
mod cli;
mod handler;
mod logging;
mod tui;
mod ui;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use skychat_core::{ChatBackend, Config, GeminiClient, Session};

use crate::app::App;
use crate::cli::{Cli, Command};
use crate::tui::{EventHandler, Tui};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the key may come from the real environment
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let command = cli.command.clone().unwrap_or(Command::Chat);

    match command {
        Command::Chat => {
            if let Some(path) = logging::init_file() {
                tracing::info!(path = %path.display(), "Logging to file");
            }
        }
        Command::Ask { .. } | Command::Models => logging::init_stderr(),
    }

    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Falling back to default config");
        Config::new()
    });
    cli.apply_to(&mut config);

    if cli.save_config {
        config.save().context("Failed to save config")?;
        tracing::info!("Config saved");
    }

    // Read once; a missing key only fails on the first request
    let api_key = Config::api_key_from_env();
    if api_key.is_none() {
        tracing::warn!("GOOGLE_API_KEY is not set");
    }
    let client = GeminiClient::from_config(&config, api_key.as_deref())?;

    match command {
        Command::Chat => run_chat(&config, client).await,
        Command::Ask { prompt } => ask(&config, &client, &prompt).await,
        Command::Models => list_models(&client).await,
    }
}

async fn run_chat(config: &Config, client: GeminiClient) -> Result<()> {
    let backend: Arc<dyn ChatBackend> = Arc::new(client);
    let mut app = App::new(backend, config.retry_policy(), config.mode());

    tracing::info!(
        model = config.model(),
        mode = config.mode().as_str(),
        "Starting chat"
    );

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = event_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn event_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }

        app.poll_request().await;
    }
    Ok(())
}

async fn ask(config: &Config, client: &GeminiClient, prompt: &str) -> Result<()> {
    let mut session = Session::new(config.mode());

    match session.send(client, &config.retry_policy(), prompt).await {
        Ok(reply) => {
            println!("{}", reply.content);
            Ok(())
        }
        Err(e) => bail!("Failed to get a response: {}", e),
    }
}

async fn list_models(client: &GeminiClient) -> Result<()> {
    let models = client
        .list_models()
        .await
        .context("Failed to list models")?;

    if models.is_empty() {
        println!("No models available for this API key");
    }
    for model in models {
        println!("{}", model);
    }
    Ok(())
}
