//! # AIGamer CLI
//!
//! Finds a running Warsim window and lets the configured model play it until
//! Escape is pressed.

mod cli;
mod config;
mod listener;

use aigamer_core::{Console, GameLoop, LoopControl, SessionLog, CONTROLS_HELP};
use aigamer_providers::create_clients;
use aigamer_vision::{
    create_input_driver, create_screen_capture, create_window_source, process_name,
    InputDispatcher, WindowLocator,
};
use anyhow::{bail, Context};
use clap::Parser;
use console::{style, Term};
use dialoguer::Input;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use cli::Cli;
use config::AppConfig;
use listener::KeyListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    println!("{}", style("=== AI Warsim Player ===").bold().cyan());
    println!("This program uses AI to play Warsim: The Realm of Aslona.");
    println!();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    let session_name = match cli.session.clone() {
        Some(name) => name,
        None => Input::<String>::new()
            .with_prompt("Enter a name for this session (optional)")
            .allow_empty(true)
            .interact_text()?,
    };
    let session_name = session_name.trim();
    let session_name = (!session_name.is_empty()).then_some(session_name);

    let log = SessionLog::create(&config.logging.directory, session_name)
        .context("Failed to create session log")?;
    println!("Logging session to: {}", style(log.path().display()).green());

    let console = Console::new();
    init_tracing(&cli, &config, &console, &log);
    log.log_system_event("AI Warsim Player initialized");

    if !cli.no_wait {
        println!();
        println!("Start Warsim, then press any key to begin...");
        Term::stdout().read_key()?;
    }

    let source = create_window_source();
    let Some(found) = WindowLocator::new(&*source, config.game.clone()).find() else {
        log.log_error("Could not find Warsim game window");
        bail!("Could not find Warsim game window. Make sure the game is running.");
    };
    let window = found.window;

    let owner = process_name(window.pid).unwrap_or_else(|| "unknown".to_string());
    println!(
        "Found game window: {} (PID {}, process {})",
        style(&window.title).green(),
        window.pid,
        owner
    );
    info!("Located game window via {:?}", found.strategy);
    log.log_system_event(&format!(
        "Found game window '{}' with process ID: {} ({})",
        window.title, window.pid, owner
    ));

    let clients = create_clients(&config.ai, &config.capture)?;
    println!(
        "Using {} (decisions: {}, vision: {})",
        clients.kind,
        clients.decision.model(),
        clients.vision.model()
    );
    log.log_system_event(&format!(
        "Using AI provider {} with model {}",
        clients.kind,
        clients.decision.model()
    ));

    let driver = create_input_driver()?;
    let input = InputDispatcher::new(driver, window);
    let capture = create_screen_capture();

    println!("{}", CONTROLS_HELP);

    let control = LoopControl::new(config.loop_config.delay_bounds());
    let listener = KeyListener::spawn(control.clone(), console.clone(), Some(log.clone()))
        .context("Failed to start key listener")?;

    console.line("AI is now playing Warsim. Press ESC to exit.");
    log.log_system_event("AI started playing");

    let mut game = GameLoop::new(capture, input, clients.decision, clients.vision, control)
        .with_settings(config.loop_config.loop_settings())
        .with_console(console.clone())
        .with_session_log(log.clone());
    game.run().await;

    drop(listener);
    println!("AI player stopped after {} cycles.", game.cycles());
    log.log_system_event("AI player stopped");
    Ok(())
}

/// Terminal output goes through the raw-mode-safe console; the session log
/// gets a plain copy of every event at the configured level.
fn init_tracing(cli: &Cli, config: &AppConfig, console: &Console, log: &SessionLog) {
    let console_filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // Validated on load.
    let file_level = config
        .logging
        .level
        .parse()
        .unwrap_or(LevelFilter::INFO);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(console.writer())
                .with_filter(console_filter),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(log.writer())
                .with_filter(file_level),
        )
        .init();
}
