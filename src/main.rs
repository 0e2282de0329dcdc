// Lumen Chat - terminal entry point

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lumen_chat::commands::{parse_line, Command, Renderer, HELP};
use lumen_chat::{
    AppConfig, AppError, ConfigService, SessionHandle, SessionService, SessionSnapshot,
    SettingsUpdate,
};
use lumen_llm::EchoBackend;

#[derive(Parser)]
#[command(name = "lumen-chat")]
#[command(about = "Chat with a locally-running language model", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.lumen-chat/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured model id
    #[arg(long)]
    model: Option<String>,

    /// Override the configured log level
    #[arg(long)]
    log_level: Option<String>,

    /// Start loading the model right away
    #[arg(long)]
    load: bool,

    /// Write the --model and --log-level overrides back to the config file
    #[arg(long)]
    save: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config_service = match &cli.config {
        Some(path) => ConfigService::open(path.clone())?,
        None => ConfigService::new()?,
    };
    let overrides = SettingsUpdate {
        model_id: cli.model,
        log_level: cli.log_level,
        ..Default::default()
    };
    let config = if cli.save {
        config_service.update_config(overrides)?
    } else {
        let mut config = config_service.get_config_clone();
        config.apply_update(overrides);
        config.validate().map_err(AppError::validation)?;
        config
    };

    init_tracing(&config);
    info!("[Main] Using config {}", config_service.path().display());

    let backend = EchoBackend::new(config.model_id.clone())
        .with_token_delay(Duration::from_millis(config.token_delay_ms))
        .with_reasoning(config.reasoning_end_marker.is_some());
    let (handle, task) = SessionService::start(backend, &config)?;

    let renderer = tokio::spawn(render_loop(handle.subscribe()));

    if cli.load {
        report(handle.load().await);
    }
    println!("{}", HELP);

    run_repl(&handle).await?;

    handle.shutdown();
    let _ = task.await;
    let _ = renderer.await;
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let default_level = if config.debug_mode {
        "debug"
    } else {
        config.log_level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run_repl(handle: &SessionHandle) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            Command::Intent(intent) => report(handle.send(intent).await.map(|_| ())),
            Command::Status => print_status(&handle.snapshot()),
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
            Command::Unknown(name) => println!("Unknown command /{} (try /help)", name),
        }
    }
    Ok(())
}

async fn render_loop(mut snapshots: watch::Receiver<SessionSnapshot>) {
    let mut renderer = Renderer::new();
    let mut stdout = std::io::stdout();
    while snapshots.changed().await.is_ok() {
        let snap = snapshots.borrow_and_update().clone();
        if let Err(e) = renderer.render(&snap, &mut stdout) {
            warn!("[Main] Could not write to stdout: {}", e);
            break;
        }
    }
}

fn report(result: Result<(), AppError>) {
    if let Err(e) = result {
        println!("! {}", e);
        let _ = std::io::stdout().flush();
    }
}

fn print_status(snap: &SessionSnapshot) {
    println!("session  {}", snap.session_id);
    println!("status   {}", snap.status);
    println!("running  {}", snap.is_running);
    println!("turns    {}", snap.transcript.len());
    if let Some(metrics) = snap.last_metrics {
        println!(
            "last     {} tokens at {:.1} tok/s",
            metrics.token_count, metrics.tokens_per_second
        );
    }
    if let Some(error) = &snap.error {
        println!("error    {}", error);
    }
    if snap.degraded {
        println!("degraded yes");
    }
}
