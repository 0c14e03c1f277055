use clap::Parser;
use room_session_cli::application::HELP;
use room_session_cli::{parse_input, ConsoleInput, ConsoleRuntime, LogConfig, Result};
use room_session_core::{ChannelEventLoop, EngineConfig, GameCatalog, NoopRecorder};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "room-session")]
#[command(
    version,
    about = "Room Session - drive a chat-channel game engine from stdin"
)]
struct Cli {
    /// Engine configuration (JSON)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Channel the console speaks for
    #[arg(long, default_value = "lobby")]
    channel: String,

    /// Fixed RNG seed (overrides the configuration)
    #[arg(long)]
    seed: Option<u64>,

    /// Feed outbound text and named updates back as their own echoes
    #[arg(long)]
    auto_echo: bool,

    /// Print engine events as JSON lines
    #[arg(long)]
    print_events: bool,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,

    /// Log as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    print_config_schema: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_config_schema {
        println!("{}", serde_json::to_string_pretty(&EngineConfig::json_schema())?);
        return Ok(());
    }

    let mut log_config = LogConfig::default().with_level(cli.log_level);
    if cli.json_logs {
        log_config = log_config.with_json();
    }
    log_config.init()?;

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }

    let engine = ChannelEventLoop::new(
        Arc::new(config),
        Arc::new(GameCatalog::standard()),
        Arc::new(NoopRecorder),
    );
    info!(
        channel = %cli.channel,
        formats = ?engine.catalog().formats(),
        "🚀 Room session ready"
    );

    let mut runtime = ConsoleRuntime::new(engine, cli.channel.clone(), cli.auto_echo);
    run(&mut runtime, cli.print_events).await?;

    runtime.shutdown();
    flush(&mut runtime, cli.print_events)?;
    info!("👋 Goodbye");
    Ok(())
}

async fn run(runtime: &mut ConsoleRuntime, print_events: bool) -> Result<()> {
    let started = Instant::now();
    let elapsed = || started.elapsed().as_millis() as u64;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let next_timer = runtime
            .next_deadline()
            .map(|deadline| Duration::from_millis(deadline.saturating_sub(elapsed())));

        tokio::select! {
            line = lines.next_line() => {
                let Some(text) = line? else {
                    break;
                };
                match parse_input(runtime.channel(), &text) {
                    Ok(None) => {}
                    Ok(Some(ConsoleInput::Quit)) => break,
                    Ok(Some(ConsoleInput::Help)) => println!("{}", HELP),
                    Ok(Some(input)) => {
                        let stats = runtime.apply(input, elapsed())?;
                        tracing::debug!(?stats, "Input applied");
                    }
                    Err(e) => eprintln!("❌ {}", e),
                }
            }
            _ = sleep_for(next_timer) => {
                runtime.tick(elapsed());
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted");
                break;
            }
        }

        flush(runtime, print_events)?;
    }

    Ok(())
}

async fn sleep_for(duration: Option<Duration>) {
    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

fn flush(runtime: &mut ConsoleRuntime, print_events: bool) -> Result<()> {
    for line in runtime.drain_output() {
        println!("{}", line);
    }
    let events = runtime.drain_events();
    if print_events {
        for event in events {
            println!("{}", serde_json::to_string(&event)?);
        }
    }
    Ok(())
}
