//! musicalert-rs: play a sound when a Grafana alert fires.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use musicalert::api::{self, AppState};
use musicalert::config::{self, Config};
use musicalert::matcher::{LocalClock, Matcher};
use musicalert::playback::PlaybackSerializer;
use musicalert::player;
use musicalert::quiet_hours::QuietHours;
use musicalert::rules::RuleTable;

#[derive(Parser, Debug)]
#[command(
    name = "musicalert-rs",
    about = "Play a sound file when a Grafana alert is received via POST request"
)]
struct Args {
    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on for HTTP requests (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Player executable (overrides config)
    #[arg(long)]
    player: Option<String>,

    /// Seconds after which one playback is interrupted (overrides config)
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Log level, e.g. "warn". The config file's global.log_level wins.
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(level: Level) {
    let filter = EnvFilter::new(format!(
        "{},hyper=warn,symphonia=warn",
        level.as_str().to_ascii_lowercase()
    ));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let cli_level = match args.log_level.as_deref() {
        Some(raw) => config::parse_level(raw)?,
        None if args.verbose => Level::DEBUG,
        None => Level::INFO,
    };

    // Config is read before logging starts so its log level can take effect
    let loaded = Config::load(args.config.as_deref());
    let level = loaded
        .as_ref()
        .ok()
        .and_then(|c| c.global.level().ok().flatten())
        .unwrap_or(cli_level);
    init_logging(level);

    let mut config = loaded.inspect_err(|e| error!("Failed to load config: {e}"))?;
    config
        .global
        .level()
        .inspect_err(|e| error!("Failed to process config file: {e}"))?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(player) = args.player {
        config.player.command = player;
    }
    if let Some(timeout) = args.timeout {
        config.player.timeout_secs = timeout;
    }
    config.log_summary();

    let rules =
        RuleTable::load(&config).inspect_err(|e| error!("Failed to process config file: {e}"))?;
    let quiet_hours = QuietHours::from_config(&config.quiet_hours)
        .inspect_err(|e| error!("Failed to process config file: {e}"))?;
    let player = player::build_player(&config.player)
        .inspect_err(|e| error!("Cannot set up playback: {e}"))?;

    info!(
        "{} rule(s) loaded, playing between {}:00 and {}:00",
        rules.len(),
        quiet_hours.start_hr(),
        quiet_hours.end_hr()
    );

    let state = AppState {
        matcher: Arc::new(Matcher::new(rules, quiet_hours)),
        playback: PlaybackSerializer::new(player),
        clock: Arc::new(LocalClock),
        required_user_agent: config.server.required_user_agent.clone(),
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    api::serve(state, &addr).await?;

    Ok(())
}
