// CLI entry point for the Duet chess room.
//
// Starts a standalone room that clients connect to over TCP. See `server.rs`
// for the networking architecture and `session.rs` for the game session.
//
// Settings resolve as: CLI flag or `DUET_*` environment variable, then the
// TOML file given by `--config`, then built-in defaults.
//
// Usage:
//   duet-room [OPTIONS]
//     -c, --config <FILE>            TOML config file
//         --bind <ADDR>              Listen address (default: 127.0.0.1)
//     -p, --port <PORT>              Listen port (default: 7979)
//         --max-connections <N>      Connection cap (default: 64)
//         --log-format <text|json>   Log output format (default: text)
//     -v, --verbose                  Debug logging

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use duet_room::{RoomConfig, RoomError, start_room};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "duet-room", version, about = "Two-seat chess room server")]
struct Cli {
    /// TOML config file. Flags and environment variables override it.
    #[arg(short, long, env = "DUET_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long, env = "DUET_BIND")]
    bind: Option<String>,

    /// Port to listen on (0 picks a free port).
    #[arg(short, long, env = "DUET_PORT")]
    port: Option<u16>,

    /// Refuse connections beyond this many.
    #[arg(long, env = "DUET_MAX_CONNECTIONS")]
    max_connections: Option<usize>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "DUET_LOG_FORMAT")]
    log_format: LogFormat,

    /// Enable debug logging (ignored when RUST_LOG is set).
    #[arg(short, long, env = "DUET_VERBOSE")]
    verbose: bool,
}

impl Cli {
    fn room_config(&self) -> Result<RoomConfig, RoomError> {
        let mut config = match &self.config {
            Some(path) => RoomConfig::from_file(path)?,
            None => RoomConfig::default(),
        };
        if let Some(bind) = &self.bind {
            config.bind = bind.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(max) = self.max_connections {
            config.max_connections = max;
        }
        Ok(config)
    }
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("duet_room={level}")));

    match cli.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .ok(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()
            .ok(),
    };
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = match cli.room_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "bad configuration");
            return ExitCode::FAILURE;
        }
    };

    let (handle, addr) = match start_room(config) {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "failed to start room");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(%addr, "room ready, Ctrl+C to stop");
    // Runs until the process is killed.
    handle.wait();
    ExitCode::SUCCESS
}
