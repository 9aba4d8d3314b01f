//! ECG Hub Server
//!
//! Run with: cargo run --bin ecg-hub
//!
//! # Configuration
//!
//! Settings come from the first config file found (`--config`, then the
//! default locations), overridden by environment variables, then by flags:
//! - `ECG_HUB_HOST` / `--host`: Host to bind to (default: 0.0.0.0)
//! - `ECG_HUB_PORT` / `--port`: Port to listen on (default: 8888)
//! - `ECG_HUB_STATIC_DIR` / `--static-dir`: Static assets (default: resources)
//! - `ECG_HUB_MAX_CONNECTIONS`: Connection limit (default: 1000)
//! - `ECG_HUB_LOG_LEVEL`, `ECG_HUB_LOG_FORMAT`: Logging (default: info, pretty)
//! - `RUST_LOG`: Overrides the log filter entirely

use clap::{Parser, Subcommand};
use ecg_hub::config::{generate_default_config, Config, LoggingConfig};
use ecg_hub::{serve, AppState};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ecg-hub")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Real-time relay for ECG sample streams")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory of static assets
    #[arg(long)]
    pub static_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the hub (default)
    Serve,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Commands::Config { output }) = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)?;
                println!("Wrote default config to {}", path.display());
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(static_dir) = cli.static_dir {
        config.server.static_dir = static_dir;
    }

    init_tracing(&config.logging);

    tracing::info!("Starting ECG hub v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Static assets: {:?}", config.server.static_dir);
    tracing::info!("Connection limit: {}", config.hub.max_connections);

    let state = AppState::with_hub_config(config.server.clone(), config.hub.clone());
    serve(state, &config.server).await?;

    tracing::info!("ECG hub stopped");
    Ok(())
}

/// Initialize tracing from the logging config
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("ecg_hub={},tower_http=info", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.is_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
