//! codechat server binary.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin codechat-server
//! cargo run --bin codechat-server -- --config codechat.toml --port 3000
//! ```

use std::path::PathBuf;

use clap::Parser;
use codechat_server::{app::build_app_state, config::Config, ui};
use codechat_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "codechat-server")]
#[command(about = "Real-time group messaging server with live code editing", long_about = None)]
struct Args {
    /// Host address to bind the server to (overrides the config file)
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port number to bind the server to (overrides the config file)
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let mut config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let state = match build_app_state(&config).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to start: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = ui::run(state, &config.server.host, config.server.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
