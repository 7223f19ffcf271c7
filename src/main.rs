//! Edge gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                   EDGE GATEWAY                    │
//!                     │                                                   │
//!   Client Request    │  ┌────────┐   ┌──────────┐   ┌─────────────────┐ │
//!   ──────────────────┼─▶│  http  │──▶│ routing  │──▶│ filters (auth)  │ │
//!                     │  │ server │   │  table   │   │ + path rewrite  │ │
//!                     │  └────────┘   └──────────┘   └────────┬────────┘ │
//!                     │                                       ▼          │
//!   Client Response   │  ┌────────┐                   ┌─────────────────┐ │
//!   ◀─────────────────┼──│  http  │◀──────────────────│    upstream     │◀┼── Backend
//!                     │  │ server │                   │    forwarder    │ │
//!                     │  └────────┘                   └─────────────────┘ │
//!                     │                                                   │
//!                     │  config · observability · lifecycle               │
//!                     └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "edge-gateway", version, about = "HTTP edge gateway")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match edge_gateway::lifecycle::run(&args.config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Logging may not be up yet
            tracing::error!(error = %e, "Gateway failed");
            eprintln!("edge-gateway: {e}");
            ExitCode::FAILURE
        }
    }
}
