//! # Kindred - Family Tree Server
//!
//! The main binary for the Kindred family-tree view engine.
//!
//! This application provides:
//! - HTTP REST API server (axum-based) serving one live view graph
//! - CLI interface for dataset and view operations
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │            apps/kindred (THE BINARY)          │
//! │                                               │
//! │     ┌─────────────┐      ┌─────────────┐      │
//! │     │    CLI      │      │  HTTP API   │      │
//! │     │   (clap)    │      │   (axum)    │      │
//! │     └──────┬──────┘      └──────┬──────┘      │
//! │            └──────────┬─────────┘             │
//! │                       ▼                       │
//! │               ┌───────────────┐               │
//! │               │ kindred-core  │               │
//! │               │ (THE ENGINE)  │               │
//! │               └───────────────┘               │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Load a dataset and inspect it
//! kindred import -i family.json
//! kindred families -p 1
//!
//! # Build a view and print the render snapshot
//! kindred view -s 1 -m ancestors --json-mode
//!
//! # Start the HTTP server
//! kindred server --host 0.0.0.0 --port 8080
//! ```

use clap::Parser;
use kindred::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // KINDRED_LOG_FORMAT=json switches to machine-parseable output.
    let log_format = std::env::var("KINDRED_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kindred=info,kindred_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Kindred startup banner.
fn print_banner() {
    println!(
        r#"
  ██╗  ██╗██╗███╗   ██╗██████╗ ██████╗ ███████╗██████╗
  ██║ ██╔╝██║████╗  ██║██╔══██╗██╔══██╗██╔════╝██╔══██╗
  █████╔╝ ██║██╔██╗ ██║██║  ██║██████╔╝█████╗  ██║  ██║
  ██╔═██╗ ██║██║╚██╗██║██║  ██║██╔══██╗██╔══╝  ██║  ██║
  ██║  ██╗██║██║ ╚████║██████╔╝██║  ██║███████╗██████╔╝
  ╚═╝  ╚═╝╚═╝╚═╝  ╚═══╝╚═════╝ ╚═╝  ╚═╝╚══════╝╚═════╝

  Family Tree View Engine v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
