//! # Kindred CLI Module
//!
//! This module implements the CLI interface for Kindred.
//!
//! ## Available Commands
//!
//! - `init` - Initialize a new, empty database
//! - `import` - Load a JSON dataset into the database
//! - `status` - Show dataset metrics
//! - `families` - Show the families around a person
//! - `ancestors` - List the ancestor closure of a person
//! - `descendants` - List the descendant closure of a person
//! - `age` - Estimate the age of a person relative to a start person
//! - `view` - Build a view graph and print or save its snapshot
//! - `server` - Start the HTTP server

mod commands;

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use kindred_core::{KindredError, ViewMode};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Kindred - Family Tree View Engine
///
/// Derives nuclear families from a genealogy dataset and builds the
/// de-duplicated node/link graph a family-tree renderer draws.
#[derive(Parser, Debug)]
#[command(name = "kindred")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the dataset database
    #[arg(short = 'D', long, global = true, default_value = "kindred.db")]
    pub database: PathBuf,

    /// Storage backend: "file" (binary snapshot) or "redb" (ACID database)
    #[arg(short = 'B', long, global = true, default_value = "redb")]
    pub backend: String,

    /// Configuration file (defaults to ./kindred.toml when present)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Show dataset metrics
    Status,

    /// Load a JSON dataset, replacing the stored one
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Show the families in which a person is a parent or a child
    Families {
        /// Person ID
        #[arg(short, long)]
        person: u64,
    },

    /// List a person and all of their ancestors
    Ancestors {
        /// Person ID
        #[arg(short, long)]
        person: u64,
    },

    /// List a person and all of their descendants
    Descendants {
        /// Person ID
        #[arg(short, long)]
        person: u64,
    },

    /// Estimate the age of a person within the family of a start person
    Age {
        /// Start person ID (generation 0)
        #[arg(short, long)]
        start: u64,

        /// Person ID to estimate
        #[arg(short, long)]
        person: u64,

        /// Reference date ("+2020-06-01" or "1 JUN 2020"); defaults to today
        #[arg(long)]
        as_of: Option<String>,
    },

    /// Build a view graph and print its render snapshot
    View {
        /// Start person ID
        #[arg(short, long)]
        start: u64,

        /// View mode (default, all, living, ancestors, descendants)
        #[arg(short, long, default_value = "default")]
        mode: ViewMode,

        /// Write the JSON snapshot to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), KindredError> {
    let config = AppConfig::load(cli.config.as_deref())?;
    if cli.verbose {
        tracing::info!(?config, "effective configuration");
    }

    let ctx = CommandContext {
        db_path: cli.database,
        backend: cli.backend,
        json_mode: cli.json_mode,
        config,
    };

    match cli.command {
        Some(Commands::Server { host, port }) => cmd_server(&ctx, &host, port).await,
        Some(Commands::Status) => cmd_status(&ctx),
        Some(Commands::Import { input }) => cmd_import(&ctx, &input),
        Some(Commands::Init { force }) => cmd_init(&ctx, force),
        Some(Commands::Families { person }) => cmd_families(&ctx, person),
        Some(Commands::Ancestors { person }) => cmd_ancestors(&ctx, person),
        Some(Commands::Descendants { person }) => cmd_descendants(&ctx, person),
        Some(Commands::Age {
            start,
            person,
            as_of,
        }) => cmd_age(&ctx, start, person, as_of.as_deref()),
        Some(Commands::View {
            start,
            mode,
            output,
        }) => cmd_view(&ctx, start, mode, output.as_deref()),
        None => {
            // No subcommand - show status by default
            cmd_status(&ctx)
        }
    }
}
