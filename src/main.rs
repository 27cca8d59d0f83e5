//! # Pricebase CLI (`pbase`)
//!
//! ## Usage
//!
//! ```bash
//! pbase --config ./config/pbase.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pbase init` | Create the SQLite database and schema |
//! | `pbase import <file>` | Import one catalog document |
//! | `pbase search [substring]` | Print matching sections with their ancestors |
//! | `pbase roots` | List top-level sections |
//! | `pbase children <id>` | List direct child sections |
//! | `pbase groups <section-id>` | List name groups of a section |
//! | `pbase works <group-id>` | List works of a name group |
//! | `pbase work <id>` | Show one work with items and resources |
//! | `pbase stats` | Row counts and database size |
//! | `pbase serve` | Start the JSON HTTP server |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `warn`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pricebase::{browse, config, import, migrate, search, server, stats};

/// Pricebase CLI: import unit-price catalogs into SQLite and browse them.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/pbase.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "pbase",
    about = "Pricebase: import construction unit-price catalogs and browse them",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pbase.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all tables. Safe to run more
    /// than once.
    Init,

    /// Import one catalog XML document.
    ///
    /// Prints row counters and every recoverable issue (duplicate links,
    /// unreadable values, rejected rows). Issues do not fail the command.
    Import {
        /// Path to the catalog XML file.
        file: PathBuf,
    },

    /// Search sections by name.
    ///
    /// Case-insensitive substring match; every match is shown under its
    /// full ancestor chain. Without a substring, the whole tree is printed.
    Search {
        /// Substring to look for in section names.
        #[arg(default_value = "")]
        substring: String,
    },

    /// List sections without a parent.
    Roots,

    /// List direct child sections.
    Children {
        /// Parent section id.
        id: i64,
    },

    /// List name groups of a section.
    Groups {
        /// Section id.
        section_id: i64,
    },

    /// List works of a name group.
    Works {
        /// Name group id.
        group_id: i64,
    },

    /// Show one work with its items and resources.
    Work {
        /// Work id.
        id: i64,
    },

    /// Show row counts per table.
    Stats,

    /// Start the JSON HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Import { file } => {
            import::run_import(&cfg, &file).await?;
        }
        Commands::Search { substring } => {
            search::run_search(&cfg, &substring).await?;
        }
        Commands::Roots => {
            browse::run_roots(&cfg).await?;
        }
        Commands::Children { id } => {
            browse::run_children(&cfg, id).await?;
        }
        Commands::Groups { section_id } => {
            browse::run_groups(&cfg, section_id).await?;
        }
        Commands::Works { group_id } => {
            browse::run_works(&cfg, group_id).await?;
        }
        Commands::Work { id } => {
            browse::run_work(&cfg, id).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
