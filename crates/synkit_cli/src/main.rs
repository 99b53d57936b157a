//! synkit CLI
//!
//! Command-line tools for inspecting and maintaining a synkit client store.
//!
//! # Commands
//!
//! - `list` - List stored entities
//! - `get` / `delete` / `digest` - Work with one entity by encoded key
//! - `decode-key` - Show what an encoded key contains
//! - `next-id` - Allocate an id from the persisted counters
//! - `compact` - Rewrite the store log without superseded records

mod commands;

use clap::{Parser, Subcommand};
use commands::Format;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// synkit client store tools.
#[derive(Parser)]
#[command(name = "synkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Output format
    #[arg(global = true, short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored entities
    List {
        /// Only list entities of this kind
        #[arg(short, long)]
        kind: Option<String>,
    },

    /// Show one entity
    Get {
        /// Encoded key
        key: String,
    },

    /// Delete one entity from the local store
    Delete {
        /// Encoded key
        key: String,
    },

    /// Decode a key without opening a store
    DecodeKey {
        /// Encoded key
        key: String,
    },

    /// Print the content digest of one entity
    Digest {
        /// Encoded key
        key: String,
    },

    /// Allocate the next id
    NextId {
        /// Allocate from the RPC id counter instead
        #[arg(long)]
        rpc: bool,
    },

    /// Compact the store log
    Compact,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let format = cli.format;
    match cli.command {
        Commands::List { kind } => {
            let path = cli.path.ok_or("Store path required for list")?;
            commands::list::run(&path, kind.as_deref(), format)?;
        }
        Commands::Get { key } => {
            let path = cli.path.ok_or("Store path required for get")?;
            commands::entity::get(&path, &key, format)?;
        }
        Commands::Delete { key } => {
            let path = cli.path.ok_or("Store path required for delete")?;
            commands::entity::delete(&path, &key, format)?;
        }
        Commands::Digest { key } => {
            let path = cli.path.ok_or("Store path required for digest")?;
            commands::entity::digest(&path, &key, format)?;
        }
        Commands::DecodeKey { key } => {
            commands::key::run(&key, format)?;
        }
        Commands::NextId { rpc } => {
            let path = cli.path.ok_or("Store path required for next-id")?;
            commands::next_id::run(&path, rpc, format)?;
        }
        Commands::Compact => {
            let path = cli.path.ok_or("Store path required for compact")?;
            commands::compact::run(&path, format)?;
        }
        Commands::Version => {
            println!("synkit CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("synkit Core v{}", synkit_core::VERSION);
        }
    }

    Ok(())
}
