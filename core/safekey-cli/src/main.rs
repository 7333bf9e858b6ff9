//! safekey: operator CLI for the SafeKey keyboard core.
//!
//! Works on the same storage root the keyboard writes to, so it can inspect a pulled
//! device directory or drive the pipeline on a workstation.
//!
//! ## Subcommands
//!
//! - `replay`: Feed a scripted keystroke session through the engine
//! - `register`: Register the installation with the collection API
//! - `flush`: Run the batch gates and upload once, synchronously
//! - `status`: Show identity, registration and queue state

mod logging;
mod remote;
mod replay;
mod scripted;
mod status;

use clap::{Parser, Subcommand};
use safekey_core::StorageConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "safekey")]
#[command(about = "SafeKey keyboard pipeline tool")]
#[command(version)]
struct Cli {
    /// Storage root (defaults to the platform data dir)
    #[arg(long, global = true, env = "SAFEKEY_ROOT", value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay JSON-lines keyboard events (reads stdin unless --file is given)
    Replay {
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
    },

    /// Register this installation
    Register {
        #[arg(long)]
        email: String,

        #[arg(long)]
        child_age: String,
    },

    /// Upload the queue now if both batch gates are open
    Flush,

    /// Show queue and registration state
    Status {
        /// Also print every queued record
        #[arg(long)]
        show: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let storage = match resolve_storage(cli.root) {
        Ok(storage) => storage,
        Err(e) => {
            eprintln!("safekey: {}", e);
            std::process::exit(2);
        }
    };
    let _logging_guard = logging::init(&storage);

    let result = match cli.command {
        Commands::Replay { file } => replay::run(&storage, file.as_deref()),
        Commands::Register { email, child_age } => remote::register(&storage, email, child_age),
        Commands::Flush => remote::flush(&storage),
        Commands::Status { show } => status::run(&storage, show),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "safekey command failed");
        eprintln!("safekey: {}", e);
        std::process::exit(1);
    }
}

fn resolve_storage(root: Option<PathBuf>) -> Result<StorageConfig, String> {
    let root = root
        .or_else(StorageConfig::default_root)
        .ok_or_else(|| safekey_core::SafekeyError::StorageRootUnavailable.to_string())?;
    Ok(StorageConfig::with_root(root))
}
