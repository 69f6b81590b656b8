//! filevault - command-line client for the filevault file-storage server.
//!
//! Signs in, keeps the session between runs, and exposes the folder and file
//! operations of the server API.

mod commands;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use filevault_core::{Config, KeyValueStore, MemoryStore, PendingRoute, Route, SessionStore};

use commands::Command;

/// Log file name in the cache directory
const LOG_FILE: &str = "filevault.log";

/// Set to `1` to also log into the cache directory
const LOG_FILE_ENV: &str = "FILEVAULT_LOG_FILE";

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let ephemeral = take_flag(&mut args, "--ephemeral");

    let mut config = Config::load()?;

    let log_dir = match std::env::var(LOG_FILE_ENV).as_deref() {
        Ok("1") => config.cache_dir().ok(),
        _ => None,
    };
    let _guard = init_tracing(log_dir);

    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}\n\n{}", e, commands::USAGE);
            std::process::exit(2);
        }
    };
    if let Command::Help = command {
        println!("{}", commands::USAGE);
        return Ok(());
    }

    let storage: Arc<dyn KeyValueStore> = if ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        config.open_storage()?
    };
    let navigator = Arc::new(PendingRoute::new());
    let mut store = SessionStore::new(storage, navigator.clone(), &config.api_url())?;
    store.get_data_from_storage();
    info!(command = ?command, "filevault starting");

    let result = commands::run(command, &mut store, &mut config).await;

    if navigator.take() == Some(Route::LoginReg) {
        eprintln!("You are signed out. Run `filevault login` to sign in again.");
    }

    result
}

/// Remove `flag` from `args`, reporting whether it was there
fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    let before = args.len();
    args.retain(|a| a != flag);
    args.len() != before
}
