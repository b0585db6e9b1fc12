//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - A startup summary of the effective configuration

use anyhow::Result;
use simplelog::*;
use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::core::config::{self, TokenSource};

/// Parses a level name, defaulting to `Info` for anything unknown
pub fn parse_level(name: &str) -> LevelFilter {
    name.trim().parse().unwrap_or(LevelFilter::Info)
}

/// Opens the log file for appending, creating it and its parent directory if needed
pub fn open_log_file(log_file_path: &str) -> Result<File> {
    if let Some(parent) = Path::new(log_file_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| anyhow::anyhow!("Failed to create log directory: {}", e))?;
        }
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .map_err(|e| anyhow::anyhow!("Failed to open log file: {}", e))
}

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file; earlier runs' lines are kept
/// * `level` - Minimum level written to both sinks
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to create the file or a logger was already installed
pub fn init_logger(log_file_path: &str, level: LevelFilter) -> Result<()> {
    let log_file = open_log_file(log_file_path)?;

    CombinedLogger::init(vec![
        TermLogger::new(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(level, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective configuration at application startup.
///
/// The token itself is never written, only where it came from.
pub fn log_startup_configuration() {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    match config::BOT_TOKEN_SOURCE.1 {
        TokenSource::Env => log::info!("✅ Bot token: from environment"),
        TokenSource::File => log::info!("✅ Bot token: from file {}", config::TOKEN_FILE.as_str()),
        TokenSource::Missing => {
            log::error!("❌ Bot token: not found");
            log::error!("   Set BOT_TOKEN or put the token into {}", config::TOKEN_FILE.as_str());
        }
    }

    log::info!("Database: {}", config::DATABASE_PATH.as_str());
    log::info!("Log file: {}", config::LOG_FILE_PATH.as_str());

    match config::BOT_API_URL.as_deref() {
        Some(url) => log::info!("Bot API: {}", url),
        None => log::info!("Bot API: default (api.telegram.org)"),
    }
}
