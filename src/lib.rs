//! Stackbot - Telegram bot dispatch core with per-user navigation stacks
//!
//! Every user owns a stack of `(command, state)` pages. Commands, free text
//! and button clicks are routed to a registered command or to the page on
//! top of the sender's stack, which is how multi-step flows keep receiving
//! the user's input.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors and logging
//! - `dialog`: sessions, command contract, registry and the dispatcher
//! - `storage`: SQLite-backed identity records
//! - `telegram`: teloxide update intake and reply rendering
//! - `commands`: built-in flows
//! - `testing`: in-memory collaborators for tests

pub mod cli;
pub mod commands;
pub mod core;
pub mod dialog;
pub mod storage;
pub mod telegram;
pub mod testing;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, AppResult};
pub use dialog::{Command, CommandRegistry, Context, Dispatcher, InboundEvent, Outcome, SessionStore};
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
