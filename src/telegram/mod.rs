//! Telegram bot integration: update intake, reply rendering and bot setup

pub mod bot;
pub mod render;
pub mod schema;

// Re-exports for convenience
pub use bot::{create_bot, is_message_addressed_to_bot, setup_bot_commands};
pub use render::TelegramResponder;
pub use schema::{schema, HandlerDeps, HandlerError};
