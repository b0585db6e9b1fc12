//! Built-in flows
//!
//! - `/start`: menu page with an embedded feedback form
//! - `/help`: lists the published commands
//! - `/cancel`: clears the navigation stack

pub mod cancel;
pub mod help;
pub mod start;

use std::sync::Arc;

use crate::dialog::CommandRegistry;

pub use cancel::CancelCommand;
pub use help::HelpCommand;
pub use start::{FeedbackPage, StartCommand};

/// Registry with every built-in command
pub fn default_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry.register(Arc::new(StartCommand::new()));
    registry.register(Arc::new(CancelCommand));

    let help = HelpCommand::new(registry.descriptions());
    registry.register(Arc::new(help));
    registry
}
