//! Platform-independent dispatch core
//!
//! Every user gets a [`Session`] holding a navigation stack of
//! `(command, state)` entries. The [`Dispatcher`] routes each
//! [`InboundEvent`] either to a registered command or to the command on top
//! of the sender's stack, so multi-step flows keep receiving the user's
//! input until they pop themselves.

pub mod command;
pub mod dispatcher;
pub mod event;
pub mod registry;
pub mod reply;
pub mod session;
pub mod store;

// Re-exports for convenience
pub use command::{Command, CommandResult, Context};
pub use dispatcher::{DispatchError, Dispatcher, DropReason, Outcome};
pub use event::{decode_command_payload, parse_command, EventKind, InboundEvent, Sender};
pub use registry::CommandRegistry;
pub use reply::{Button, Keyboard, OutboundMessage, Responder};
pub use session::{Identity, Session, StackEntry};
pub use store::{SessionHandle, SessionStore};
