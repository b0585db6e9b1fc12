//! Inbound events, already classified into the three shapes the dispatcher routes.

use crate::core::config::dialog::COMMAND_PREFIX;

/// Who sent an event and where to answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub user_id: i64,
    pub display_name: String,
    pub chat_id: i64,
}

impl Sender {
    pub fn new(user_id: i64, display_name: impl Into<String>, chat_id: i64) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            chat_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// `/name args`
    Command { name: String, args: String },
    /// Free text
    Text(String),
    /// Inline button payload
    Query(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub sender: Sender,
    pub kind: EventKind,
}

impl InboundEvent {
    pub fn command(sender: Sender, name: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            sender,
            kind: EventKind::Command {
                name: name.into(),
                args: args.into(),
            },
        }
    }

    pub fn text(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            kind: EventKind::Text(text.into()),
        }
    }

    pub fn query(sender: Sender, payload: impl Into<String>) -> Self {
        Self {
            sender,
            kind: EventKind::Query(payload.into()),
        }
    }

    /// Classifies a text message: `/name@bot args` becomes a command event,
    /// anything else free text.
    pub fn from_text(sender: Sender, text: &str, bot_username: Option<&str>) -> Self {
        match parse_command(text, bot_username) {
            Some((name, args)) => Self::command(sender, name, args),
            None => Self::text(sender, text),
        }
    }
}

/// Splits `/name args` into `(name, args)`.
///
/// A `@username` suffix on the name is stripped when it addresses this bot
/// (case-insensitive). A suffix naming another bot is kept, so the lookup
/// misses and the event is dropped. Returns `None` for text without the
/// command prefix or with an empty name.
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<(String, String)> {
    let rest = text.trim_start().strip_prefix(COMMAND_PREFIX)?;
    let (head, args) = match rest.find(char::is_whitespace) {
        Some(pos) => (&rest[..pos], rest[pos..].trim()),
        None => (rest, ""),
    };

    let name = match (head.split_once('@'), bot_username) {
        (Some((name, target)), Some(own)) if target.eq_ignore_ascii_case(own) => name,
        _ => head,
    };

    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), args.to_string()))
}

/// Decodes a button payload that carries the command prefix.
///
/// The prefix alone makes it a command: `"/"` or `"/ top"` decode to an
/// empty name, which no registry entry matches.
pub fn decode_command_payload(payload: &str) -> Option<(String, String)> {
    let rest = payload.strip_prefix(COMMAND_PREFIX)?;
    let (name, args) = match rest.find(char::is_whitespace) {
        Some(pos) => (&rest[..pos], rest[pos..].trim()),
        None => (rest, ""),
    };
    Some((name.to_string(), args.to_string()))
}
