//! Per-user conversation state: identity, navigation stack and scratch data.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::command::Command;

/// Persistent identity of a user, created on first contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Telegram user ID
    pub id: i64,
    /// Chat the bot talks to this user in
    pub chat_id: i64,
    /// Display name at the time of first contact
    pub name: String,
}

impl Identity {
    pub fn new(id: i64, chat_id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            chat_id,
            name: name.into(),
        }
    }
}

/// One page of a user's navigation stack.
///
/// `state` belongs to `command`: each command decides its shape, the
/// dispatcher never looks inside.
pub struct StackEntry {
    pub command: Arc<dyn Command>,
    pub state: Value,
}

impl StackEntry {
    pub fn new(command: Arc<dyn Command>, state: Value) -> Self {
        Self { command, state }
    }

    /// Name of the command owning this entry
    pub fn command_name(&self) -> &str {
        self.command.name()
    }
}

impl fmt::Debug for StackEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackEntry")
            .field("command", &self.command.name())
            .field("state", &self.state)
            .finish()
    }
}

/// Conversation state of a single user.
///
/// Not synchronized: the session store hands sessions out behind a mutex and
/// the dispatcher holds it for the duration of one event.
#[derive(Debug)]
pub struct Session {
    identity: Identity,
    stack: Vec<StackEntry>,
    scratch: Map<String, Value>,
}

impl Session {
    /// Fresh session with an empty stack and empty scratch bag
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            stack: Vec::new(),
            scratch: Map::new(),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn user_id(&self) -> i64 {
        self.identity.id
    }

    pub fn chat_id(&self) -> i64 {
        self.identity.chat_id
    }

    /// Makes `command` the active flow
    pub fn push_entry(&mut self, command: Arc<dyn Command>, state: Value) {
        log::debug!(
            "Session({}): push '{}' at depth {}",
            self.identity.id,
            command.name(),
            self.stack.len()
        );
        self.stack.push(StackEntry::new(command, state));
    }

    pub fn pop_entry(&mut self) -> Option<StackEntry> {
        let entry = self.stack.pop();
        if let Some(ref e) = entry {
            log::debug!("Session({}): pop '{}'", self.identity.id, e.command_name());
        }
        entry
    }

    /// Currently active entry
    pub fn top_entry(&self) -> Option<&StackEntry> {
        self.stack.last()
    }

    pub fn top_entry_mut(&mut self) -> Option<&mut StackEntry> {
        self.stack.last_mut()
    }

    /// `true` when no interactive flow is active
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Drops the whole navigation stack. Identity and scratch data survive.
    pub fn clear(&mut self) {
        self.stack.clear();
    }

    /// Free-form per-user values shared by all commands
    pub fn scratch(&self) -> &Map<String, Value> {
        &self.scratch
    }

    pub fn scratch_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.scratch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Page(&'static str);

    impl Command for Page {
        fn name(&self) -> &str {
            self.0
        }
    }

    fn session() -> Session {
        Session::new(Identity::new(7, 70, "ann"))
    }

    #[test]
    fn test_new_session_is_empty() {
        let s = session();
        assert!(s.is_empty());
        assert_eq!(s.depth(), 0);
        assert!(s.top_entry().is_none());
        assert_eq!(s.user_id(), 7);
        assert_eq!(s.chat_id(), 70);
    }

    #[test]
    fn test_push_pop_is_lifo() {
        let mut s = session();
        s.push_entry(Arc::new(Page("menu")), json!({"page": 1}));
        s.push_entry(Arc::new(Page("form")), json!({"step": 1}));

        assert_eq!(s.depth(), 2);
        assert_eq!(s.top_entry().map(StackEntry::command_name), Some("form"));

        let popped = s.pop_entry().unwrap();
        assert_eq!(popped.command_name(), "form");
        assert_eq!(popped.state, json!({"step": 1}));
        assert_eq!(s.top_entry().map(StackEntry::command_name), Some("menu"));
        assert!(s.pop_entry().is_some());
        assert!(s.pop_entry().is_none());
    }

    #[test]
    fn test_top_entry_mut_updates_state_in_place() {
        let mut s = session();
        s.push_entry(Arc::new(Page("wizard")), json!({"step": 1}));
        s.top_entry_mut().unwrap().state["step"] = json!(2);

        assert_eq!(s.depth(), 1);
        assert_eq!(s.top_entry().unwrap().state, json!({"step": 2}));
    }

    #[test]
    fn test_clear_keeps_identity_and_scratch() {
        let mut s = session();
        s.scratch_mut().insert("lang".to_string(), json!("en"));
        s.push_entry(Arc::new(Page("a")), Value::Null);
        s.push_entry(Arc::new(Page("b")), Value::Null);

        s.clear();

        assert!(s.is_empty());
        assert_eq!(s.identity(), &Identity::new(7, 70, "ann"));
        assert_eq!(s.scratch().get("lang"), Some(&json!("en")));
    }

    #[test]
    fn test_entry_debug_shows_command_name() {
        let entry = StackEntry::new(Arc::new(Page("menu")), json!({"page": 2}));
        let printed = format!("{:?}", entry);
        assert!(printed.contains("menu"));
        assert!(printed.contains("page"));
    }
}
