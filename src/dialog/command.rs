//! The contract every interactive flow implements.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::reply::{OutboundMessage, Responder};
use super::session::{Session, StackEntry};

/// Result of a command capability. Any `Err` clears the user's navigation stack.
pub type CommandResult = anyhow::Result<()>;

/// A named, stateless handler shared by all users.
///
/// Per-user progress lives in the session's stack entries, never in the
/// command itself. Capabilities a flow does not need keep the default no-op.
#[async_trait]
pub trait Command: Send + Sync {
    /// Unique name; registered commands are invoked as `/name`.
    fn name(&self) -> &str;

    /// Text for the platform command menu. `None` keeps the command hidden.
    fn description(&self) -> Option<&str> {
        None
    }

    /// `/name` was issued, a command button was clicked, or the back token
    /// arrived while this command is on top of the stack.
    async fn on_command(&self, _ctx: &mut Context<'_>, _command: &str) -> CommandResult {
        Ok(())
    }

    /// Free text while this command is on top of the stack.
    async fn on_non_command(&self, _ctx: &mut Context<'_>, _text: &str) -> CommandResult {
        Ok(())
    }

    /// Non-command button payload while this command is on top of the stack.
    async fn on_query(&self, _ctx: &mut Context<'_>, _payload: &str) -> CommandResult {
        Ok(())
    }
}

/// What a capability gets to work with during one event.
pub struct Context<'a> {
    /// Session of the user who sent the event
    pub session: &'a mut Session,
    handler: Arc<dyn Command>,
    args: &'a str,
    responder: &'a dyn Responder,
}

impl<'a> Context<'a> {
    pub fn new(
        session: &'a mut Session,
        handler: Arc<dyn Command>,
        args: &'a str,
        responder: &'a dyn Responder,
    ) -> Self {
        Self {
            session,
            handler,
            args,
            responder,
        }
    }

    /// Text that followed the command name (`/code ABC` gives `ABC`), empty otherwise
    pub fn args(&self) -> &str {
        self.args
    }

    /// `true` when the invoked command owns the top stack entry
    pub fn is_active(&self) -> bool {
        self.session
            .top_entry()
            .is_some_and(|entry| Arc::ptr_eq(&entry.command, &self.handler))
    }

    /// Pushes the invoked command with `state` as its entry state
    pub fn push_self(&mut self, state: Value) {
        let handler = Arc::clone(&self.handler);
        self.session.push_entry(handler, state);
    }

    /// Pushes another (possibly unregistered) command
    pub fn push(&mut self, command: Arc<dyn Command>, state: Value) {
        self.session.push_entry(command, state);
    }

    pub fn pop(&mut self) -> Option<StackEntry> {
        self.session.pop_entry()
    }

    /// State of the top stack entry
    pub fn state(&self) -> Option<&Value> {
        self.session.top_entry().map(|entry| &entry.state)
    }

    pub fn state_mut(&mut self) -> Option<&mut Value> {
        self.session.top_entry_mut().map(|entry| &mut entry.state)
    }

    /// Sends a message to the user's chat
    pub async fn reply(&self, message: impl Into<OutboundMessage>) -> CommandResult {
        self.responder.send(self.session.chat_id(), message.into()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::session::Identity;
    use crate::testing::RecordingResponder;
    use serde_json::json;

    struct Noop;

    impl Command for Noop {
        fn name(&self) -> &str {
            "noop"
        }
    }

    #[tokio::test]
    async fn test_default_capabilities_are_noops() {
        let mut session = Session::new(Identity::new(1, 10, "u"));
        let responder = RecordingResponder::new();
        let handler: Arc<dyn Command> = Arc::new(Noop);
        let mut ctx = Context::new(&mut session, Arc::clone(&handler), "", &responder);

        assert!(handler.on_command(&mut ctx, "noop").await.is_ok());
        assert!(handler.on_non_command(&mut ctx, "hi").await.is_ok());
        assert!(handler.on_query(&mut ctx, "x").await.is_ok());
        assert!(session.is_empty());
        assert!(responder.sent().is_empty());
        assert!(handler.description().is_none());
    }

    #[tokio::test]
    async fn test_push_self_and_is_active() {
        let mut session = Session::new(Identity::new(1, 10, "u"));
        let responder = RecordingResponder::new();
        let handler: Arc<dyn Command> = Arc::new(Noop);
        let other: Arc<dyn Command> = Arc::new(Noop);

        let mut ctx = Context::new(&mut session, Arc::clone(&handler), "arg", &responder);
        assert_eq!(ctx.args(), "arg");
        assert!(!ctx.is_active());

        ctx.push_self(json!({"step": 1}));
        assert!(ctx.is_active());
        assert_eq!(ctx.state(), Some(&json!({"step": 1})));

        // Same type, different instance: not the active one.
        ctx.push(other, Value::Null);
        assert!(!ctx.is_active());
        assert!(ctx.pop().is_some());
        assert!(ctx.is_active());

        if let Some(state) = ctx.state_mut() {
            state["step"] = json!(2);
        }
        assert_eq!(session.top_entry().unwrap().state, json!({"step": 2}));
    }

    #[tokio::test]
    async fn test_reply_goes_to_session_chat() {
        let mut session = Session::new(Identity::new(1, 10, "u"));
        let responder = RecordingResponder::new();
        let ctx = Context::new(&mut session, Arc::new(Noop), "", &responder);

        ctx.reply("hello").await.unwrap();

        let sent = responder.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 10);
        assert_eq!(sent[0].1.text, "hello");
    }
}
