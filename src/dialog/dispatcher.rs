//! Routes classified events to the command that owns the conversation.
//!
//! Routing rules:
//! - command: the back token goes to the active flow's own `on_command`,
//!   any other name to the registry; unknown names are dropped
//! - free text: top of the stack's `on_non_command`, dropped without an active flow
//! - button: a payload with the command prefix is routed as a command,
//!   anything else to the top of the stack's `on_query`
//!
//! A failing or panicking capability clears the user's stack before the
//! error is returned.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use thiserror::Error;

use super::command::{Command, CommandResult, Context};
use super::event::{decode_command_payload, EventKind, InboundEvent};
use super::registry::CommandRegistry;
use super::reply::Responder;
use super::session::Session;
use super::store::{SessionHandle, SessionStore};
use crate::core::config::dialog::BACK_COMMAND;
use crate::core::AppError;

/// Why an event was not handed to any command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// No registered command with that name
    UnknownCommand,
    /// Free text or button click with an empty stack
    NoActiveFlow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A command capability ran to completion
    Handled { command: String },
    Dropped(DropReason),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// A command capability failed; the user's stack has been cleared
    #[error("command '{command}' failed for user {user_id}: {source}")]
    Command {
        user_id: i64,
        command: String,
        #[source]
        source: anyhow::Error,
    },

    /// The session could not be loaded or created
    #[error("cannot resolve session of user {user_id}: {source}")]
    Session {
        user_id: i64,
        #[source]
        source: AppError,
    },
}

/// Which capability to call
enum Call<'a> {
    Command(&'a str),
    Text(&'a str),
    Query(&'a str),
}

pub struct Dispatcher {
    sessions: SessionStore,
    registry: Arc<CommandRegistry>,
    responder: Arc<dyn Responder>,
}

impl Dispatcher {
    pub fn new(sessions: SessionStore, registry: Arc<CommandRegistry>, responder: Arc<dyn Responder>) -> Self {
        Self {
            sessions,
            registry,
            responder,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handles one event to completion.
    ///
    /// Lookup misses are `Ok(Outcome::Dropped(..))`, not errors.
    pub async fn dispatch(&self, event: InboundEvent) -> Result<Outcome, DispatchError> {
        let sender = event.sender;
        let handle: SessionHandle = self
            .sessions
            .get_or_create(sender.user_id, &sender.display_name, sender.chat_id)
            .await
            .map_err(|source| DispatchError::Session {
                user_id: sender.user_id,
                source,
            })?;
        let mut session = handle.lock().await;

        let outcome = match event.kind {
            EventKind::Command { name, args } => self.route_command(&mut session, &name, &args).await,
            EventKind::Text(text) => match top_command(&session) {
                Some(command) => self.invoke(&mut session, command, "", Call::Text(&text)).await,
                None => Ok(Outcome::Dropped(DropReason::NoActiveFlow)),
            },
            EventKind::Query(payload) => match decode_command_payload(&payload) {
                Some((name, args)) => self.route_command(&mut session, &name, &args).await,
                None => match top_command(&session) {
                    Some(command) => self.invoke(&mut session, command, "", Call::Query(&payload)).await,
                    None => Ok(Outcome::Dropped(DropReason::NoActiveFlow)),
                },
            },
        };

        if let Ok(Outcome::Dropped(reason)) = &outcome {
            log::debug!("Event of user {} dropped: {:?}", sender.user_id, reason);
        }
        outcome
    }

    async fn route_command(&self, session: &mut Session, name: &str, args: &str) -> Result<Outcome, DispatchError> {
        let command = if name == BACK_COMMAND && !session.is_empty() {
            top_command(session)
        } else {
            self.registry.get(name)
        };

        match command {
            Some(command) => self.invoke(session, command, args, Call::Command(name)).await,
            None => Ok(Outcome::Dropped(DropReason::UnknownCommand)),
        }
    }

    async fn invoke(
        &self,
        session: &mut Session,
        command: Arc<dyn Command>,
        args: &str,
        call: Call<'_>,
    ) -> Result<Outcome, DispatchError> {
        let result: CommandResult = {
            let mut ctx = Context::new(session, Arc::clone(&command), args, self.responder.as_ref());
            let run = async {
                match call {
                    Call::Command(name) => {
                        log::debug!("User {}: '{}'.on_command({})", ctx.session.user_id(), command.name(), name);
                        command.on_command(&mut ctx, name).await
                    }
                    Call::Text(text) => {
                        log::debug!("User {}: '{}'.on_non_command", ctx.session.user_id(), command.name());
                        command.on_non_command(&mut ctx, text).await
                    }
                    Call::Query(payload) => {
                        log::debug!("User {}: '{}'.on_query({})", ctx.session.user_id(), command.name(), payload);
                        command.on_query(&mut ctx, payload).await
                    }
                }
            };
            match AssertUnwindSafe(run).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => Err(anyhow::anyhow!(
                    "'{}' panicked: {}",
                    command.name(),
                    panic_message(panic.as_ref())
                )),
            }
        };

        match result {
            Ok(()) => Ok(Outcome::Handled {
                command: command.name().to_string(),
            }),
            Err(source) => {
                log::warn!(
                    "Command '{}' failed for user {}, clearing {} stack entr(ies)",
                    command.name(),
                    session.user_id(),
                    session.depth()
                );
                session.clear();
                Err(DispatchError::Command {
                    user_id: session.user_id(),
                    command: command.name().to_string(),
                    source,
                })
            }
        }
    }
}

fn top_command(session: &Session) -> Option<Arc<dyn Command>> {
    session.top_entry().map(|entry| Arc::clone(&entry.command))
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::event::Sender;
    use crate::testing::{MemoryIdentityStore, RecordingResponder};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Pushes itself on `/menu`, pops on back.
    #[derive(Default)]
    struct Menu {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Command for Menu {
        fn name(&self) -> &str {
            "menu"
        }

        async fn on_command(&self, ctx: &mut Context<'_>, command: &str) -> CommandResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if command == BACK_COMMAND {
                ctx.pop();
            } else {
                ctx.push_self(json!({"page": 0}));
            }
            Ok(())
        }

        async fn on_query(&self, ctx: &mut Context<'_>, payload: &str) -> CommandResult {
            if let Some(state) = ctx.state_mut() {
                state["page"] = json!(payload);
            }
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl Command for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn on_command(&self, _ctx: &mut Context<'_>, _command: &str) -> CommandResult {
            anyhow::bail!("boom")
        }
    }

    /// Pushes itself on `/wedge`, panics on the next message.
    struct Wedge;

    #[async_trait]
    impl Command for Wedge {
        fn name(&self) -> &str {
            "wedge"
        }

        async fn on_command(&self, ctx: &mut Context<'_>, _command: &str) -> CommandResult {
            ctx.push_self(json!(null));
            Ok(())
        }

        async fn on_non_command(&self, _ctx: &mut Context<'_>, text: &str) -> CommandResult {
            panic!("cannot handle {text}")
        }
    }

    fn dispatcher(menu: Arc<Menu>) -> Dispatcher {
        let mut registry = CommandRegistry::new();
        registry.register(menu);
        registry.register(Arc::new(Broken));
        registry.register(Arc::new(Wedge));
        Dispatcher::new(
            SessionStore::new(Arc::new(MemoryIdentityStore::new())),
            Arc::new(registry),
            Arc::new(RecordingResponder::new()),
        )
    }

    fn ann() -> Sender {
        Sender::new(7, "ann", 70)
    }

    async fn depth(d: &Dispatcher) -> usize {
        let Some(handle) = d.sessions().get(7).await else {
            return 0;
        };
        let depth = handle.lock().await.depth();
        depth
    }

    #[tokio::test]
    async fn test_command_reaches_registered_handler() {
        let menu = Arc::new(Menu::default());
        let d = dispatcher(Arc::clone(&menu));

        let outcome = d.dispatch(InboundEvent::command(ann(), "menu", "")).await.unwrap();

        assert_eq!(outcome, Outcome::Handled { command: "menu".into() });
        assert_eq!(menu.calls.load(Ordering::SeqCst), 1);
        assert_eq!(depth(&d).await, 1);
    }

    #[tokio::test]
    async fn test_unknown_command_is_dropped() {
        let d = dispatcher(Arc::new(Menu::default()));
        let outcome = d.dispatch(InboundEvent::command(ann(), "nope", "")).await.unwrap();
        assert_eq!(outcome, Outcome::Dropped(DropReason::UnknownCommand));
    }

    #[tokio::test]
    async fn test_back_on_empty_stack_is_looked_up_in_registry() {
        let d = dispatcher(Arc::new(Menu::default()));
        let outcome = d.dispatch(InboundEvent::command(ann(), "back", "")).await.unwrap();
        assert_eq!(outcome, Outcome::Dropped(DropReason::UnknownCommand));
    }

    #[tokio::test]
    async fn test_back_goes_to_top_entry() {
        let menu = Arc::new(Menu::default());
        let d = dispatcher(Arc::clone(&menu));
        d.dispatch(InboundEvent::command(ann(), "menu", "")).await.unwrap();

        let outcome = d.dispatch(InboundEvent::query(ann(), "/back")).await.unwrap();

        assert_eq!(outcome, Outcome::Handled { command: "menu".into() });
        assert_eq!(menu.calls.load(Ordering::SeqCst), 2);
        assert_eq!(depth(&d).await, 0);
    }

    #[tokio::test]
    async fn test_query_updates_top_state() {
        let d = dispatcher(Arc::new(Menu::default()));
        d.dispatch(InboundEvent::command(ann(), "menu", "")).await.unwrap();
        d.dispatch(InboundEvent::query(ann(), "about")).await.unwrap();

        let handle = d.sessions().get(7).await.unwrap();
        let session = handle.lock().await;
        assert_eq!(session.top_entry().unwrap().state, json!({"page": "about"}));
    }

    #[tokio::test]
    async fn test_text_and_query_without_flow_are_dropped() {
        let d = dispatcher(Arc::new(Menu::default()));
        assert_eq!(
            d.dispatch(InboundEvent::text(ann(), "hi")).await.unwrap(),
            Outcome::Dropped(DropReason::NoActiveFlow)
        );
        assert_eq!(
            d.dispatch(InboundEvent::query(ann(), "about")).await.unwrap(),
            Outcome::Dropped(DropReason::NoActiveFlow)
        );
    }

    #[tokio::test]
    async fn test_failure_clears_stack() {
        let d = dispatcher(Arc::new(Menu::default()));
        d.dispatch(InboundEvent::command(ann(), "menu", "")).await.unwrap();
        d.dispatch(InboundEvent::command(ann(), "menu", "")).await.unwrap();
        assert_eq!(depth(&d).await, 2);

        let err = d.dispatch(InboundEvent::command(ann(), "broken", "")).await.unwrap_err();

        assert!(matches!(err, DispatchError::Command { user_id: 7, ref command, .. } if command == "broken"));
        assert_eq!(depth(&d).await, 0);
    }

    #[tokio::test]
    async fn test_session_error_is_reported() {
        let identities = Arc::new(MemoryIdentityStore::new());
        identities.set_failing(true);
        let d = Dispatcher::new(
            SessionStore::new(identities),
            Arc::new(CommandRegistry::new()),
            Arc::new(RecordingResponder::new()),
        );

        let err = d.dispatch(InboundEvent::text(ann(), "hi")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Session { user_id: 7, .. }));
    }

    #[tokio::test]
    async fn test_prefixed_payload_with_empty_name_is_unknown_command() {
        let menu = Arc::new(Menu::default());
        let d = dispatcher(Arc::clone(&menu));
        d.dispatch(InboundEvent::command(ann(), "menu", "")).await.unwrap();

        for payload in ["/", "/ top", "/\ntop"] {
            let outcome = d.dispatch(InboundEvent::query(ann(), payload)).await.unwrap();
            assert_eq!(outcome, Outcome::Dropped(DropReason::UnknownCommand), "payload {payload:?}");
        }

        let handle = d.sessions().get(7).await.unwrap();
        let session = handle.lock().await;
        assert_eq!(session.top_entry().unwrap().state, json!({"page": 0}));
        assert_eq!(menu.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panic_clears_stack() {
        let d = dispatcher(Arc::new(Menu::default()));
        d.dispatch(InboundEvent::command(ann(), "menu", "")).await.unwrap();
        d.dispatch(InboundEvent::command(ann(), "wedge", "")).await.unwrap();
        assert_eq!(depth(&d).await, 2);

        let err = d.dispatch(InboundEvent::text(ann(), "hi")).await.unwrap_err();

        match err {
            DispatchError::Command { user_id, command, source } => {
                assert_eq!(user_id, 7);
                assert_eq!(command, "wedge");
                assert!(source.to_string().contains("cannot handle hi"), "{source}");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(depth(&d).await, 0);
        assert_eq!(
            d.dispatch(InboundEvent::text(ann(), "hi again")).await.unwrap(),
            Outcome::Dropped(DropReason::NoActiveFlow)
        );
    }
}
