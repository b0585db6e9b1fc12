//! `/start`: main menu with an embedded feedback form

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::config::dialog::BACK_COMMAND;
use crate::dialog::{Button, Command, CommandResult, Context, Keyboard, OutboundMessage};

pub const ABOUT: &str = "about";
pub const FEEDBACK: &str = "feedback";

/// Scratch key holding every feedback text the user sent
pub const FEEDBACK_KEY: &str = "feedback";

const ABOUT_TEXT: &str = "I keep track of where you are in a conversation, so multi-step flows \
                          pick up your next message. Press Back to leave any page.";

/// Main menu text and buttons
pub fn menu_message() -> OutboundMessage {
    let mut keyboard = Keyboard::new();
    keyboard
        .set_button(0, 0, Button::callback("About", ABOUT))
        .set_button(1, 0, Button::callback("Feedback", FEEDBACK))
        .set_button(0, 1, Button::command("Help", "help"))
        .set_button(0, 2, Button::back("Close"));
    OutboundMessage::text("Main menu").with_keyboard(keyboard)
}

/// Menu page: pushes itself, leaves on the back token
pub struct StartCommand {
    feedback: Arc<FeedbackPage>,
}

impl StartCommand {
    pub fn new() -> Self {
        Self {
            feedback: Arc::new(FeedbackPage),
        }
    }
}

impl Default for StartCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Command for StartCommand {
    fn name(&self) -> &str {
        "start"
    }

    fn description(&self) -> Option<&str> {
        Some("main menu")
    }

    async fn on_command(&self, ctx: &mut Context<'_>, command: &str) -> CommandResult {
        if command == BACK_COMMAND {
            ctx.pop();
            return ctx.reply("Menu closed. Send /start to open it again.").await;
        }

        if ctx.is_active() {
            if let Some(state) = ctx.state_mut() {
                *state = json!({"page": "menu"});
            }
        } else {
            ctx.push_self(json!({"page": "menu"}));
        }
        ctx.reply(menu_message()).await
    }

    async fn on_non_command(&self, ctx: &mut Context<'_>, _text: &str) -> CommandResult {
        ctx.reply(menu_message()).await
    }

    async fn on_query(&self, ctx: &mut Context<'_>, payload: &str) -> CommandResult {
        match payload {
            ABOUT => {
                if let Some(state) = ctx.state_mut() {
                    state["page"] = json!(ABOUT);
                }
                let keyboard = Keyboard::column([Button::back("Back")]);
                ctx.reply(OutboundMessage::text(ABOUT_TEXT).with_keyboard(keyboard)).await
            }
            FEEDBACK => {
                let page: Arc<dyn Command> = self.feedback.clone();
                ctx.push(page, Value::Null);
                let keyboard = Keyboard::column([Button::back("Cancel")]);
                ctx.reply(OutboundMessage::text("Write your feedback in one message.").with_keyboard(keyboard))
                    .await
            }
            other => anyhow::bail!("unknown menu item '{}'", other),
        }
    }
}

/// Free-text form reachable only from the menu, never registered
pub struct FeedbackPage;

#[async_trait]
impl Command for FeedbackPage {
    fn name(&self) -> &str {
        "feedback"
    }

    async fn on_command(&self, ctx: &mut Context<'_>, command: &str) -> CommandResult {
        if command == BACK_COMMAND {
            ctx.pop();
            return ctx.reply(menu_message()).await;
        }
        Ok(())
    }

    async fn on_non_command(&self, ctx: &mut Context<'_>, text: &str) -> CommandResult {
        let entries = ctx
            .session
            .scratch_mut()
            .entry(FEEDBACK_KEY)
            .or_insert_with(|| Value::Array(Vec::new()));
        match entries {
            Value::Array(list) => list.push(json!(text)),
            _ => anyhow::bail!("scratch '{}' is not a list", FEEDBACK_KEY),
        }

        ctx.pop();
        ctx.reply("Thanks, your feedback was saved.").await?;
        ctx.reply(menu_message()).await
    }
}
