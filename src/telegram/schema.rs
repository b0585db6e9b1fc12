//! Dispatcher schema: turns Telegram updates into inbound events

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{Message, User, UserId};

use super::bot::is_message_addressed_to_bot;
use crate::core::config::dialog::COMMAND_PREFIX;
use crate::dialog::{Dispatcher, InboundEvent, Sender};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub dispatcher: Arc<Dispatcher>,
    pub bot_username: Option<String>,
    pub bot_id: UserId,
}

impl HandlerDeps {
    pub fn new(dispatcher: Arc<Dispatcher>, bot_username: Option<String>, bot_id: UserId) -> Self {
        Self {
            dispatcher,
            bot_username,
            bot_id,
        }
    }
}

/// Creates the dispatcher schema for the Telegram bot.
///
/// Text messages and callback queries are converted to [`InboundEvent`]s and
/// handed to the dialog dispatcher. Everything else is ignored.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry()
        .branch(message_handler(deps.clone()))
        .branch(callback_handler(deps))
}

/// Username if set, first name otherwise
pub fn display_name(user: &User) -> String {
    user.username.clone().unwrap_or_else(|| user.first_name.clone())
}

/// Telegram ids are u64 on the wire but fit in i64
fn sender_of(user: &User, chat_id: ChatId) -> Option<Sender> {
    let user_id = i64::try_from(user.id.0).ok()?;
    Some(Sender::new(user_id, display_name(user), chat_id.0))
}

/// Commands are always considered; free text only when addressed to the bot
fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let bot_username = deps.bot_username.clone();
    let bot_id = deps.bot_id;

    Update::filter_message()
        .filter(move |msg: Message| {
            let Some(text) = msg.text() else {
                return false;
            };
            text.trim_start().starts_with(COMMAND_PREFIX)
                || is_message_addressed_to_bot(&msg, bot_username.as_deref(), bot_id)
        })
        .endpoint(move |msg: Message| {
            let deps = deps.clone();
            async move {
                let (Some(user), Some(text)) = (msg.from.as_ref(), msg.text()) else {
                    return Ok(());
                };
                let Some(sender) = sender_of(user, msg.chat.id) else {
                    log::warn!("Ignoring message from user id {} out of range", user.id.0);
                    return Ok(());
                };

                let event = InboundEvent::from_text(sender, text, deps.bot_username.as_deref());
                dispatch(&deps, event).await
            }
        })
}

/// Callbacks are acknowledged first so the client stops its spinner
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
                log::warn!("Failed to answer callback query {:?}: {}", q.id, e);
            }

            let (Some(chat_id), Some(data)) = (q.message.as_ref().map(|m| m.chat().id), q.data.as_ref()) else {
                log::debug!("Ignoring callback query {:?} without message or data", q.id);
                return Ok(());
            };
            let Some(sender) = sender_of(&q.from, chat_id) else {
                return Ok(());
            };

            dispatch(&deps, InboundEvent::query(sender, data.as_str())).await
        }
    })
}

async fn dispatch(deps: &HandlerDeps, event: InboundEvent) -> Result<(), HandlerError> {
    let user_id = event.sender.user_id;
    match deps.dispatcher.dispatch(event).await {
        Ok(outcome) => {
            log::debug!("User {}: {:?}", user_id, outcome);
            Ok(())
        }
        Err(e) => {
            log::error!("Dispatch failed: {:#}", anyhow::Error::from(e));
            Ok(())
        }
    }
}
