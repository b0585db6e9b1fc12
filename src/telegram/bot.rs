//! Bot initialization and message routing utilities
//!
//! This module contains:
//! - Bot instance creation
//! - Publishing the command menu from the registry
//! - Message addressing logic (private chats, mentions, replies)

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::types::{BotCommand, ChatKind, Message, MessageEntityKind, UserId};

use crate::core::{config, AppError, AppResult};
use crate::dialog::CommandRegistry;

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - No token configured, invalid URL or HTTP client failure
pub fn create_bot() -> anyhow::Result<Bot> {
    if config::BOT_TOKEN.is_empty() {
        anyhow::bail!(
            "No bot token: set BOT_TOKEN or TELOXIDE_TOKEN, or put it into '{}'",
            config::TOKEN_FILE.as_str()
        );
    }

    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    let bot = Bot::with_client(config::BOT_TOKEN.as_str(), client);

    let bot = match config::BOT_API_URL.as_deref() {
        Some(bot_api_url) => {
            log::info!("Using custom Bot API URL: {}", bot_api_url);
            let url = url::Url::parse(bot_api_url).map_err(AppError::from)?;
            bot.set_api_url(url)
        }
        None => bot,
    };

    Ok(bot)
}

/// Menu entries for every registered command that has a description
pub fn menu_commands(registry: &CommandRegistry) -> Vec<BotCommand> {
    registry
        .descriptions()
        .into_iter()
        .map(|(name, description)| BotCommand::new(name, description))
        .collect()
}

/// Sets up bot commands in Telegram UI
///
/// # Arguments
/// * `bot` - Bot instance to configure
/// * `registry` - Commands to publish; ones without a description stay hidden
pub async fn setup_bot_commands(bot: &Bot, registry: &CommandRegistry) -> AppResult<()> {
    let commands = menu_commands(registry);
    log::info!("Publishing {} command(s) to the Telegram menu", commands.len());
    bot.set_my_commands(commands).await?;
    Ok(())
}

/// Checks if a message is addressed to the bot
///
/// # Arguments
/// * `msg` - Message to check
/// * `bot_username` - Bot's username (without @)
/// * `bot_id` - Bot's user ID
///
/// # Returns
/// * `true` if message is addressed to bot (private chat, bot mention, reply to bot message)
/// * `false` if message is not addressed to bot
pub fn is_message_addressed_to_bot(msg: &Message, bot_username: Option<&str>, bot_id: UserId) -> bool {
    // In private chats, all messages are addressed to the bot
    if matches!(msg.chat.kind, ChatKind::Private(_)) {
        return true;
    }

    if let Some(reply_to) = msg.reply_to_message() {
        if reply_to.from.as_ref().is_some_and(|from| from.id == bot_id) {
            return true;
        }
    }

    let Some(username) = bot_username else {
        return false;
    };

    // Entity offsets are UTF-16 based, so let teloxide resolve the text
    if let Some(entities) = msg.parse_entities() {
        let mentioned = entities.iter().any(|entity| {
            matches!(entity.kind(), MessageEntityKind::Mention) && mentions(entity.text(), username)
        });
        if mentioned {
            return true;
        }
    }

    msg.text()
        .is_some_and(|text| text.to_lowercase().contains(&format!("@{}", username.to_lowercase())))
}

fn mentions(mention: &str, username: &str) -> bool {
    mention.strip_prefix('@').unwrap_or(mention).eq_ignore_ascii_case(username)
}
