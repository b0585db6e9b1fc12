//! Conversion of outbound messages to Telegram requests

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::dialog::{Keyboard, OutboundMessage, Responder};

/// Telegram rejects messages longer than this many UTF-16 code units
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Builds inline markup from a keyboard, skipping holes and empty rows
pub fn inline_markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
        .rows()
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|button| InlineKeyboardButton::callback(button.label.clone(), button.payload.clone()))
                .collect()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

/// Splits `text` into chunks of at most `limit` UTF-16 code units, preferring line breaks.
///
/// Empty text yields a single empty chunk.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = utf16_len(line);
        if current_len + line_len <= limit {
            current.push_str(line);
            current_len += line_len;
            continue;
        }
        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        // Line longer than the limit on its own: hard split, never inside a surrogate pair
        for ch in line.chars() {
            let ch_len = ch.len_utf16();
            if current_len + ch_len > limit && !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push(ch);
            current_len += ch_len;
        }
    }

    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Reply channel that sends through the Bot API.
///
/// Long texts go out as several messages; the keyboard is attached to the last one.
#[derive(Clone)]
pub struct TelegramResponder {
    bot: Bot,
}

impl TelegramResponder {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Responder for TelegramResponder {
    async fn send(&self, chat_id: i64, message: OutboundMessage) -> anyhow::Result<()> {
        let chunks = split_message(&message.text, MAX_MESSAGE_LEN);
        let last = chunks.len() - 1;

        for (i, chunk) in chunks.into_iter().enumerate() {
            let request = self.bot.send_message(ChatId(chat_id), chunk);
            match (&message.keyboard, i == last) {
                (Some(keyboard), true) if !keyboard.is_empty() => {
                    request.reply_markup(inline_markup(keyboard)).await?;
                }
                _ => {
                    request.await?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::Button;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_inline_markup_skips_holes() {
        let mut kb = Keyboard::new();
        kb.set_button(0, 0, Button::callback("A", "a"))
            .set_button(2, 0, Button::callback("C", "c"))
            .set_button(0, 2, Button::back("Back"));

        let markup = inline_markup(&kb);

        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[0].len(), 2);
        assert_eq!(markup.inline_keyboard[0][1].text, "C");
        assert_eq!(markup.inline_keyboard[1][0].text, "Back");
    }

    #[test]
    fn test_split_short_message_is_untouched() {
        assert_eq!(split_message("hello", 10), vec!["hello".to_string()]);
        assert_eq!(split_message("", 10), vec![String::new()]);
    }

    #[test]
    fn test_split_prefers_line_breaks() {
        let chunks = split_message("aaaa\nbbbb\ncc", 6);
        assert_eq!(chunks, vec!["aaaa\n", "bbbb\n", "cc"]);
    }

    #[test]
    fn test_split_hard_splits_long_lines() {
        let chunks = split_message("abcdefgh", 3);
        assert_eq!(chunks, vec!["abc", "def", "gh"]);
    }

    #[test]
    fn test_split_counts_utf16_units_not_bytes() {
        let text = "ж".repeat(5);
        let chunks = split_message(&text, 5);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_split_counts_emoji_as_two_units() {
        let text = "😀".repeat(3);
        let chunks = split_message(&text, 4);
        assert_eq!(chunks, vec!["😀😀", "😀"]);
        assert!(chunks.iter().all(|c| c.encode_utf16().count() <= 4));

        let chunks = split_message(&"😀".repeat(MAX_MESSAGE_LEN), MAX_MESSAGE_LEN);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.encode_utf16().count() <= MAX_MESSAGE_LEN));
    }
}
