//! Outbound message description and the reply channel commands write to.
//!
//! Rendering to a concrete platform lives in `telegram::render`.

use async_trait::async_trait;

use crate::core::config::dialog::{BACK_COMMAND, COMMAND_PREFIX};

/// Inline button: a label and the payload delivered back on click
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    /// Button with an opaque payload, routed to the active flow's `on_query`
    pub fn callback(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }

    /// Button that invokes `/command` when clicked
    pub fn command(label: impl Into<String>, command: &str) -> Self {
        Self::callback(label, format!("{}{}", COMMAND_PREFIX, command))
    }

    /// Button that sends the back token to the active flow
    pub fn back(label: impl Into<String>) -> Self {
        Self::command(label, BACK_COMMAND)
    }
}

/// Grid of inline buttons addressed by `(x, y)`; `y` is the row.
///
/// Setting a cell beyond the current size grows the grid and leaves holes,
/// which renderers skip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    rows: Vec<Vec<Option<Button>>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keyboard with one button per row
    pub fn column(buttons: impl IntoIterator<Item = Button>) -> Self {
        let mut keyboard = Self::new();
        for (y, button) in buttons.into_iter().enumerate() {
            keyboard.set_button(0, y, button);
        }
        keyboard
    }

    /// Places `button` at column `x` of row `y`
    pub fn set_button(&mut self, x: usize, y: usize, button: Button) -> &mut Self {
        if self.rows.len() <= y {
            self.rows.resize_with(y + 1, Vec::new);
        }
        let row = &mut self.rows[y];
        if row.len() <= x {
            row.resize_with(x + 1, || None);
        }
        row[x] = Some(button);
        self
    }

    pub fn button(&self, x: usize, y: usize) -> Option<&Button> {
        self.rows.get(y)?.get(x)?.as_ref()
    }

    /// Rows with holes removed; rows left empty are dropped
    pub fn rows(&self) -> Vec<Vec<&Button>> {
        self.rows
            .iter()
            .map(|row| row.iter().flatten().collect::<Vec<_>>())
            .filter(|row| !row.is_empty())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.iter().all(Option::is_none))
    }
}

/// Text plus an optional inline keyboard
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

impl From<&str> for OutboundMessage {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for OutboundMessage {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

/// Delivers outbound messages to a chat.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn send(&self, chat_id: i64, message: OutboundMessage) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_button_grows_grid_with_holes() {
        let mut kb = Keyboard::new();
        kb.set_button(2, 1, Button::callback("c", "3"));

        assert!(kb.button(0, 0).is_none());
        assert!(kb.button(0, 1).is_none());
        assert_eq!(kb.button(2, 1), Some(&Button::callback("c", "3")));
        assert_eq!(kb.rows(), vec![vec![&Button::callback("c", "3")]]);
    }

    #[test]
    fn test_set_button_overwrites_cell() {
        let mut kb = Keyboard::new();
        kb.set_button(0, 0, Button::callback("a", "1"))
            .set_button(1, 0, Button::callback("b", "2"))
            .set_button(0, 0, Button::callback("z", "9"));

        let rows = kb.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0].label, "z");
        assert_eq!(rows[0][1].label, "b");
    }

    #[test]
    fn test_command_and_back_buttons_carry_prefix() {
        assert_eq!(Button::command("Help", "help").payload, "/help");
        assert_eq!(Button::back("Back").payload, "/back");
    }

    #[test]
    fn test_column_and_emptiness() {
        assert!(Keyboard::new().is_empty());
        let kb = Keyboard::column([Button::callback("a", "1"), Button::callback("b", "2")]);
        assert!(!kb.is_empty());
        assert_eq!(kb.rows().len(), 2);
    }

    #[test]
    fn test_outbound_from_text() {
        let msg: OutboundMessage = "hi".into();
        assert_eq!(msg, OutboundMessage::text("hi"));
        let msg = OutboundMessage::from(String::from("x")).with_keyboard(Keyboard::new());
        assert!(msg.keyboard.is_some());
    }
}
