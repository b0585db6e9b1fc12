//! `/help`: lists the commands shown in the menu

use async_trait::async_trait;

use crate::dialog::{Command, CommandResult, Context};

/// Stateless; never touches the stack
pub struct HelpCommand {
    entries: Vec<(String, String)>,
}

impl HelpCommand {
    /// `entries` are `(name, description)` pairs of the other commands
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    pub fn text(&self) -> String {
        let mut lines = vec!["I can:".to_string()];
        lines.extend(self.entries.iter().map(|(name, desc)| format!("/{} - {}", name, desc)));
        lines.push(format!("/{} - {}", self.name(), HELP_DESCRIPTION));
        lines.join("\n")
    }
}

const HELP_DESCRIPTION: &str = "this list";

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &str {
        "help"
    }

    fn description(&self) -> Option<&str> {
        Some(HELP_DESCRIPTION)
    }

    async fn on_command(&self, ctx: &mut Context<'_>, _command: &str) -> CommandResult {
        ctx.reply(self.text()).await
    }
}
