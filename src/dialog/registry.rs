//! Name → shared command instance lookup.

use std::collections::HashMap;
use std::sync::Arc;

use super::command::Command;

/// Registry of top-level commands.
///
/// Filled once at startup and read-only afterwards, so it is shared as
/// `Arc<CommandRegistry>` without locking.
#[derive(Default, Clone)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `command` under its own name.
    ///
    /// Returns the command previously registered under that name, if any.
    pub fn register(&mut self, command: Arc<dyn Command>) -> Option<Arc<dyn Command>> {
        let name = command.name().to_string();
        self.register_as(name, command)
    }

    /// Registers `command` under an alias.
    pub fn register_as(&mut self, name: impl Into<String>, command: Arc<dyn Command>) -> Option<Arc<dyn Command>> {
        let name = name.into();
        let previous = self.commands.insert(name.clone(), command);
        if previous.is_some() {
            log::warn!("Command '{}' registered twice, previous instance replaced", name);
        }
        previous
    }

    /// Finds a command by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// `(name, description)` of every command that has a description, sorted by name
    pub fn descriptions(&self) -> Vec<(String, String)> {
        let mut listed: Vec<(String, String)> = self
            .commands
            .iter()
            .filter_map(|(name, cmd)| cmd.description().map(|d| (name.clone(), d.to_string())))
            .collect();
        listed.sort();
        listed
    }
}
