use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "stackbot")]
#[command(author, version, about = "Telegram bot with per-user navigation stacks for multi-step flows", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot with long polling
    Run {
        /// Skip updates that arrived while the bot was offline
        #[arg(long)]
        drop_pending: bool,
    },

    /// Print the registered commands and exit
    Commands,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand() {
        let cli = Cli::try_parse_from(["stackbot"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_run_drop_pending() {
        let cli = Cli::try_parse_from(["stackbot", "run", "--drop-pending"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Run { drop_pending: true }));
    }

    #[test]
    fn test_commands_subcommand() {
        let cli = Cli::try_parse_from(["stackbot", "commands"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Commands));
    }
}
