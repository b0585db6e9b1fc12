use once_cell::sync::Lazy;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Where the bot token was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// BOT_TOKEN or TELOXIDE_TOKEN environment variable
    Env,
    /// Token file (TOKEN_FILE, default `token`)
    File,
    /// Nothing configured
    Missing,
}

/// Path to the token file used when no token is set in the environment
/// Read from TOKEN_FILE environment variable
/// Default: token
pub static TOKEN_FILE: Lazy<String> = Lazy::new(|| env::var("TOKEN_FILE").unwrap_or_else(|_| "token".to_string()));

/// Bot token together with the place it was read from
/// Read from BOT_TOKEN or TELOXIDE_TOKEN, falling back to the token file
pub static BOT_TOKEN_SOURCE: Lazy<(String, TokenSource)> = Lazy::new(|| {
    if let Ok(token) = env::var("BOT_TOKEN").or_else(|_| env::var("TELOXIDE_TOKEN")) {
        if !token.trim().is_empty() {
            return (token.trim().to_string(), TokenSource::Env);
        }
    }
    match read_token_file(Path::new(TOKEN_FILE.as_str())) {
        Some(token) => (token, TokenSource::File),
        None => (String::new(), TokenSource::Missing),
    }
});

/// Bot token, empty when not configured
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| BOT_TOKEN_SOURCE.0.clone());

/// Custom Bot API server URL
/// Read from BOT_API_URL environment variable
pub static BOT_API_URL: Lazy<Option<String>> = Lazy::new(|| env::var("BOT_API_URL").ok().filter(|s| !s.is_empty()));

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: store.db
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "store.db".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: bot.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "bot.log".to_string()));

/// Log level name (error, warn, info, debug, trace)
/// Read from LOG_LEVEL environment variable
/// Default: info
pub static LOG_LEVEL: Lazy<String> = Lazy::new(|| env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()));

/// Reads the first whitespace-delimited word of a token file.
///
/// Returns `None` if the file is missing, unreadable or blank.
pub fn read_token_file(path: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(path).ok()?;
    contents.split_whitespace().next().map(str::to_string)
}

/// Conversation routing constants
pub mod dialog {
    /// Reserved command name that re-invokes the active flow instead of a registry lookup
    pub const BACK_COMMAND: &str = "back";

    /// Marks text and button payloads that invoke a command
    pub const COMMAND_PREFIX: char = '/';
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Bot API calls (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 60;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Retry configuration
pub mod retry {
    use super::Duration;

    /// How many times a crashed dispatcher is restarted
    pub const MAX_DISPATCHER_RETRIES: u32 = 5;

    /// Base for exponential backoff between dispatcher restarts (seconds)
    pub const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

    /// Attempts at `get_me` while the Bot API is still starting
    pub const STARTUP_MAX_RETRIES: u32 = 60;

    /// Delay between `get_me` attempts (in seconds)
    pub const STARTUP_RETRY_DELAY_SECS: u64 = 5;

    /// Backoff before the n-th dispatcher restart
    pub fn backoff(retry_count: u32) -> Duration {
        Duration::from_secs(EXPONENTIAL_BACKOFF_BASE.saturating_pow(retry_count))
    }

    /// Delay between `get_me` attempts
    pub fn startup_delay() -> Duration {
        Duration::from_secs(STARTUP_RETRY_DELAY_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_token_file_takes_first_word() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  123:abc trailing\nsecond-line").unwrap();

        assert_eq!(read_token_file(file.path()), Some("123:abc".to_string()));
    }

    #[test]
    fn test_read_token_file_blank_or_missing() {
        let file = NamedTempFile::new().unwrap();
        assert_eq!(read_token_file(file.path()), None);
        assert_eq!(read_token_file(Path::new("/definitely/not/here/token")), None);
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        assert_eq!(retry::backoff(1), Duration::from_secs(2));
        assert_eq!(retry::backoff(3), Duration::from_secs(8));
        assert_eq!(retry::backoff(200), Duration::from_secs(u64::MAX));
    }
}
