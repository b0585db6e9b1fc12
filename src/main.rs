use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;
use tokio::time::sleep;

use stackbot::cli::{Cli, Commands};
use stackbot::commands::default_registry;
use stackbot::core::{config, init_logger, log_startup_configuration, logging::parse_level};
use stackbot::dialog::{CommandRegistry, Dispatcher as DialogDispatcher, SessionStore};
use stackbot::storage::{create_pool, SqliteIdentityStore};
use stackbot::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, TelegramResponder};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to the appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Log panics from dispatcher tasks instead of losing them on stderr
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
        if let Some(msg) = panic_info.payload().downcast_ref::<&str>() {
            log::error!("Panic message: {}", msg);
        }
    }));

    // .env must be loaded before the first config static is read
    let _ = dotenv();

    init_logger(&config::LOG_FILE_PATH, parse_level(&config::LOG_LEVEL))?;

    match cli.command {
        Some(Commands::Run { drop_pending }) => run_bot(drop_pending).await,
        Some(Commands::Commands) => {
            print_commands(&default_registry());
            Ok(())
        }
        None => {
            log::info!("No command specified, running bot in default mode");
            run_bot(false).await
        }
    }
}

fn print_commands(registry: &CommandRegistry) {
    for name in registry.names() {
        let description = registry
            .get(name)
            .and_then(|cmd| cmd.description().map(str::to_string))
            .unwrap_or_else(|| "(hidden)".to_string());
        println!("/{:<12} {}", name, description);
    }
}

async fn run_bot(drop_pending: bool) -> Result<()> {
    let bot_init_start = std::time::Instant::now();
    log::info!("Starting bot...");
    log_startup_configuration();

    let bot = create_bot()?;

    // Retry while a local Bot API server is still starting
    let bot_info = {
        let mut startup_retry = 0;
        loop {
            match bot.get_me().await {
                Ok(info) => break info,
                Err(e) => {
                    let err_str = e.to_string();
                    let is_retryable = err_str.contains("restart")
                        || err_str.contains("network")
                        || err_str.contains("connection")
                        || err_str.contains("timed out")
                        || err_str.contains("Connection refused");

                    startup_retry += 1;
                    if startup_retry >= config::retry::STARTUP_MAX_RETRIES || !is_retryable {
                        return Err(anyhow::anyhow!(
                            "Failed to connect to Bot API after {} attempt(s): {}",
                            startup_retry,
                            e
                        ));
                    }

                    log::warn!(
                        "Bot API not ready (attempt {}/{}): {}. Retrying in {}s...",
                        startup_retry,
                        config::retry::STARTUP_MAX_RETRIES,
                        err_str,
                        config::retry::STARTUP_RETRY_DELAY_SECS
                    );
                    sleep(config::retry::startup_delay()).await;
                }
            }
        }
    };
    let bot_username = bot_info.username.clone();
    let bot_id = bot_info.id;
    log::info!("Bot username: {:?}, Bot ID: {}", bot_username, bot_id.0);

    let db_pool = Arc::new(
        create_pool(&config::DATABASE_PATH).map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?,
    );
    let identities = Arc::new(SqliteIdentityStore::new(db_pool));

    let registry = Arc::new(default_registry());
    log::info!("Registered commands: {}", registry.names().join(", "));

    if let Err(e) = setup_bot_commands(&bot, &registry).await {
        log::warn!("Failed to publish command menu: {}", e);
    }

    let dispatcher = Arc::new(DialogDispatcher::new(
        SessionStore::new(identities),
        registry,
        Arc::new(TelegramResponder::new(bot.clone())),
    ));
    let handler = schema(HandlerDeps::new(dispatcher, bot_username, bot_id));

    log::info!("================================================");
    log::info!(
        "Bot initialization complete in {:.2}s, long polling (drop pending: {})",
        bot_init_start.elapsed().as_secs_f64(),
        drop_pending
    );
    log::info!("================================================");

    let mut retry_count = 0;
    loop {
        let bot_clone = bot.clone();
        let handler_clone = handler.clone();

        // Run in a separate task so a panic surfaces through the JoinHandle
        let handle = tokio::spawn(async move {
            let mut builder = Polling::builder(bot_clone.clone());
            if drop_pending {
                builder = builder.drop_pending_updates();
            }
            let listener = builder.build();

            Dispatcher::builder(bot_clone, handler_clone)
                .enable_ctrlc_handler()
                .build()
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await
        });

        match handle.await {
            Ok(()) => {
                log::info!("Dispatcher shutdown gracefully");
                break;
            }
            Err(join_err) if join_err.is_panic() => {
                log::error!("Dispatcher panicked: {}", join_err);
                if retry_count >= config::retry::MAX_DISPATCHER_RETRIES {
                    log::error!("Max retries reached after panic. Exiting...");
                    break;
                }
                retry_count += 1;
                log::info!(
                    "Restarting dispatcher after panic (attempt {}/{})...",
                    retry_count,
                    config::retry::MAX_DISPATCHER_RETRIES
                );
                sleep(config::retry::backoff(retry_count)).await;
            }
            Err(join_err) => {
                log::warn!("Dispatcher task was cancelled: {}", join_err);
                break;
            }
        }
    }

    Ok(())
}
