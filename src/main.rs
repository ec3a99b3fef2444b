use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::payloads::SetWebhookSetters;
use teloxide::update_listeners::Polling;

use vidrelay::cli::{Cli, Commands};
use vidrelay::core::{config::Config, init_logger, log_resolver_configuration, metrics, web_server};
use vidrelay::resolver::ResolveOutcome;
use vidrelay::telegram::{create_bot, schema, setup_bot_commands, Bot};
use vidrelay::App;

/// Main entry point
///
/// Parses CLI arguments and dispatches to the appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (configuration, logging, bot creation)
/// or, for `resolve`, when every instance failed.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    init_logger(config.log_level, config.log_file.as_deref())?;

    // Log panics from spawned tasks instead of losing them on stderr
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {}", panic_info);
    }));

    log_resolver_configuration(&config);
    metrics::init_metrics();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_webhook_server(config).await,
        Commands::Poll => run_polling(config).await,
        Commands::Resolve { url } => run_cli_resolve(config, &url).await,
        Commands::Instances => run_list_instances(config).await,
    }
}

/// Builds the bot from the configured token; a missing token is fatal.
async fn init_bot(config: &Config) -> Result<Bot> {
    let token = config.require_bot_token()?;
    let bot = create_bot(token, config.bot_api_url.as_ref())?;

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }
    Ok(bot)
}

/// Run the webhook front door
async fn run_webhook_server(config: Config) -> Result<()> {
    let bot = init_bot(&config).await?;

    if let Some(url) = config.webhook_url.clone() {
        log::info!("Registering webhook at {}", url);
        let mut request = bot.set_webhook(url).drop_pending_updates(true);
        if let Some(secret) = &config.webhook_secret {
            use secrecy::ExposeSecret;
            request = request.secret_token(secret.expose_secret().to_string());
        }
        request.await?;
        log::info!("Webhook set successfully");
    } else {
        log::warn!("WEBHOOK_URL not set; assuming the webhook is registered elsewhere");
    }

    let addr = config.listen_addr;
    let app = Arc::new(App::new(config)?);
    web_server::start_web_server(addr, app, bot).await?;
    Ok(())
}

/// Run the bot in long polling mode
async fn run_polling(config: Config) -> Result<()> {
    let bot = init_bot(&config).await?;

    // Polling and a registered webhook are mutually exclusive
    bot.delete_webhook().await?;

    let app = Arc::new(App::new(config)?);
    log::info!("Starting bot in long polling mode");

    let listener = Polling::builder(bot.clone()).drop_pending_updates().build();
    Dispatcher::builder(bot, schema(app))
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}

/// Run CLI resolve command
async fn run_cli_resolve(config: Config, url: &str) -> Result<()> {
    let app = App::new(config)?;

    println!("🔗 Resolving {}", url);
    match app.resolve(url).await {
        ResolveOutcome::Success {
            direct_url,
            failed_before,
        } => {
            if !failed_before.is_empty() {
                println!("\nFailed before success:\n{}\n", failed_before);
            }
            println!("✅ {}", direct_url);
            Ok(())
        }
        ResolveOutcome::Failure(report) => {
            println!("\n❌ Every instance failed:\n{}", report);
            Err(anyhow::anyhow!("no instance could resolve {}", url))
        }
    }
}

/// Run CLI instances command
async fn run_list_instances(config: Config) -> Result<()> {
    let app = App::new(config)?;

    let candidates = app.candidates().await;
    println!("{} candidate instance(s):", candidates.len());
    for (idx, instance) in candidates.iter().enumerate() {
        println!("{:>3}. {} (protocol {})", idx + 1, instance, instance.version());
    }
    Ok(())
}
