//! Bot initialization and the command list

use reqwest::ClientBuilder;
use secrecy::{ExposeSecret, SecretString};
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use url::Url;

use crate::core::error::AppResult;
use crate::telegram::Bot;

/// Request timeout for Bot API calls (in seconds)
/// sendVideo by URL makes Telegram download the file first, which can be slow
pub const BOT_API_TIMEOUT_SECS: u64 = 60;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Send me a TikTok, Reels or YouTube link. Commands:")]
pub enum Command {
    #[command(description = "greeting and usage")]
    Start,
    #[command(description = "how to use the bot")]
    Help,
    #[command(description = "show your Telegram profile info")]
    Me,
}

impl Command {
    /// Parses the leading command of `text`, ignoring arguments and a `@botname` suffix.
    pub fn parse_leading(text: &str) -> Option<Self> {
        let first = text.split_whitespace().next()?;
        if !first.starts_with('/') {
            return None;
        }
        let command = first.split('@').next().unwrap_or(first);
        Self::parse(command, "").ok()
    }
}

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(AppError)` - HTTP client could not be built
pub fn create_bot(token: &SecretString, api_url: Option<&Url>) -> AppResult<Bot> {
    let client = ClientBuilder::new()
        .timeout(std::time::Duration::from_secs(BOT_API_TIMEOUT_SECS))
        .build()?;
    let bot = Bot::with_client(token.expose_secret(), client);

    Ok(match api_url {
        Some(url) => {
            log::info!("Using custom Bot API URL: {}", url);
            bot.set_api_url(url.clone())
        }
        None => bot,
    })
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}
