//! Message flow: commands, URL extraction, resolution and delivery.
//!
//! The same entry points serve the webhook front door and the long-polling
//! dispatcher.

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{Message, ParseMode, UpdateKind, User};
use teloxide::utils::html;

use crate::app::App;
use crate::core::error::AppResult;
use crate::core::metrics;
use crate::core::validation::extract_url;
use crate::resolver::ResolveOutcome;
use crate::telegram::bot::Command;
use crate::telegram::reply::{ReplyChannel, StatusMessage, TelegramReply};
use crate::telegram::Bot;

/// Error type for dispatcher endpoints
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// User-facing texts
pub mod texts {
    use indoc::indoc;

    pub const GREETING: &str = indoc! {"
        👋 Hi! Send me a link to a TikTok, Instagram Reels or YouTube Shorts video
        and I'll send the video right back.

        Commands:
        /me - your Telegram profile info
    "};

    pub const NO_URL: &str = "🔗 I need a link. Send me a message with a video URL (it should start with http).";

    pub const RESOLVING: &str = "⏳ Looking for the video...";

    pub const ALL_FAILED: &str = "❌ Couldn't get the video. Every server failed:";

    pub const NO_INSTANCES: &str = "❌ Couldn't get the video: no servers are available right now.";

    pub const DELIVERY_FAILED: &str =
        "⚠️ Found the video but Telegram couldn't take it (too large or unsupported format). Direct link:";
}

/// Text shown when every instance failed.
pub fn failure_text(outcome: &ResolveOutcome) -> String {
    let report = outcome.report();
    if report.is_empty() {
        texts::NO_INSTANCES.to_string()
    } else {
        format!("{}\n\n{}", texts::ALL_FAILED, report)
    }
}

/// Text shown when the link was resolved but Telegram refused the video.
pub fn delivery_failure_text(direct_url: &url::Url) -> String {
    format!("{}\n{}", texts::DELIVERY_FAILED, direct_url)
}

/// Profile summary for `/me` (HTML).
pub fn profile_text(user: &User) -> String {
    let yes_no = |flag: bool| if flag { "Yes" } else { "No" };
    let username = user
        .username
        .as_deref()
        .map(|u| format!("@{}", html::escape(u)))
        .unwrap_or_else(|| "none".to_string());

    format!(
        "🕵️ <b>User info</b>\n\n\
         🆔 <b>ID:</b> <code>{}</code>\n\
         👤 <b>Name:</b> {}\n\
         🔗 <b>Username:</b> {}\n\
         🌐 <b>Language:</b> {}\n\
         💎 <b>Premium:</b> {}\n\
         🤖 <b>Bot:</b> {}",
        user.id.0,
        html::escape(&user.full_name()),
        username,
        html::escape(user.language_code.as_deref().unwrap_or("unknown")),
        yes_no(user.is_premium),
        yes_no(user.is_bot),
    )
}

/// Handles one text message against any reply channel.
///
/// Exactly one final reply is produced: the greeting, the missing-URL prompt,
/// the video, or a failure text. No network call is made for text without a link.
pub async fn handle_text(app: &App, text: &str, reply: &dyn ReplyChannel) -> AppResult<()> {
    if matches!(Command::parse_leading(text), Some(Command::Start | Command::Help)) {
        reply.send_text(texts::GREETING).await?;
        return Ok(());
    }

    let Some(url) = extract_url(text) else {
        log::debug!("No URL in message, prompting");
        metrics::RESOLVE_REQUESTS_TOTAL.with_label_values(&["no_url"]).inc();
        reply.send_text(texts::NO_URL).await?;
        return Ok(());
    };

    let status = reply.send_text(texts::RESOLVING).await?;
    let outcome = app.resolve(&url).await;

    match &outcome {
        ResolveOutcome::Success { direct_url, .. } => match reply.send_video(direct_url).await {
            Ok(()) => {
                if let Err(e) = reply.delete_status(status).await {
                    log::warn!("Failed to delete status message: {}", e);
                }
            }
            Err(e) => {
                log::warn!("Video delivery failed for {}: {}", direct_url, e);
                finish_status(reply, status, &delivery_failure_text(direct_url)).await?;
            }
        },
        ResolveOutcome::Failure(_) => {
            finish_status(reply, status, &failure_text(&outcome)).await?;
        }
    }

    Ok(())
}

/// Edits the status message into `text`, or sends `text` fresh if editing fails.
async fn finish_status(reply: &dyn ReplyChannel, status: StatusMessage, text: &str) -> AppResult<()> {
    if let Err(e) = reply.edit_status(status, text).await {
        log::warn!("Failed to edit status message, sending a new one: {}", e);
        reply.send_text(text).await?;
    }
    Ok(())
}

/// Handles one Telegram message.
pub async fn handle_message(app: &App, bot: &Bot, msg: &Message) -> AppResult<()> {
    let Some(text) = msg.text() else {
        log::debug!("Ignoring non-text message {} in chat {}", msg.id.0, msg.chat.id);
        return Ok(());
    };

    if Command::parse_leading(text) == Some(Command::Me) {
        let reply_text = match msg.from.as_ref() {
            Some(user) => profile_text(user),
            None => "🤷 I can't see who sent this message.".to_string(),
        };
        bot.send_message(msg.chat.id, reply_text)
            .parse_mode(ParseMode::Html)
            .await?;
        return Ok(());
    }

    let reply = TelegramReply::new(bot.clone(), msg.chat.id);
    handle_text(app, text, &reply).await
}

/// Handles one raw update; everything except messages is ignored.
pub async fn handle_update(app: &App, bot: &Bot, update: Update) -> AppResult<()> {
    match update.kind {
        UpdateKind::Message(msg) => handle_message(app, bot, &msg).await,
        _ => {
            log::debug!("Ignoring update {} without a message", update.id.0);
            Ok(())
        }
    }
}

/// Dispatcher schema for long-polling mode.
pub fn schema(app: Arc<App>) -> UpdateHandler<HandlerError> {
    Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
        let app = Arc::clone(&app);
        async move {
            if let Err(e) = handle_message(&app, &bot, &msg).await {
                log::error!("Message handler failed in chat {}: {}", msg.chat.id, e);
            }
            Ok(())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{FailureReason, Instance, ResolveOutcome};

    fn user() -> User {
        serde_json::from_value(serde_json::json!({
            "id": 42,
            "is_bot": false,
            "first_name": "Ann <3",
            "username": "ann",
            "language_code": "en",
            "is_premium": true
        }))
        .unwrap()
    }

    #[test]
    fn test_profile_text_escapes_html() {
        let text = profile_text(&user());
        assert!(text.contains("<code>42</code>"));
        assert!(text.contains("Ann &lt;3"));
        assert!(text.contains("@ann"));
        assert!(text.contains("<b>Premium:</b> Yes"));
        assert!(text.contains("<b>Bot:</b> No"));
    }

    #[test]
    fn test_failure_text_without_attempts() {
        let outcome = ResolveOutcome::Failure(Default::default());
        assert_eq!(failure_text(&outcome), texts::NO_INSTANCES);
    }

    #[tokio::test]
    async fn test_failure_text_lists_every_attempt() {
        let resolver = crate::resolver::Resolver::new(crate::core::config::ResolverConfig {
            deadline: std::time::Duration::ZERO,
            ..Default::default()
        })
        .unwrap();
        let candidates = vec![
            Instance::parse("https://a.example").unwrap(),
            Instance::parse("https://b.example").unwrap(),
        ];
        let outcome = resolver.resolve("https://youtu.be/abc", &candidates).await;

        let text = failure_text(&outcome);
        assert!(text.starts_with(texts::ALL_FAILED));
        assert!(text.contains("https://a.example: skipped"));
        assert!(text.contains("https://b.example: skipped"));
        assert!(outcome
            .report()
            .attempts()
            .iter()
            .all(|a| a.reason == FailureReason::DeadlineReached));
    }

    #[test]
    fn test_delivery_failure_text_contains_link() {
        let url = url::Url::parse("https://cdn.example/v.mp4").unwrap();
        let text = delivery_failure_text(&url);
        assert!(text.starts_with(texts::DELIVERY_FAILED));
        assert!(text.ends_with("https://cdn.example/v.mp4"));
    }
}
