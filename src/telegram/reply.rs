//! Reply channel: the four things the message flow needs from the transport.

use async_trait::async_trait;
use teloxide::payloads::SendVideoSetters;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId};
use url::Url;

use crate::core::error::AppResult;
use crate::telegram::Bot;

/// Handle to a previously sent status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMessage(pub i32);

/// Outgoing side of one chat.
#[async_trait]
pub trait ReplyChannel: Send + Sync {
    /// Sends plain text; the returned handle can be edited or deleted later.
    async fn send_text(&self, text: &str) -> AppResult<StatusMessage>;

    /// Sends a video that Telegram fetches from `url` itself.
    async fn send_video(&self, url: &Url) -> AppResult<()>;

    async fn edit_status(&self, status: StatusMessage, text: &str) -> AppResult<()>;

    async fn delete_status(&self, status: StatusMessage) -> AppResult<()>;
}

/// [`ReplyChannel`] backed by the Telegram Bot API.
pub struct TelegramReply {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramReply {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }
}

#[async_trait]
impl ReplyChannel for TelegramReply {
    async fn send_text(&self, text: &str) -> AppResult<StatusMessage> {
        let sent = self.bot.send_message(self.chat_id, text).await?;
        Ok(StatusMessage(sent.id.0))
    }

    async fn send_video(&self, url: &Url) -> AppResult<()> {
        self.bot
            .send_video(self.chat_id, InputFile::url(url.clone()))
            .supports_streaming(true)
            .await?;
        Ok(())
    }

    async fn edit_status(&self, status: StatusMessage, text: &str) -> AppResult<()> {
        self.bot
            .edit_message_text(self.chat_id, MessageId(status.0), text)
            .await?;
        Ok(())
    }

    async fn delete_status(&self, status: StatusMessage) -> AppResult<()> {
        self.bot.delete_message(self.chat_id, MessageId(status.0)).await?;
        Ok(())
    }
}
