//! Telegram bot integration and handlers

pub mod bot;
pub mod handlers;
pub mod reply;

/// Bot type used throughout the crate
pub type Bot = teloxide::Bot;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{handle_message, handle_text, handle_update, schema, HandlerError};
pub use reply::{ReplyChannel, StatusMessage, TelegramReply};
