//! vidrelay - Telegram bot that turns video page links into playable videos
//!
//! A user sends a TikTok/Reels/YouTube link; the bot asks public resolver
//! instances for a direct media URL and sends the video back.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, metrics, the webhook web server
//! - `resolver`: instance directory and the multi-instance resolver
//! - `telegram`: bot setup, reply channel and message handlers
//! - `app`: the application context shared by all entry points

pub mod app;
pub mod cli;
pub mod core;
pub mod resolver;
pub mod telegram;

// Re-export commonly used types for convenience
pub use app::App;
pub use core::{config, AppError, AppResult};
pub use resolver::{Instance, ResolveOutcome, Resolver};
