use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vidrelay")]
#[command(author, version, about = "Telegram bot that relays TikTok/Reels/YouTube links as playable videos", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Serve the webhook front door (default)
    Serve,

    /// Run the bot with long polling instead of a webhook
    Poll,

    /// Resolve one link from the terminal and print the direct URL
    Resolve {
        /// Video page URL (TikTok, Reels, YouTube...)
        url: String,
    },

    /// Print the candidate instances the configured directory yields
    Instances,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
