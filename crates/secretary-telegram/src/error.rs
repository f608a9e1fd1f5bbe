//! Error types for the secretary bot.

use thiserror::Error;

/// Errors that can occur in the secretary bot.
///
/// Only the configuration variants are fatal; everything else is caught
/// by the main loop and turned into a log line or a chat reply.
#[derive(Debug, Error)]
pub enum SecretaryError {
    /// Bot token not provided.
    #[error("Telegram bot token not set. Set TELEGRAM_BOT_TOKEN or pass --token.")]
    MissingToken,

    /// Allow-listed chat id not provided.
    #[error("Telegram chat id not set. Set TELEGRAM_CHAT_ID or pass --chat-id.")]
    MissingChatId,

    /// Chat id is not an integer.
    #[error("Invalid chat id '{0}': expected an integer")]
    InvalidChatId(String),

    /// Failed to start the bot.
    #[error("Failed to start bot: {0}")]
    BotStartFailed(String),

    /// A Bot API request failed.
    #[error("Telegram error: {0}")]
    Telegram(String),

    /// Attachment download failed.
    #[error("Download failed: {0}")]
    Download(String),

    /// Audio conversion failed.
    #[error("Transcoding failed: {0}")]
    Transcode(String),

    /// Speech recognition produced nothing usable.
    #[error("Speech recognition failed: {0}")]
    Recognition(String),

    /// State file error.
    #[error("Persistence error: {0}")]
    Persistence(#[from] secretary_persistence::PersistenceError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for secretary operations.
pub type Result<T> = std::result::Result<T, SecretaryError>;
