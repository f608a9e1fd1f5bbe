//! Chat endpoint abstraction and its Telegram implementation.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, InputFile, UpdateKind};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{Result, SecretaryError};

/// Extra HTTP time on top of the long-poll wait.
const HTTP_GRACE: Duration = Duration::from_secs(10);

/// What an inbound event carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    /// Plain text message.
    Text(String),
    /// Voice note.
    Voice { file_id: String },
    /// Photo (largest size).
    Photo {
        file_id: String,
        caption: Option<String>,
    },
    /// Document attachment.
    Document {
        file_id: String,
        file_name: Option<String>,
        caption: Option<String>,
    },
    /// Anything else (stickers, edits, joins). Skipped.
    Unsupported,
}

/// One update from the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Sequence id; the next poll offset is this plus one.
    pub update_id: i32,
    /// Originating conversation, if the update has one.
    pub chat_id: Option<i64>,
    /// Content.
    pub payload: EventPayload,
}

/// The operations the bot needs from a chat endpoint.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Long-polls for updates starting at `offset`.
    async fn get_updates(&self, offset: i32, timeout: Duration) -> Result<Vec<InboundEvent>>;

    /// Sends one plain-text message (already chunked).
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Uploads a local file.
    async fn send_document(&self, chat_id: i64, path: &Path, caption: Option<&str>) -> Result<()>;

    /// Shows the "typing" indicator.
    async fn send_typing(&self, chat_id: i64) -> Result<()>;

    /// Downloads the remote file `file_id` to `dest`.
    async fn download(&self, file_id: &str, dest: &Path) -> Result<()>;
}

/// [`ChatTransport`] over the Telegram Bot API.
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    /// Creates a transport whose HTTP timeout outlasts `poll_timeout`.
    ///
    /// The default teloxide client gives up after 17 seconds, shorter than
    /// a normal long-poll.
    pub fn new(token: &str, poll_timeout: Duration) -> Result<Self> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(poll_timeout + HTTP_GRACE)
            .build()
            .map_err(|e| SecretaryError::BotStartFailed(e.to_string()))?;

        Ok(Self {
            bot: Bot::with_client(token, client),
        })
    }

    /// Get the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| SecretaryError::BotStartFailed(e.to_string()))?;
        Ok(me.username().to_string())
    }
}

fn event_from_update(update: Update) -> InboundEvent {
    let update_id = update.id.0 as i32;
    let UpdateKind::Message(msg) = update.kind else {
        return InboundEvent {
            update_id,
            chat_id: None,
            payload: EventPayload::Unsupported,
        };
    };

    let caption = msg.caption().map(str::to_string);
    let payload = if let Some(text) = msg.text() {
        EventPayload::Text(text.to_string())
    } else if let Some(voice) = msg.voice() {
        EventPayload::Voice {
            file_id: voice.file.id.clone(),
        }
    } else if let Some(largest) = msg.photo().and_then(|sizes| sizes.last()) {
        EventPayload::Photo {
            file_id: largest.file.id.clone(),
            caption,
        }
    } else if let Some(doc) = msg.document() {
        EventPayload::Document {
            file_id: doc.file.id.clone(),
            file_name: doc.file_name.clone(),
            caption,
        }
    } else {
        EventPayload::Unsupported
    };

    InboundEvent {
        update_id,
        chat_id: Some(msg.chat.id.0),
        payload,
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn get_updates(&self, offset: i32, timeout: Duration) -> Result<Vec<InboundEvent>> {
        let updates = self
            .bot
            .get_updates()
            .offset(offset)
            .timeout(timeout.as_secs() as u32)
            .await
            .map_err(|e| SecretaryError::Telegram(e.to_string()))?;

        Ok(updates.into_iter().map(event_from_update).collect())
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .map_err(|e| SecretaryError::Telegram(e.to_string()))?;
        Ok(())
    }

    async fn send_document(&self, chat_id: i64, path: &Path, caption: Option<&str>) -> Result<()> {
        let mut req = self
            .bot
            .send_document(ChatId(chat_id), InputFile::file(path.to_path_buf()));
        if let Some(caption) = caption {
            req = req.caption(caption);
        }
        req.await.map_err(|e| SecretaryError::Telegram(e.to_string()))?;
        Ok(())
    }

    async fn send_typing(&self, chat_id: i64) -> Result<()> {
        self.bot
            .send_chat_action(ChatId(chat_id), ChatAction::Typing)
            .await
            .map_err(|e| SecretaryError::Telegram(e.to_string()))?;
        Ok(())
    }

    async fn download(&self, file_id: &str, dest: &Path) -> Result<()> {
        let file = self
            .bot
            .get_file(file_id.to_string())
            .await
            .map_err(|e| SecretaryError::Download(e.to_string()))?;

        let mut dst = tokio::fs::File::create(dest).await?;
        let fetched = self.bot.download_file(&file.path, &mut dst).await;
        if let Err(e) = fetched {
            drop(dst);
            let _ = tokio::fs::remove_file(dest).await;
            return Err(SecretaryError::Download(e.to_string()));
        }
        dst.flush().await?;

        debug!(dest = %dest.display(), "Downloaded attachment");
        Ok(())
    }
}
