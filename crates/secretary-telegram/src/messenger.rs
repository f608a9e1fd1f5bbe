//! Message Transport: polling, chunked sends, file uploads and downloads
//! for the one configured conversation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use secretary_core::{split_message, strip_markup, SecretaryConfig};
use tracing::{debug, warn};

use crate::transport::{ChatTransport, InboundEvent};

/// Result of one long-poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollBatch {
    /// Offset for the next poll; never lower than the one polled with.
    pub next_cursor: i32,
    /// Events received, in order.
    pub events: Vec<InboundEvent>,
    /// The poll failed; the caller should back off.
    pub failed: bool,
}

/// Sends and receives on behalf of the bot.
///
/// All outbound operations log failures and carry on; none of them
/// returns an error to the main loop.
pub struct Messenger {
    transport: Arc<dyn ChatTransport>,
    chat_id: i64,
    poll_timeout: Duration,
    chunk_limit: usize,
    chunk_delay: Duration,
}

impl Messenger {
    /// Creates a messenger for `config.chat_id`.
    pub fn new(transport: Arc<dyn ChatTransport>, config: &SecretaryConfig) -> Self {
        Self {
            transport,
            chat_id: config.chat_id,
            poll_timeout: config.poll_timeout,
            chunk_limit: config.chunk_limit,
            chunk_delay: config.chunk_delay,
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> Arc<dyn ChatTransport> {
        Arc::clone(&self.transport)
    }

    /// The conversation this messenger talks to.
    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    /// Long-polls for events after `cursor`.
    pub async fn receive_events(&self, cursor: i32) -> PollBatch {
        match self.transport.get_updates(cursor, self.poll_timeout).await {
            Ok(events) => {
                let next_cursor = events
                    .iter()
                    .map(|e| e.update_id.saturating_add(1))
                    .fold(cursor, i32::max);
                PollBatch {
                    next_cursor,
                    events,
                    failed: false,
                }
            }
            Err(e) => {
                warn!(error = %e, "Polling for updates failed");
                PollBatch {
                    next_cursor: cursor,
                    events: Vec::new(),
                    failed: true,
                }
            }
        }
    }

    /// Confirms every update before `cursor` so the endpoint does not
    /// deliver them again after a restart.
    pub async fn acknowledge(&self, cursor: i32) {
        if let Err(e) = self.transport.get_updates(cursor, Duration::ZERO).await {
            debug!(error = %e, cursor, "Failed to confirm updates");
        }
    }

    /// Sends `text` as plain text, split into as many messages as needed.
    ///
    /// Returns the number of chunks delivered.
    pub async fn send_text(&self, text: &str) -> usize {
        let plain = strip_markup(text);
        if plain.trim().is_empty() {
            debug!("Skipping empty message");
            return 0;
        }

        let chunks = split_message(&plain, self.chunk_limit);
        let total = chunks.len();
        let mut delivered = 0;

        for (i, chunk) in chunks.iter().enumerate() {
            match self.transport.send_text(self.chat_id, chunk).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(error = %e, chunk = i + 1, total, "Failed to send message chunk"),
            }
            if i + 1 < total {
                tokio::time::sleep(self.chunk_delay).await;
            }
        }
        delivered
    }

    /// Uploads the file at `path`. Returns false if it is not a regular
    /// file or the upload failed.
    pub async fn send_file(&self, path: &Path, caption: Option<&str>) -> bool {
        if !path.is_file() {
            warn!(path = %path.display(), "Not a regular file, not sending");
            return false;
        }
        match self.transport.send_document(self.chat_id, path, caption).await {
            Ok(()) => {
                debug!(path = %path.display(), "Sent file");
                true
            }
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Failed to send file");
                false
            }
        }
    }

    /// Downloads attachment `file_id` to `dest`. `None` on failure.
    pub async fn fetch_attachment(&self, file_id: &str, dest: &Path) -> Option<PathBuf> {
        if let Some(parent) = dest.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!(error = %e, dir = %parent.display(), "Cannot create download directory");
                return None;
            }
        }
        match self.transport.download(file_id, dest).await {
            Ok(()) => Some(dest.to_path_buf()),
            Err(e) => {
                warn!(error = %e, file_id, "Failed to download attachment");
                None
            }
        }
    }

    /// Shows the typing indicator once.
    pub async fn send_typing(&self) {
        if let Err(e) = self.transport.send_typing(self.chat_id).await {
            debug!(error = %e, "Failed to send typing action");
        }
    }
}
