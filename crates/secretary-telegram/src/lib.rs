//! Telegram front end for the AI secretary.
//!
//! The secretary relays messages from one allow-listed Telegram chat to a
//! locally installed coding assistant (Claude Code by default) and sends
//! the answers back. Voice notes are transcribed, photos and documents are
//! saved locally and referenced in the task text.
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather
//! - `TELEGRAM_CHAT_ID`: The only chat the bot answers
//!
//! Optional:
//! - `SECRETARY_CWD`: Initial working directory (default: home)
//! - `SECRETARY_ASSISTANT`: Assistant program (default: `claude`)
//! - `SECRETARY_RECOGNIZER`: Speech recognizer program; enables voice notes
//! - `SECRETARY_STATE_DIR`: State directory (default: `~/.ai-secretary`)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use secretary_assistant::ClaudeCode;
//! use secretary_core::SecretaryConfig;
//! use secretary_telegram::{SecretaryBot, TelegramTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SecretaryConfig::new("123:abc", 42);
//!     let transport = TelegramTransport::new(&config.bot_token, config.poll_timeout)?;
//!
//!     let mut bot = SecretaryBot::new(config, Arc::new(transport), Arc::new(ClaudeCode::default()));
//!     bot.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Commands
//!
//! - `/new` - Start a fresh assistant session
//! - `/status` - Working directory, model, pending tasks
//! - `/tasks`, `/todo <desc>`, `/done <n>` - Task list
//! - `/cd <path>` - Change working directory
//! - `/model <opus|sonnet|haiku>` - Switch model
//! - `/stop` - Shut down

pub mod attachments;
pub mod bot;
pub mod commands;
pub mod error;
pub mod liveness;
pub mod messenger;
pub mod postprocess;
pub mod transport;

pub use attachments::{AttachmentIngestor, CommandSpeechToText, Ingested, SpeechToText};
pub use bot::{LoopControl, SecretaryBot};
pub use commands::{interpret, Command, CommandOutcome, CommandReply};
pub use error::{Result, SecretaryError};
pub use liveness::TypingIndicator;
pub use messenger::{Messenger, PollBatch};
pub use postprocess::{process_response, ProcessedResponse};
pub use transport::{ChatTransport, EventPayload, InboundEvent, TelegramTransport};
