//! Attachment Ingestion: turns voice notes, photos and documents into task
//! text.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use secretary_core::VoiceConfig;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{Result, SecretaryError};
use crate::messenger::Messenger;
use crate::transport::EventPayload;

const VOICE_UNSUPPORTED: &str =
    "Voice messages aren't set up on this secretary. Please type your message instead.";
const VOICE_DOWNLOAD_FAILED: &str = "I couldn't download that voice message. Please send it again.";
const VOICE_NOT_RECOGNIZED: &str =
    "I couldn't make out any words in that voice message. Could you say it again, or type it?";
const ATTACHMENT_FAILED: &str = "I couldn't download that file. Please send it again.";

/// Speech-to-text for a downloaded voice note.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribes `audio`. `scratch` is a directory for intermediate files
    /// that the caller removes afterwards.
    async fn transcribe(&self, audio: &Path, scratch: &Path) -> Result<String>;
}

/// Transcodes with ffmpeg, then runs a command-line recognizer once per
/// configured locale until one produces text.
#[derive(Debug, Clone)]
pub struct CommandSpeechToText {
    voice: VoiceConfig,
}

impl CommandSpeechToText {
    /// Creates a recognizer from voice settings.
    pub fn new(voice: VoiceConfig) -> Self {
        Self { voice }
    }

    async fn transcode(&self, audio: &Path, wav: &Path) -> Result<()> {
        let output = Command::new(&self.voice.ffmpeg_program)
            .arg("-y")
            .arg("-i")
            .arg(audio)
            .args(["-ar", "16000", "-ac", "1", "-c:a", "pcm_s16le"])
            .arg(wav)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SecretaryError::Transcode(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SecretaryError::Transcode(
                stderr.lines().last().unwrap_or("ffmpeg failed").to_string(),
            ));
        }
        Ok(())
    }

    async fn recognize(&self, wav: &Path, locale: &str) -> Result<String> {
        let input = wav.to_string_lossy();
        let output = Command::new(&self.voice.recognizer_program)
            .args(self.voice.recognizer_args_for(&input, locale))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SecretaryError::Recognition(e.to_string()))?;

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() || text.is_empty() {
            return Err(SecretaryError::Recognition(format!("no text for locale {}", locale)));
        }
        Ok(text)
    }
}

#[async_trait]
impl SpeechToText for CommandSpeechToText {
    async fn transcribe(&self, audio: &Path, scratch: &Path) -> Result<String> {
        let wav = scratch.join("voice.wav");
        self.transcode(audio, &wav).await?;

        for locale in &self.voice.locales {
            match self.recognize(&wav, locale).await {
                Ok(text) => {
                    debug!(locale = %locale, "Recognized voice note");
                    return Ok(text);
                }
                Err(e) => debug!(error = %e, locale = %locale, "Recognition attempt failed"),
            }
        }
        Err(SecretaryError::Recognition("no locale produced text".to_string()))
    }
}

/// What an inbound payload amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingested {
    /// Text to route through commands and dispatch. `echo` is shown to
    /// the user first (the recognised text of a voice note).
    Task { text: String, echo: Option<String> },
    /// Nothing to dispatch; tell the user this.
    Reply(String),
    /// Nothing to do.
    Skip,
}

/// Converts payloads into task text.
pub struct AttachmentIngestor {
    received_dir: PathBuf,
    speech: Option<Arc<dyn SpeechToText>>,
}

impl AttachmentIngestor {
    /// Creates an ingestor saving files under `received_dir`.
    pub fn new(received_dir: impl Into<PathBuf>) -> Self {
        Self {
            received_dir: received_dir.into(),
            speech: None,
        }
    }

    /// Enables voice notes.
    pub fn with_speech(mut self, speech: Arc<dyn SpeechToText>) -> Self {
        self.speech = Some(speech);
        self
    }

    /// Whether voice notes can be transcribed.
    pub fn supports_voice(&self) -> bool {
        self.speech.is_some()
    }

    /// Turns `payload` into task text, downloading what it references.
    pub async fn ingest(&self, messenger: &Messenger, payload: &EventPayload) -> Ingested {
        match payload {
            EventPayload::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    Ingested::Skip
                } else {
                    Ingested::Task {
                        text: text.to_string(),
                        echo: None,
                    }
                }
            }
            EventPayload::Voice { file_id } => self.ingest_voice(messenger, file_id).await,
            EventPayload::Photo { file_id, caption } => {
                let name = format!("photo_{}.jpg", timestamp());
                let saved = self.save(messenger, file_id, &name).await;
                with_annotation(caption.as_deref(), saved.map(|p| photo_note(&p)))
            }
            EventPayload::Document {
                file_id,
                file_name,
                caption,
            } => {
                let name = format!(
                    "{}_{}",
                    timestamp(),
                    sanitize_file_name(file_name.as_deref().unwrap_or("document"))
                );
                let saved = self.save(messenger, file_id, &name).await;
                with_annotation(caption.as_deref(), saved.map(|p| document_note(&p)))
            }
            EventPayload::Unsupported => Ingested::Skip,
        }
    }

    async fn ingest_voice(&self, messenger: &Messenger, file_id: &str) -> Ingested {
        let Some(speech) = &self.speech else {
            return Ingested::Reply(VOICE_UNSUPPORTED.to_string());
        };

        // Removed on drop, whatever happens below
        let scratch = match tempfile::Builder::new().prefix("secretary-voice").tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                warn!(error = %e, "Cannot create scratch directory for voice note");
                return Ingested::Reply(VOICE_NOT_RECOGNIZED.to_string());
            }
        };

        let audio = scratch.path().join("voice.oga");
        if messenger.fetch_attachment(file_id, &audio).await.is_none() {
            return Ingested::Reply(VOICE_DOWNLOAD_FAILED.to_string());
        }

        match speech.transcribe(&audio, scratch.path()).await {
            Ok(text) if !text.trim().is_empty() => {
                let text = text.trim().to_string();
                info!(chars = text.chars().count(), "Transcribed voice note");
                Ingested::Task {
                    echo: Some(format!("🎤 {}", text)),
                    text,
                }
            }
            Ok(_) => Ingested::Reply(VOICE_NOT_RECOGNIZED.to_string()),
            Err(e) => {
                warn!(error = %e, "Voice note not recognized");
                Ingested::Reply(VOICE_NOT_RECOGNIZED.to_string())
            }
        }
    }

    async fn save(&self, messenger: &Messenger, file_id: &str, name: &str) -> Option<PathBuf> {
        let dest = self.received_dir.join(name);
        let saved = messenger.fetch_attachment(file_id, &dest).await?;
        info!(path = %saved.display(), "Saved attachment");
        Some(saved)
    }
}

fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S_%3f").to_string()
}

fn photo_note(path: &Path) -> String {
    format!("[The user sent a photo, saved at: {}]", path.display())
}

fn document_note(path: &Path) -> String {
    format!("[The user sent a file, saved at: {}]", path.display())
}

fn with_annotation(caption: Option<&str>, note: Option<String>) -> Ingested {
    let caption = caption.map(str::trim).filter(|c| !c.is_empty());
    let text = match (caption, note) {
        (Some(caption), Some(note)) => format!("{}\n\n{}", caption, note),
        (None, Some(note)) => note,
        (Some(caption), None) => caption.to_string(),
        (None, None) => return Ingested::Reply(ATTACHMENT_FAILED.to_string()),
    };
    Ingested::Task { text, echo: None }
}

/// Keeps `[A-Za-z0-9._-]`, replacing everything else with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned.to_string()
    }
}
