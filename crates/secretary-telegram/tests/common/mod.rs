//! In-memory chat endpoint and scripted assistants for driving the bot.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use secretary_assistant::{Assistant, DispatchContext, DispatchOutcome};
use secretary_core::SecretaryConfig;
use secretary_telegram::{ChatTransport, EventPayload, InboundEvent, Result, SecretaryError};
use tempfile::TempDir;

pub const CHAT: i64 = 4242;
pub const STRANGER: i64 = 666;

pub fn text(update_id: i32, chat_id: i64, text: &str) -> InboundEvent {
    InboundEvent {
        update_id,
        chat_id: Some(chat_id),
        payload: EventPayload::Text(text.to_string()),
    }
}

pub fn event(update_id: i32, payload: EventPayload) -> InboundEvent {
    InboundEvent {
        update_id,
        chat_id: Some(CHAT),
        payload,
    }
}

/// Scratch directories plus a config pointing into them.
pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("work")).unwrap();
        Self { dir }
    }

    pub fn work_dir(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    pub fn state_file(&self) -> PathBuf {
        self.dir.path().join("state").join("memory.json")
    }

    pub fn received_dir(&self) -> PathBuf {
        self.dir.path().join("received")
    }

    pub fn config(&self) -> SecretaryConfig {
        SecretaryConfig::new("123456:TEST-TOKEN", CHAT)
            .with_working_dir(self.work_dir())
            .with_state_file(self.state_file())
            .with_system_prompt_file(self.dir.path().join("config").join("system_prompt.txt"))
            .with_received_dir(self.received_dir())
            .with_poll_timeout(Duration::from_secs(30))
            .with_error_backoff(Duration::from_secs(5))
            .with_chunking(4000, Duration::from_millis(500))
    }
}

/// Chat endpoint that replays scripted poll results and records output.
#[derive(Default)]
pub struct MockTransport {
    batches: Mutex<VecDeque<Result<Vec<InboundEvent>>>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    failing_sends: Mutex<HashSet<usize>>,
    send_attempts: AtomicUsize,
    pub offsets: Mutex<Vec<i32>>,
    pub sent: Mutex<Vec<String>>,
    pub documents: Mutex<Vec<PathBuf>>,
    pub typing: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch(self, events: Vec<InboundEvent>) -> Self {
        self.batches.lock().unwrap().push_back(Ok(events));
        self
    }

    pub fn with_poll_error(self) -> Self {
        self.batches
            .lock()
            .unwrap()
            .push_back(Err(SecretaryError::Telegram("network down".to_string())));
        self
    }

    pub fn with_file(self, file_id: &str, bytes: &[u8]) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(file_id.to_string(), bytes.to_vec());
        self
    }

    /// Makes the `n`th send attempt (0-based) fail.
    pub fn failing_send(self, n: usize) -> Self {
        self.failing_sends.lock().unwrap().insert(n);
        self
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn offsets(&self) -> Vec<i32> {
        self.offsets.lock().unwrap().clone()
    }

    pub fn documents(&self) -> Vec<PathBuf> {
        self.documents.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn get_updates(&self, offset: i32, timeout: Duration) -> Result<Vec<InboundEvent>> {
        self.offsets.lock().unwrap().push(offset);
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(batch) => batch,
            None => {
                // Behave like an idle long-poll
                tokio::time::sleep(timeout).await;
                Ok(Vec::new())
            }
        }
    }

    async fn send_text(&self, _chat_id: i64, text: &str) -> Result<()> {
        let attempt = self.send_attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing_sends.lock().unwrap().contains(&attempt) {
            return Err(SecretaryError::Telegram("flood control".to_string()));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn send_document(&self, _chat_id: i64, path: &Path, _caption: Option<&str>) -> Result<()> {
        self.documents.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    async fn send_typing(&self, _chat_id: i64) -> Result<()> {
        self.typing.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn download(&self, file_id: &str, dest: &Path) -> Result<()> {
        let bytes = self.files.lock().unwrap().get(file_id).cloned();
        match bytes {
            Some(bytes) => {
                std::fs::write(dest, bytes)?;
                Ok(())
            }
            None => Err(SecretaryError::Download(format!("no such file {}", file_id))),
        }
    }
}

/// Assistant that replays canned outcomes, then echoes the prompt.
#[derive(Default)]
pub struct ScriptedAssistant {
    replies: Mutex<VecDeque<DispatchOutcome>>,
    pub contexts: Mutex<Vec<DispatchContext>>,
}

impl ScriptedAssistant {
    pub fn echo() -> Self {
        Self::default()
    }

    pub fn replying(replies: impl IntoIterator<Item = DispatchOutcome>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn contexts(&self) -> Vec<DispatchContext> {
        self.contexts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Assistant for ScriptedAssistant {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn dispatch(&self, ctx: &DispatchContext) -> DispatchOutcome {
        self.contexts.lock().unwrap().push(ctx.clone());
        let canned = self.replies.lock().unwrap().pop_front();
        canned.unwrap_or_else(|| DispatchOutcome::Output(format!("echo: {}", ctx.prompt_text)))
    }
}

/// Assistant that never answers.
pub struct HangingAssistant;

#[async_trait]
impl Assistant for HangingAssistant {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn dispatch(&self, _ctx: &DispatchContext) -> DispatchOutcome {
        std::future::pending::<()>().await;
        DispatchOutcome::Empty
    }
}
