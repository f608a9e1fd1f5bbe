//! Main loop: poll, interpret, dispatch, reply.

use std::future::Future;
use std::sync::Arc;

use secretary_assistant::{load_system_prompt, Assistant, DispatchContext};
use secretary_core::SecretaryConfig;
use secretary_models::{truncate_chars, HistoryEntry, PersistedState};
use secretary_persistence::StateStore;
use tracing::{error, info, warn};

use crate::attachments::{AttachmentIngestor, Ingested, SpeechToText};
use crate::commands::{interpret, CommandOutcome};
use crate::error::Result;
use crate::liveness::TypingIndicator;
use crate::messenger::Messenger;
use crate::postprocess::process_response;
use crate::transport::{ChatTransport, InboundEvent};

const ONLINE_GREETING: &str = "🟢 Secretary online. Send me anything, any time.";
const ACKNOWLEDGEMENT: &str = "Got it, working on it… 🤔";
const FAREWELL: &str = "🔴 Secretary going offline. Bye!";
const DONE_WITHOUT_TEXT: &str = "✅ Done.";

/// Whether the loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stop,
}

/// The secretary: owns the state and drives every component.
pub struct SecretaryBot {
    config: SecretaryConfig,
    messenger: Messenger,
    assistant: Arc<dyn Assistant>,
    ingestor: AttachmentIngestor,
    store: StateStore,
    state: PersistedState,
    cursor: i32,
    continue_session: bool,
}

impl SecretaryBot {
    /// Creates the bot, loading persisted state from `config.state_file`.
    pub fn new(
        config: SecretaryConfig,
        transport: Arc<dyn ChatTransport>,
        assistant: Arc<dyn Assistant>,
    ) -> Self {
        let store = StateStore::new(&config.state_file);
        let state = store.load(&config.default_working_dir);
        let messenger = Messenger::new(transport, &config);
        let ingestor = AttachmentIngestor::new(&config.received_dir);

        info!(
            cwd = %state.working_directory.display(),
            model = %state.selected_model,
            tasks = state.tasks.len(),
            history = state.history.len(),
            "State loaded"
        );

        Self {
            config,
            messenger,
            assistant,
            ingestor,
            store,
            state,
            cursor: 0,
            continue_session: false,
        }
    }

    /// Enables voice notes.
    pub fn with_speech(mut self, speech: Arc<dyn SpeechToText>) -> Self {
        self.ingestor = AttachmentIngestor::new(&self.config.received_dir).with_speech(speech);
        self
    }

    /// Current persisted state.
    pub fn state(&self) -> &PersistedState {
        &self.state
    }

    /// Next poll offset.
    pub fn cursor(&self) -> i32 {
        self.cursor
    }

    /// Whether the next dispatch resumes the previous session.
    pub fn continue_session(&self) -> bool {
        self.continue_session
    }

    /// Saves state, logging a failure. The snapshot is best-effort and
    /// never holds up a reply.
    fn persist(&self) {
        if let Err(e) = self.store.save(&self.state) {
            warn!(error = %e, path = %self.store.path().display(), "Failed to save state");
        }
    }

    /// Reports an interrupted task left over from a previous run, or
    /// greets the user.
    pub async fn announce_startup(&mut self) {
        match self.state.take_interrupted_task() {
            Some(message) => {
                warn!(message = %message, "Previous run died while a task was in flight");
                self.persist();
                self.messenger
                    .send_text(&format!(
                        "⚠️ I restarted while working on:\n\"{}\"\n\nIt may not have finished. Send it again if you want me to pick it up.",
                        message
                    ))
                    .await;
            }
            None => {
                self.messenger.send_text(ONLINE_GREETING).await;
            }
        }
    }

    /// One long-poll plus handling of everything it returned.
    pub async fn poll_once(&mut self) -> LoopControl {
        let batch = self.messenger.receive_events(self.cursor).await;
        if batch.failed {
            tokio::time::sleep(self.config.error_backoff).await;
            return LoopControl::Continue;
        }

        for event in batch.events {
            self.cursor = self.cursor.max(event.update_id.saturating_add(1));
            if self.handle_event(event).await == LoopControl::Stop {
                return LoopControl::Stop;
            }
        }
        self.cursor = self.cursor.max(batch.next_cursor);
        LoopControl::Continue
    }

    /// Handles one event from the endpoint.
    pub async fn handle_event(&mut self, event: InboundEvent) -> LoopControl {
        if event.chat_id != Some(self.config.chat_id) {
            if let Some(chat_id) = event.chat_id {
                info!(chat_id, update_id = event.update_id, "Ignored message from unknown chat");
            }
            return LoopControl::Continue;
        }

        match self.ingestor.ingest(&self.messenger, &event.payload).await {
            Ingested::Skip => LoopControl::Continue,
            Ingested::Reply(text) => {
                self.messenger.send_text(&text).await;
                LoopControl::Continue
            }
            Ingested::Task { text, echo } => {
                if let Some(echo) = echo {
                    self.messenger.send_text(&echo).await;
                }
                self.handle_text(&text).await
            }
        }
    }

    /// Routes text through the command interpreter, then the assistant.
    pub async fn handle_text(&mut self, text: &str) -> LoopControl {
        info!(preview = %truncate_chars(text, 80), "Received message");

        match interpret(text, &mut self.state, self.continue_session) {
            CommandOutcome::Stop => {
                info!("Stopped by /stop command");
                if let Err(e) = self.shutdown().await {
                    error!(error = %e, "Failed to save state on shutdown");
                }
                LoopControl::Stop
            }
            CommandOutcome::Handled(reply) => {
                if reply.reset_session {
                    self.continue_session = false;
                }
                self.messenger.send_text(&reply.text).await;
                if reply.state_changed {
                    self.persist();
                }
                LoopControl::Continue
            }
            CommandOutcome::NotCommand => {
                self.dispatch(text).await;
                LoopControl::Continue
            }
        }
    }

    async fn dispatch(&mut self, text: &str) {
        self.messenger.send_text(ACKNOWLEDGEMENT).await;

        self.state.begin_task(text);
        self.persist();

        let ctx = DispatchContext::new(text, &self.state)
            .continuing(self.continue_session)
            .with_system_prompt(load_system_prompt(&self.config.system_prompt_file))
            .with_history(
                self.state.recent_history(self.config.history_window),
                self.config.max_prompt_chars,
            );

        let typing = TypingIndicator::start(
            self.messenger.transport(),
            self.config.chat_id,
            self.config.typing_interval,
        );
        let outcome = self.assistant.dispatch(&ctx).await;
        typing.stop();

        info!(
            assistant = self.assistant.name(),
            output = outcome.is_output(),
            "Dispatch finished"
        );
        let raw = outcome.into_reply();

        let processed = process_response(&raw, &mut self.state, &self.messenger).await;
        self.continue_session = !processed.reset_session;

        self.state.finish_task();
        let summary = if processed.text.is_empty() { raw.as_str() } else { processed.text.as_str() };
        self.state.push_history(HistoryEntry::new(text, summary));
        self.persist();

        if !processed.text.is_empty() {
            let chunks = self.messenger.send_text(&processed.text).await;
            info!(chars = processed.text.chars().count(), chunks, "Responded");
        } else if processed.files_sent == 0 {
            self.messenger.send_text(DONE_WITHOUT_TEXT).await;
        }
    }

    /// Says goodbye, confirms consumed updates and saves state.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.messenger.send_text(FAREWELL).await;
        self.messenger.acknowledge(self.cursor).await;
        self.store.save(&self.state)?;
        info!("Secretary stopped");
        Ok(())
    }

    /// Runs until `/stop` or until `interrupt` resolves.
    pub async fn run_until<F>(&mut self, interrupt: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(interrupt);

        self.announce_startup().await;

        loop {
            let step = tokio::select! {
                _ = &mut interrupt => None,
                control = self.poll_once() => Some(control),
            };

            match step {
                Some(LoopControl::Continue) => {}
                Some(LoopControl::Stop) => return Ok(()),
                None => {
                    info!("Interrupted, shutting down");
                    return self.shutdown().await;
                }
            }
        }
    }

    /// Runs until `/stop` or Ctrl-C.
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }
}
