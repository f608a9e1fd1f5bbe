//! Per-dispatch context and prompt assembly.

use std::path::{Path, PathBuf};

use secretary_models::{truncate_chars, HistoryEntry, ModelChoice, PersistedState};
use tracing::warn;

/// System prompt used when no override file exists.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an AI secretary the user talks to from their phone.
Reply naturally and concisely, like a capable human assistant. Replies are
shown as plain text in a chat, so keep formatting light.

You are running inside the user's working directory and may read, edit and
run code there to complete tasks.

You can request side effects by writing these tags anywhere in your reply.
They are removed before the user sees the text:

[CMD:cd <path>]     switch the working directory for later tasks
[CMD:model <name>]  switch model (opus, sonnet or haiku)
[CMD:new]           start a fresh session with the next message
[FILE:<path>]       send a local file to the user

Use at most one CMD tag per reply. Use FILE tags for any file the user
asked to see or that you produced for them."#;

/// Reads the system prompt from `path`, falling back to
/// [`DEFAULT_SYSTEM_PROMPT`] when the file is missing or blank.
pub fn load_system_prompt(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => DEFAULT_SYSTEM_PROMPT.to_string(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => DEFAULT_SYSTEM_PROMPT.to_string(),
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Cannot read system prompt, using default");
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
    }
}

/// Everything one assistant call needs. Built fresh per dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchContext {
    /// The user's message (possibly with attachment annotations).
    pub prompt_text: String,
    /// Resume the previous assistant session.
    pub continue_session: bool,
    /// Directory the assistant runs in.
    pub working_directory: PathBuf,
    /// Model to run.
    pub model: ModelChoice,
    /// Appended system prompt.
    pub system_prompt: String,
    /// Rendered recent history, empty when none fits.
    pub history_snippet: String,
}

impl DispatchContext {
    /// Creates a context for `prompt_text` from the persisted state.
    ///
    /// Starts a fresh session with the default system prompt and no history.
    pub fn new(prompt_text: impl Into<String>, state: &PersistedState) -> Self {
        Self {
            prompt_text: prompt_text.into(),
            continue_session: false,
            working_directory: state.working_directory.clone(),
            model: state.selected_model,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            history_snippet: String::new(),
        }
    }

    /// Sets whether the previous session is resumed.
    pub fn continuing(mut self, continue_session: bool) -> Self {
        self.continue_session = continue_session;
        self
    }

    /// Replaces the system prompt.
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Prepends as many of `entries` as fit in `max_prompt_chars`.
    ///
    /// The message itself is cut only when it alone exceeds the bound;
    /// otherwise the oldest entries are dropped first.
    pub fn with_history(mut self, entries: &[HistoryEntry], max_prompt_chars: usize) -> Self {
        self.prompt_text = truncate_chars(&self.prompt_text, max_prompt_chars);
        self.history_snippet.clear();

        for start in 0..entries.len() {
            let snippet = render_history(&entries[start..]);
            if compose(&snippet, &self.prompt_text).chars().count() <= max_prompt_chars {
                self.history_snippet = snippet;
                break;
            }
        }
        self
    }

    /// The prompt passed to the assistant.
    pub fn effective_prompt(&self) -> String {
        compose(&self.history_snippet, &self.prompt_text)
    }
}

fn render_history(entries: &[HistoryEntry]) -> String {
    let mut out = String::from("Recent conversation (oldest first):\n");
    for entry in entries {
        out.push_str(&format!(
            "[{}] User: {}\nAssistant: {}\n",
            entry.timestamp.format("%m-%d %H:%M"),
            entry.user_summary,
            entry.response_summary
        ));
    }
    out
}

fn compose(history_snippet: &str, prompt_text: &str) -> String {
    if history_snippet.is_empty() {
        prompt_text.to_string()
    } else {
        format!("{}\nCurrent message:\n{}", history_snippet, prompt_text)
    }
}
