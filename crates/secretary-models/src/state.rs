//! Persisted state types.
//!
//! The JSON keys match the `memory.json` file written by earlier releases
//! of the secretary so that an existing file keeps loading after an
//! upgrade. Every field is optional on load.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of history entries kept in the state file.
pub const MAX_HISTORY: usize = 20;

/// Number of characters of the user message kept in the in-flight marker.
pub const TASK_MARKER_CHARS: usize = 200;

/// Number of characters of the user message kept per history entry.
const HISTORY_USER_CHARS: usize = 200;

/// Number of characters of the assistant response kept per history entry.
const HISTORY_RESPONSE_CHARS: usize = 500;

/// Truncate a string to at most `max` characters (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Model the assistant is invoked with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelChoice {
    /// Deepest reasoning, slowest.
    Opus,
    /// Balanced default.
    #[default]
    Sonnet,
    /// Fastest.
    Haiku,
}

impl ModelChoice {
    /// All selectable models, in display order.
    pub const ALL: [ModelChoice; 3] = [ModelChoice::Opus, ModelChoice::Sonnet, ModelChoice::Haiku];

    /// Name passed to the assistant's `--model` flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelChoice::Opus => "opus",
            ModelChoice::Sonnet => "sonnet",
            ModelChoice::Haiku => "haiku",
        }
    }

    /// Human readable list of valid names, e.g. `opus / sonnet / haiku`.
    pub fn choices() -> String {
        Self::ALL
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "opus" => Ok(ModelChoice::Opus),
            "sonnet" => Ok(ModelChoice::Sonnet),
            "haiku" => Ok(ModelChoice::Haiku),
            other => Err(format!("unknown model: {}", other)),
        }
    }
}

/// Status of an entry in the task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Finished.
    Done,
    /// Anything that is not done, including unknown values from older files.
    #[default]
    #[serde(other)]
    Pending,
}

/// An entry in the task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItem {
    /// What needs doing.
    #[serde(rename = "desc", default)]
    pub description: String,

    /// Whether it has been done.
    #[serde(default)]
    pub status: TaskStatus,
}

impl TaskItem {
    /// Creates a pending task.
    pub fn pending(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            status: TaskStatus::Pending,
        }
    }

    /// Returns true if the task is done.
    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}

/// One completed request/response exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the exchange completed.
    #[serde(rename = "time")]
    pub timestamp: DateTime<Utc>,

    /// Truncated user message.
    #[serde(rename = "user", default)]
    pub user_summary: String,

    /// Truncated assistant response.
    #[serde(rename = "response", default)]
    pub response_summary: String,
}

impl HistoryEntry {
    /// Creates an entry stamped now, truncating both sides.
    pub fn new(user: &str, response: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            user_summary: truncate_chars(user, HISTORY_USER_CHARS),
            response_summary: truncate_chars(response, HISTORY_RESPONSE_CHARS),
        }
    }
}

/// Status of the in-flight task marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskMarkerStatus {
    /// A dispatch was started and has not finished.
    Processing,
    /// The last dispatch finished.
    Done,
    /// The process died mid-dispatch and the user has been told.
    InterruptedNotified,
}

/// Marker written before each dispatch so a crash mid-call is visible on restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentTask {
    /// Marker status.
    pub status: TaskMarkerStatus,

    /// Truncated user message that started the dispatch.
    #[serde(default)]
    pub user_message: String,

    /// When the marker was last changed.
    #[serde(rename = "time")]
    pub timestamp: DateTime<Utc>,
}

impl CurrentTask {
    /// Marker for a dispatch that is about to start.
    pub fn processing(user_message: &str) -> Self {
        Self {
            status: TaskMarkerStatus::Processing,
            user_message: truncate_chars(user_message, TASK_MARKER_CHARS),
            timestamp: Utc::now(),
        }
    }
}

/// The whole persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PersistedState {
    /// Directory the assistant runs in. Empty means "use the configured default".
    #[serde(rename = "cwd")]
    pub working_directory: PathBuf,

    /// Model passed to the assistant.
    #[serde(rename = "current_model")]
    pub selected_model: ModelChoice,

    /// Task list, in insertion order.
    pub tasks: Vec<TaskItem>,

    /// Free-form notes.
    pub notes: Vec<String>,

    /// Rolling history, oldest first, at most [`MAX_HISTORY`] entries.
    pub history: Vec<HistoryEntry>,

    /// In-flight task marker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_task: Option<CurrentTask>,
}

impl PersistedState {
    /// Creates a fresh state rooted at `working_directory`.
    pub fn new(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: working_directory.into(),
            ..Self::default()
        }
    }

    /// Number of tasks not yet done.
    pub fn pending_task_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_done()).count()
    }

    /// Appends a history entry, dropping the oldest beyond [`MAX_HISTORY`].
    pub fn push_history(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
        if self.history.len() > MAX_HISTORY {
            let excess = self.history.len() - MAX_HISTORY;
            self.history.drain(..excess);
        }
    }

    /// The last `n` history entries, oldest first.
    pub fn recent_history(&self, n: usize) -> &[HistoryEntry] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    /// Records that a dispatch for `user_message` is starting.
    pub fn begin_task(&mut self, user_message: &str) {
        self.current_task = Some(CurrentTask::processing(user_message));
    }

    /// Records that the current dispatch has returned.
    pub fn finish_task(&mut self) {
        match self.current_task.as_mut() {
            Some(task) => {
                task.status = TaskMarkerStatus::Done;
                task.timestamp = Utc::now();
            }
            None => {
                self.current_task = Some(CurrentTask {
                    status: TaskMarkerStatus::Done,
                    user_message: String::new(),
                    timestamp: Utc::now(),
                });
            }
        }
    }

    /// Returns the interrupted user message if the marker still says
    /// `processing`, flipping it to `interrupted_notified`.
    pub fn take_interrupted_task(&mut self) -> Option<String> {
        let task = self.current_task.as_mut()?;
        if task.status != TaskMarkerStatus::Processing {
            return None;
        }
        task.status = TaskMarkerStatus::InterruptedNotified;
        task.timestamp = Utc::now();
        Some(task.user_message.clone())
    }
}
