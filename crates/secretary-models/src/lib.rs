//! Core data models for the secretary bot.
//!
//! Everything the bot remembers between restarts lives in a single
//! [`PersistedState`] record: the working directory, the selected model,
//! the task list, a rolling conversation history and the in-flight task
//! marker used for crash recovery.

pub mod state;

pub use state::{
    truncate_chars, CurrentTask, HistoryEntry, ModelChoice, PersistedState, TaskItem,
    TaskMarkerStatus, TaskStatus, MAX_HISTORY, TASK_MARKER_CHARS,
};
