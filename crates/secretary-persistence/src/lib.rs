//! Persistence layer for the secretary bot.
//!
//! State is snapshotted as a single JSON file using atomic file operations
//! (write to temp file, then rename). Loading never fails: a missing or
//! corrupt file yields a fresh default record.
//!
//! # Example
//!
//! ```no_run
//! use secretary_persistence::StateStore;
//!
//! let store = StateStore::new("/home/user/.ai-secretary/state/memory.json");
//!
//! let mut state = store.load("/home/user/code");
//! state.notes.push("remember the milk".to_string());
//! store.save(&state).unwrap();
//! ```

pub mod atomic;
pub mod error;
pub mod state_store;

pub use error::{PersistenceError, Result};
pub use state_store::StateStore;
