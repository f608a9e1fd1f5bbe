//! The State Store: one JSON snapshot of [`PersistedState`].

use std::path::{Path, PathBuf};

use secretary_models::PersistedState;
use tracing::{debug, info, warn};

use crate::atomic::{atomic_write_json, read_json_optional};
use crate::error::Result;

/// Loads and saves the persisted state file.
///
/// Single writer: only the main loop calls [`StateStore::save`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Creates a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the state, falling back to defaults when the file is missing
    /// or unreadable. An empty working directory is replaced by
    /// `default_cwd`.
    pub fn load(&self, default_cwd: impl AsRef<Path>) -> PersistedState {
        let mut state = match read_json_optional::<PersistedState>(&self.path) {
            Ok(Some(state)) => {
                info!(path = %self.path.display(), "Loaded state");
                state
            }
            Ok(None) => {
                info!(path = %self.path.display(), "No state file, starting fresh");
                PersistedState::default()
            }
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "State file unreadable, starting fresh");
                PersistedState::default()
            }
        };

        if state.working_directory.as_os_str().is_empty() {
            state.working_directory = default_cwd.as_ref().to_path_buf();
        }
        state
    }

    /// Writes the state atomically.
    pub fn save(&self, state: &PersistedState) -> Result<()> {
        atomic_write_json(&self.path, state)?;
        debug!(path = %self.path.display(), "Saved state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secretary_models::{HistoryEntry, ModelChoice, TaskMarkerStatus};
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("memory.json"));

        let state = store.load("/default/cwd");

        assert_eq!(state.working_directory, PathBuf::from("/default/cwd"));
        assert_eq!(state.selected_model, ModelChoice::Sonnet);
        assert!(state.tasks.is_empty());
        assert!(state.current_task.is_none());
    }

    #[test]
    fn test_corrupt_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(&path, "\u{0}\u{1}garbage{{{").unwrap();

        let state = StateStore::new(&path).load("/fallback");

        assert_eq!(state.working_directory, PathBuf::from("/fallback"));
    }

    #[test]
    fn test_save_then_load_keeps_everything() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state/memory.json"));

        let mut state = PersistedState::new("/work");
        state.selected_model = ModelChoice::Haiku;
        state.push_history(HistoryEntry::new("build it", "built"));
        state.begin_task("deploy");
        store.save(&state).unwrap();

        let loaded = store.load("/ignored");
        assert_eq!(loaded, state);
        assert_eq!(
            loaded.current_task.map(|t| t.status),
            Some(TaskMarkerStatus::Processing)
        );
    }

    #[test]
    fn test_empty_cwd_in_file_uses_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(&path, r#"{"cwd": "", "current_model": "opus"}"#).unwrap();

        let state = StateStore::new(&path).load("/home/me");

        assert_eq!(state.working_directory, PathBuf::from("/home/me"));
        assert_eq!(state.selected_model, ModelChoice::Opus);
    }
}
