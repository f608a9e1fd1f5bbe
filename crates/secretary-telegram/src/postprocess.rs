//! Response Post-Processor: acts on control tags in assistant output.

use std::path::Path;

use secretary_core::{parse_response, resolve_path, ControlTag};
use secretary_models::PersistedState;
use tracing::{info, warn};

use crate::commands::{change_directory, change_model};
use crate::messenger::Messenger;

/// Assistant output after its tags were carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedResponse {
    /// Text to show the user.
    pub text: String,
    /// The next dispatch starts a fresh session.
    pub reset_session: bool,
    /// A tag mutated persisted state.
    pub state_changed: bool,
    /// Files actually delivered.
    pub files_sent: usize,
}

/// Strips tags from `raw`, sends requested files and applies the first
/// command tag.
///
/// Relative file paths resolve against the directory the assistant ran in,
/// before any `cd` tag takes effect.
pub async fn process_response(
    raw: &str,
    state: &mut PersistedState,
    messenger: &Messenger,
) -> ProcessedResponse {
    let parsed = parse_response(raw);
    let base = state.working_directory.clone();

    let mut files_sent = 0;
    for file in &parsed.files {
        let path = resolve_path(&base, &file.to_string_lossy());
        if messenger.send_file(&path, file_caption(&path).as_deref()).await {
            files_sent += 1;
        } else {
            warn!(path = %path.display(), "Skipped file requested by assistant");
        }
    }

    let mut reset_session = false;
    let mut state_changed = false;
    match parsed.command {
        Some(ControlTag::ChangeDirectory(dir)) => {
            let reply = change_directory(state, &dir);
            info!(result = %reply.text, "Applied cd tag");
            state_changed = reply.state_changed;
        }
        Some(ControlTag::ChangeModel(name)) => {
            let reply = change_model(state, &name);
            info!(result = %reply.text, "Applied model tag");
            state_changed = reply.state_changed;
        }
        Some(ControlTag::StartNewSession) => {
            info!("Assistant asked for a fresh session");
            reset_session = true;
        }
        Some(ControlTag::SendFile(_)) | None => {}
    }

    ProcessedResponse {
        text: parsed.visible,
        reset_session,
        state_changed,
        files_sent,
    }
}

fn file_caption(path: &Path) -> Option<String> {
    path.file_name().map(|name| format!("📎 {}", name.to_string_lossy()))
}
