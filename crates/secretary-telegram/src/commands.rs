//! Command Interpreter for slash commands.
//!
//! Commands are matched case-sensitively on the word after `/`. Commands
//! without arguments must stand alone: `/status please` is not a command
//! and goes to the assistant like any other text.

use secretary_core::resolve_path;
use secretary_models::{ModelChoice, PersistedState, TaskItem, TaskStatus};
use teloxide::utils::command::BotCommands;
use tracing::info;

/// Slash commands the secretary understands.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "start a fresh assistant session")]
    New,

    #[command(description = "show working directory, model and task count")]
    Status,

    #[command(description = "list tasks")]
    Tasks,

    #[command(description = "add a task: /todo <description>")]
    Todo(String),

    #[command(description = "mark a task done: /done <number>")]
    Done(String),

    #[command(description = "change working directory: /cd <path>")]
    Cd(String),

    #[command(description = "switch model: /model <opus|sonnet|haiku>")]
    Model(String),

    #[command(description = "shut the secretary down")]
    Stop,

    #[command(description = "show this help")]
    Help,

    #[command(description = "show this help")]
    Start,
}

impl Command {
    /// Parses `text` as a command, `None` if it is not one.
    ///
    /// The derive only supplies the `/help` listing. Its own `parse` would
    /// accept `/status please` as `/status`; here a command without
    /// arguments must stand alone, otherwise the text goes to the assistant.
    pub fn parse_text(text: &str) -> Option<Command> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let unit = |cmd: Command| arg.is_empty().then_some(cmd);
        match name {
            "new" => unit(Command::New),
            "status" => unit(Command::Status),
            "tasks" => unit(Command::Tasks),
            "stop" => unit(Command::Stop),
            "help" => unit(Command::Help),
            "start" => unit(Command::Start),
            "todo" => Some(Command::Todo(arg.to_string())),
            "done" => Some(Command::Done(arg.to_string())),
            "cd" => Some(Command::Cd(arg.to_string())),
            "model" => Some(Command::Model(arg.to_string())),
            _ => None,
        }
    }
}

/// A direct reply to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    /// Text sent back to the user.
    pub text: String,
    /// Persisted state was mutated and must be saved.
    pub state_changed: bool,
    /// The next dispatch starts a fresh assistant session.
    pub reset_session: bool,
}

impl CommandReply {
    fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            state_changed: false,
            reset_session: false,
        }
    }

    fn changed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            state_changed: true,
            reset_session: false,
        }
    }
}

/// Result of interpreting one inbound text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Route the text to the assistant.
    NotCommand,
    /// Reply directly.
    Handled(CommandReply),
    /// Shut down.
    Stop,
}

/// Interprets `text` against `state`.
///
/// `continuing` is whether the next dispatch resumes the previous session
/// (reported by `/status`).
pub fn interpret(text: &str, state: &mut PersistedState, continuing: bool) -> CommandOutcome {
    let Some(command) = Command::parse_text(text) else {
        return CommandOutcome::NotCommand;
    };

    let reply = match command {
        Command::Stop => return CommandOutcome::Stop,
        Command::New => CommandReply {
            text: "🆕 Fresh session started. What's next?".to_string(),
            state_changed: false,
            reset_session: true,
        },
        Command::Status => CommandReply::info(status_text(state, continuing)),
        Command::Tasks => CommandReply::info(tasks_text(state)),
        Command::Todo(desc) => add_task(state, &desc),
        Command::Done(number) => complete_task(state, &number),
        Command::Cd(path) => change_directory(state, &path),
        Command::Model(name) => change_model(state, &name),
        Command::Help | Command::Start => CommandReply::info(Command::descriptions().to_string()),
    };
    CommandOutcome::Handled(reply)
}

fn status_text(state: &PersistedState, continuing: bool) -> String {
    format!(
        "📊 Status\n\
         Working directory: {}\n\
         Model: {}\n\
         Pending tasks: {}\n\
         History entries: {}\n\
         Next message: {}",
        state.working_directory.display(),
        state.selected_model,
        state.pending_task_count(),
        state.history.len(),
        if continuing { "continues the session" } else { "starts a fresh session" }
    )
}

fn tasks_text(state: &PersistedState) -> String {
    if state.tasks.is_empty() {
        return "📋 No tasks. Nice and quiet.".to_string();
    }
    let mut lines = vec!["📋 Tasks:".to_string()];
    for (i, task) in state.tasks.iter().enumerate() {
        let marker = if task.is_done() { "✅" } else { "⏳" };
        lines.push(format!("{} {}. {}", marker, i + 1, task.description));
    }
    lines.join("\n")
}

fn add_task(state: &mut PersistedState, desc: &str) -> CommandReply {
    if desc.is_empty() {
        return CommandReply::info("Usage: /todo <description>");
    }
    state.tasks.push(TaskItem::pending(desc));
    CommandReply::changed(format!("📝 Added task {}: {}", state.tasks.len(), desc))
}

fn complete_task(state: &mut PersistedState, number: &str) -> CommandReply {
    let task = number
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| state.tasks.get_mut(i));

    match task {
        Some(task) => {
            task.status = TaskStatus::Done;
            CommandReply::changed(format!("✅ Done: {}", task.description))
        }
        None => CommandReply::info(format!(
            "❌ No task number '{}'. Use /tasks to see the list.",
            number
        )),
    }
}

/// `/cd` logic, shared with the `[CMD:cd ...]` tag.
pub fn change_directory(state: &mut PersistedState, input: &str) -> CommandReply {
    let input = input.trim();
    if input.is_empty() {
        return CommandReply::info("Usage: /cd <path>");
    }

    let target = resolve_path(&state.working_directory, input);
    if !target.is_dir() {
        return CommandReply::info(format!("❌ Not a directory: {}", target.display()));
    }

    info!(from = %state.working_directory.display(), to = %target.display(), "Changed working directory");
    state.working_directory = target;
    CommandReply::changed(format!(
        "📁 Working directory is now {}",
        state.working_directory.display()
    ))
}

/// `/model` logic, shared with the `[CMD:model ...]` tag.
pub fn change_model(state: &mut PersistedState, input: &str) -> CommandReply {
    if input.trim().is_empty() {
        return CommandReply::info(format!("Usage: /model <{}>", ModelChoice::choices()));
    }

    match input.parse::<ModelChoice>() {
        Ok(model) => {
            info!(model = %model, "Changed model");
            state.selected_model = model;
            CommandReply::changed(format!("🧠 Switched model to {}", model))
        }
        Err(_) => CommandReply::info(format!("❌ Available models: {}", ModelChoice::choices())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn handled(outcome: CommandOutcome) -> CommandReply {
        match outcome {
            CommandOutcome::Handled(reply) => reply,
            other => panic!("expected a reply, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_text() {
        assert_eq!(Command::parse_text("/new"), Some(Command::New));
        assert_eq!(Command::parse_text(" /cd  src "), Some(Command::Cd("src".to_string())));
        assert_eq!(Command::parse_text("/cd"), Some(Command::Cd(String::new())));
        assert_eq!(Command::parse_text("/status please"), None);
        assert_eq!(Command::parse_text("/Status"), None);
        assert_eq!(Command::parse_text("/cdx"), None);
        assert_eq!(Command::parse_text("status"), None);
    }

    #[test]
    fn test_plain_text_is_not_a_command() {
        let mut state = PersistedState::new("/");
        assert_eq!(interpret("fix the build", &mut state, false), CommandOutcome::NotCommand);
        assert_eq!(interpret("/unknown", &mut state, false), CommandOutcome::NotCommand);
    }

    #[test]
    fn test_stop() {
        let mut state = PersistedState::new("/");
        assert_eq!(interpret("/stop", &mut state, true), CommandOutcome::Stop);
    }

    #[test]
    fn test_new_resets_session_without_mutation() {
        let mut state = PersistedState::new("/");
        let before = state.clone();

        let reply = handled(interpret("/new", &mut state, true));

        assert!(reply.reset_session);
        assert!(!reply.state_changed);
        assert_eq!(state, before);
    }

    #[test]
    fn test_model_switch() {
        let mut state = PersistedState::new("/");

        let reply = handled(interpret("/model xyz", &mut state, false));
        assert!(!reply.state_changed);
        assert!(reply.text.contains("opus / sonnet / haiku"));
        assert_eq!(state.selected_model, ModelChoice::Sonnet);

        let reply = handled(interpret("/model opus", &mut state, false));
        assert!(reply.state_changed);
        assert_eq!(reply.text, "🧠 Switched model to opus");
        assert_eq!(state.selected_model, ModelChoice::Opus);

        handled(interpret("/model HAIKU", &mut state, false));
        assert_eq!(state.selected_model, ModelChoice::Haiku);
    }

    #[test]
    fn test_cd_parent() {
        let root = tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        let mut state = PersistedState::new(&nested);

        let reply = handled(interpret("/cd ..", &mut state, false));

        assert!(reply.state_changed);
        assert_eq!(state.working_directory, root.path().join("a"));
    }

    #[test]
    fn test_cd_missing_directory() {
        let mut state = PersistedState::new("/");

        let reply = handled(interpret("/cd /does/not/exist", &mut state, false));

        assert!(!reply.state_changed);
        assert_eq!(reply.text, "❌ Not a directory: /does/not/exist");
        assert_eq!(state.working_directory, PathBuf::from("/"));
    }

    #[test]
    fn test_cd_to_file_is_rejected() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let mut state = PersistedState::new(dir.path());

        let reply = handled(interpret("/cd notes.txt", &mut state, false));

        assert!(!reply.state_changed);
        assert_eq!(state.working_directory, dir.path());
    }

    #[test]
    fn test_bare_cd_and_model_show_usage() {
        let mut state = PersistedState::new("/");
        assert_eq!(handled(interpret("/cd", &mut state, false)).text, "Usage: /cd <path>");
        assert_eq!(
            handled(interpret("/model", &mut state, false)).text,
            "Usage: /model <opus / sonnet / haiku>"
        );
    }

    #[test]
    fn test_status_and_tasks() {
        let mut state = PersistedState::new("/srv");
        state.tasks.push(TaskItem::pending("write docs"));
        handled(interpret("/todo ship it", &mut state, false));
        handled(interpret("/done 1", &mut state, false));

        let status = handled(interpret("/status", &mut state, true)).text;
        assert!(status.contains("Working directory: /srv"));
        assert!(status.contains("Model: sonnet"));
        assert!(status.contains("Pending tasks: 1"));
        assert!(status.contains("continues the session"));

        let tasks = handled(interpret("/tasks", &mut state, false)).text;
        assert_eq!(tasks, "📋 Tasks:\n✅ 1. write docs\n⏳ 2. ship it");
    }

    #[test]
    fn test_done_rejects_bad_numbers() {
        let mut state = PersistedState::new("/");
        state.tasks.push(TaskItem::pending("one"));

        for arg in ["0", "2", "abc", ""] {
            let reply = handled(interpret(&format!("/done {}", arg), &mut state, false));
            assert!(!reply.state_changed, "accepted {:?}", arg);
        }
        assert_eq!(state.pending_task_count(), 1);
    }

    #[test]
    fn test_help_lists_commands() {
        let mut state = PersistedState::new("/");
        let help = handled(interpret("/help", &mut state, false)).text;
        for cmd in ["/new", "/status", "/tasks", "/cd", "/model", "/stop"] {
            assert!(help.contains(cmd), "help is missing {}", cmd);
        }
    }

    #[test]
    fn test_help_lists_exactly_the_parsed_commands() {
        let help = Command::descriptions().to_string();
        let names: Vec<&str> = help
            .lines()
            .filter(|line| line.starts_with('/'))
            .filter_map(|line| line.split_whitespace().next())
            .collect();

        assert_eq!(names.len(), 10);
        for name in names {
            assert!(Command::parse_text(name).is_some(), "{} is listed but not parsed", name);
        }
        assert_eq!(Command::parse_text("/status please"), None);
    }
}
