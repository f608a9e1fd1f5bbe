//! Claude Code CLI runner.
//!
//! Each dispatch is one `claude -p` invocation in print mode: the prompt
//! goes in as an argument, the reply comes back on stdout once the process
//! exits. The process is killed if it outlives the timeout.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::context::DispatchContext;
use crate::outcome::DispatchOutcome;
use crate::traits::Assistant;

/// Default wall-clock limit per dispatch.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Default `--max-turns`.
pub const DEFAULT_MAX_TURNS: u32 = 15;

/// Runs the Claude Code CLI as a subprocess.
#[derive(Debug, Clone)]
pub struct ClaudeCode {
    program: String,
    leading_args: Vec<String>,
    max_turns: u32,
    timeout: Duration,
}

impl ClaudeCode {
    /// Creates a runner for `program` (usually `claude`).
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            max_turns: DEFAULT_MAX_TURNS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Arguments placed before the generated ones.
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets `--max-turns`.
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Sets the wall-clock limit.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The program name or path.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The wall-clock limit.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the program resolves on `PATH` (or is an existing path).
    pub fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    /// Full argument list for one dispatch.
    pub fn args_for(&self, ctx: &DispatchContext) -> Vec<String> {
        let mut args = self.leading_args.clone();
        if ctx.continue_session {
            args.push("-c".to_string());
        }
        args.extend([
            "-p".to_string(),
            ctx.effective_prompt(),
            "--output-format".to_string(),
            "text".to_string(),
            "--model".to_string(),
            ctx.model.as_str().to_string(),
            "--max-turns".to_string(),
            self.max_turns.to_string(),
            "--dangerously-skip-permissions".to_string(),
            "--append-system-prompt".to_string(),
            ctx.system_prompt.clone(),
        ]);
        args
    }
}

impl Default for ClaudeCode {
    fn default() -> Self {
        Self::new("claude")
    }
}

#[async_trait]
impl Assistant for ClaudeCode {
    fn name(&self) -> &str {
        "claude-code"
    }

    async fn dispatch(&self, ctx: &DispatchContext) -> DispatchOutcome {
        if !ctx.working_directory.is_dir() {
            return DispatchOutcome::failed(format!(
                "working directory {} does not exist",
                ctx.working_directory.display()
            ));
        }

        info!(
            model = %ctx.model,
            cwd = %ctx.working_directory.display(),
            continue_session = ctx.continue_session,
            "Running assistant"
        );

        let mut command = Command::new(&self.program);
        command
            .args(self.args_for(ctx))
            .current_dir(&ctx.working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Assistant timed out, killed");
                return DispatchOutcome::TimedOut(self.timeout);
            }
            Ok(Err(e)) if e.kind() == io::ErrorKind::NotFound => {
                warn!(program = %self.program, "Assistant program not found");
                return DispatchOutcome::NotFound;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to run assistant");
                return DispatchOutcome::failed(e.to_string());
            }
            Ok(Ok(output)) => output,
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(
            status = %output.status,
            stdout_len = stdout.len(),
            stderr_len = stderr.len(),
            "Assistant exited"
        );

        DispatchOutcome::from_streams(&stdout, &stderr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secretary_models::{ModelChoice, PersistedState};
    use tempfile::tempdir;

    /// Runs `script` under `sh -c`; the generated arguments become `$1..`.
    fn scripted(script: &str) -> ClaudeCode {
        ClaudeCode::new("sh").with_leading_args(["-c", script, "assistant"])
    }

    fn context(dir: &std::path::Path) -> DispatchContext {
        DispatchContext::new("do the thing", &PersistedState::new(dir))
    }

    #[test]
    fn test_argument_order() {
        let mut state = PersistedState::new("/tmp");
        state.selected_model = ModelChoice::Haiku;
        let ctx = DispatchContext::new("hello", &state)
            .continuing(true)
            .with_system_prompt("be nice");

        let args = ClaudeCode::new("claude").with_max_turns(7).args_for(&ctx);

        assert_eq!(
            args,
            vec![
                "-c",
                "-p",
                "hello",
                "--output-format",
                "text",
                "--model",
                "haiku",
                "--max-turns",
                "7",
                "--dangerously-skip-permissions",
                "--append-system-prompt",
                "be nice",
            ]
        );
    }

    #[test]
    fn test_fresh_session_has_no_continue_flag() {
        let ctx = DispatchContext::new("hello", &PersistedState::new("/tmp"));
        let args = ClaudeCode::default().args_for(&ctx);
        assert_eq!(args[0], "-p");
        assert!(!args.contains(&"-c".to_string()));
    }

    #[tokio::test]
    async fn test_stdout_is_returned() {
        let dir = tempdir().unwrap();
        let outcome = scripted("echo '  hello from the assistant  '")
            .dispatch(&context(dir.path()))
            .await;

        assert_eq!(outcome, DispatchOutcome::Output("hello from the assistant".to_string()));
    }

    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();

        let outcome = scripted("ls").dispatch(&context(dir.path())).await;

        assert_eq!(outcome, DispatchOutcome::Output("marker.txt".to_string()));
    }

    #[tokio::test]
    async fn test_prompt_reaches_the_process() {
        let dir = tempdir().unwrap();
        // $2 is the value after -p
        let outcome = scripted("printf '%s' \"$2\"").dispatch(&context(dir.path())).await;

        assert_eq!(outcome, DispatchOutcome::Output("do the thing".to_string()));
    }

    #[tokio::test]
    async fn test_stderr_only() {
        let dir = tempdir().unwrap();
        let outcome = scripted("echo boom >&2; exit 3").dispatch(&context(dir.path())).await;

        assert_eq!(outcome, DispatchOutcome::ErrorOutput("boom".to_string()));
    }

    #[tokio::test]
    async fn test_no_output() {
        let dir = tempdir().unwrap();
        let outcome = scripted("true").dispatch(&context(dir.path())).await;

        assert_eq!(outcome, DispatchOutcome::Empty);
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let dir = tempdir().unwrap();
        let assistant = scripted("sleep 5").with_timeout(Duration::from_millis(200));

        let started = std::time::Instant::now();
        let outcome = assistant.dispatch(&context(dir.path())).await;

        assert_eq!(outcome, DispatchOutcome::TimedOut(Duration::from_millis(200)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let dir = tempdir().unwrap();
        let assistant = ClaudeCode::new("secretary-no-such-assistant-binary");

        assert!(!assistant.is_available());
        assert_eq!(assistant.dispatch(&context(dir.path())).await, DispatchOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_missing_working_directory() {
        let dir = tempdir().unwrap();
        let gone = dir.path().join("gone");

        let outcome = scripted("echo hi").dispatch(&context(&gone)).await;

        assert!(matches!(outcome, DispatchOutcome::Failed(msg) if msg.contains("does not exist")));
    }
}
