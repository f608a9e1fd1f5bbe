//! Results of a dispatch and the replies they turn into.

use std::time::Duration;

use secretary_models::truncate_chars;

/// Characters of stderr shown when the assistant printed nothing else.
pub const STDERR_EXCERPT_CHARS: usize = 500;

/// Characters of an unexpected error message shown to the user.
pub const FAILURE_EXCERPT_CHARS: usize = 200;

const NO_OUTPUT_REPLY: &str = "(The assistant finished without any output.)";

const NOT_FOUND_REPLY: &str =
    "I can't find the assistant command. Please make sure the Claude Code CLI is installed and on PATH.";

/// How a dispatch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Trimmed standard output.
    Output(String),
    /// Standard output was empty; excerpt of standard error.
    ErrorOutput(String),
    /// Both streams were empty.
    Empty,
    /// The wall-clock limit elapsed and the process was killed.
    TimedOut(Duration),
    /// The assistant program could not be located.
    NotFound,
    /// Anything else (spawn failure, bad working directory).
    Failed(String),
}

impl DispatchOutcome {
    /// Builds the outcome for captured process output.
    pub fn from_streams(stdout: &str, stderr: &str) -> Self {
        let out = stdout.trim();
        if !out.is_empty() {
            return DispatchOutcome::Output(out.to_string());
        }
        let err = stderr.trim();
        if !err.is_empty() {
            return DispatchOutcome::ErrorOutput(truncate_chars(err, STDERR_EXCERPT_CHARS));
        }
        DispatchOutcome::Empty
    }

    /// Wraps an unexpected error message, truncated.
    pub fn failed(message: impl AsRef<str>) -> Self {
        DispatchOutcome::Failed(truncate_chars(message.as_ref(), FAILURE_EXCERPT_CHARS))
    }

    /// True when the assistant produced regular output.
    pub fn is_output(&self) -> bool {
        matches!(self, DispatchOutcome::Output(_))
    }

    /// The text to show the user.
    pub fn into_reply(self) -> String {
        match self {
            DispatchOutcome::Output(text) => text,
            DispatchOutcome::ErrorOutput(excerpt) => {
                format!("The assistant ran into a problem:\n{}", excerpt)
            }
            DispatchOutcome::Empty => NO_OUTPUT_REPLY.to_string(),
            DispatchOutcome::TimedOut(limit) => format!(
                "Sorry, this task took too long and timed out ({}). Want me to try it a different way?",
                humanize(limit)
            ),
            DispatchOutcome::NotFound => NOT_FOUND_REPLY.to_string(),
            DispatchOutcome::Failed(message) => format!("Something went wrong: {}", message),
        }
    }
}

fn humanize(limit: Duration) -> String {
    let secs = limit.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        let mins = secs / 60;
        format!("{} minute{}", mins, if mins == 1 { "" } else { "s" })
    } else if secs >= 1 {
        format!("{} seconds", secs)
    } else {
        format!("{} ms", limit.as_millis())
    }
}
