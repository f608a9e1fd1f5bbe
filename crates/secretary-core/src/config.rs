//! Configuration for the secretary bot.
//!
//! Two layers:
//!
//! - path helpers describing the default on-disk layout, honouring
//!   environment overrides;
//! - [`SecretaryConfig`], the explicit struct constructed once in `main`
//!   and passed by reference to every component.
//!
//! # Storage Structure
//!
//! ```text
//! ~/.ai-secretary/
//! ├── config/
//! │   ├── .env               # secrets (bot token, chat id)
//! │   └── system_prompt.txt  # optional system prompt override
//! ├── received/              # photos and documents sent from the chat
//! └── state/
//!     └── memory.json        # persisted state
//! ```
//!
//! # Environment Variables
//!
//! - `SECRETARY_STATE_DIR`: Override the base directory
//! - `SECRETARY_CONFIG_DIR`: Override the config directory

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable for a custom base directory.
pub const STATE_DIR_ENV: &str = "SECRETARY_STATE_DIR";

/// Environment variable for a custom config directory.
pub const CONFIG_DIR_ENV: &str = "SECRETARY_CONFIG_DIR";

/// Default base directory name under home.
const DEFAULT_STATE_DIR: &str = ".ai-secretary";

const CONFIG_SUBDIR: &str = "config";
const STATE_SUBDIR: &str = "state";
const RECEIVED_SUBDIR: &str = "received";

/// Default wall-clock limit for one assistant invocation.
pub const DEFAULT_DISPATCH_TIMEOUT_SECS: u64 = 300;

/// Default `--max-turns` passed to the assistant.
pub const DEFAULT_MAX_TURNS: u32 = 15;

/// Default bound on history plus current message, in characters.
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 12_000;

/// Number of history entries prepended to each prompt.
pub const DEFAULT_HISTORY_WINDOW: usize = 5;

/// Long-poll wait passed to the chat endpoint.
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

/// Pause after a failed poll or a failed loop iteration.
pub const DEFAULT_ERROR_BACKOFF_SECS: u64 = 5;

/// Cadence of the "typing" indicator while a dispatch runs.
pub const DEFAULT_TYPING_INTERVAL_SECS: u64 = 4;

/// Outbound chunk size; the endpoint's hard ceiling is 4096.
pub const DEFAULT_CHUNK_LIMIT: usize = 4000;

/// Delay between chunks of one long message.
pub const DEFAULT_CHUNK_DELAY_MS: u64 = 500;

/// Default recognizer arguments (whisper.cpp style). `{locale}` and
/// `{input}` are substituted per call.
pub const DEFAULT_RECOGNIZER_ARGS: [&str; 5] = ["-nt", "-l", "{locale}", "-f", "{input}"];

/// Default recognition locales, tried in order.
pub const DEFAULT_LOCALES: [&str; 2] = ["zh", "en"];

/// Get the base directory.
///
/// 1. `SECRETARY_STATE_DIR` if set
/// 2. `~/.ai-secretary` if a home directory is available
/// 3. `.ai-secretary` in the current directory
pub fn state_dir() -> PathBuf {
    std::env::var(STATE_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(DEFAULT_STATE_DIR))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
        })
}

/// Get the config directory (`SECRETARY_CONFIG_DIR` or `<state_dir>/config`).
pub fn config_dir() -> PathBuf {
    std::env::var(CONFIG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| state_dir().join(CONFIG_SUBDIR))
}

/// Get the env file holding secrets.
pub fn env_file() -> PathBuf {
    config_dir().join(".env")
}

/// Get the system prompt override file.
pub fn system_prompt_file() -> PathBuf {
    config_dir().join("system_prompt.txt")
}

/// Get the persisted state file.
pub fn state_file() -> PathBuf {
    state_dir().join(STATE_SUBDIR).join("memory.json")
}

/// Get the directory received photos and documents are saved to.
pub fn received_dir() -> PathBuf {
    state_dir().join(RECEIVED_SUBDIR)
}

/// Get the default working directory for the assistant (home, or `.`).
pub fn default_working_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Ensure the config and received directories exist.
///
/// # Errors
/// Returns an error if any directory cannot be created.
pub fn ensure_dirs(config: &SecretaryConfig) -> std::io::Result<()> {
    std::fs::create_dir_all(&config.received_dir)?;
    if let Some(parent) = config.state_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if let Some(parent) = config.system_prompt_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Voice-note transcription settings. Absent means voice is unsupported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceConfig {
    /// Transcoder binary (ffmpeg compatible).
    pub ffmpeg_program: String,
    /// Speech recognizer binary.
    pub recognizer_program: String,
    /// Recognizer argument template; see [`DEFAULT_RECOGNIZER_ARGS`].
    pub recognizer_args: Vec<String>,
    /// Locales tried in order until one yields text.
    pub locales: Vec<String>,
}

impl VoiceConfig {
    /// Creates a voice config with default transcoder, args and locales.
    pub fn new(recognizer_program: impl Into<String>) -> Self {
        Self {
            ffmpeg_program: "ffmpeg".to_string(),
            recognizer_program: recognizer_program.into(),
            recognizer_args: DEFAULT_RECOGNIZER_ARGS.iter().map(|s| s.to_string()).collect(),
            locales: DEFAULT_LOCALES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Sets the transcoder binary.
    pub fn with_ffmpeg(mut self, program: impl Into<String>) -> Self {
        self.ffmpeg_program = program.into();
        self
    }

    /// Replaces the recognizer argument template.
    pub fn with_recognizer_args(mut self, args: Vec<String>) -> Self {
        self.recognizer_args = args;
        self
    }

    /// Replaces the locale list.
    pub fn with_locales(mut self, locales: Vec<String>) -> Self {
        self.locales = locales;
        self
    }

    /// Recognizer arguments with `{input}` and `{locale}` substituted.
    pub fn recognizer_args_for(&self, input: &str, locale: &str) -> Vec<String> {
        self.recognizer_args
            .iter()
            .map(|arg| arg.replace("{input}", input).replace("{locale}", locale))
            .collect()
    }
}

/// Everything the bot needs to run.
#[derive(Clone)]
pub struct SecretaryConfig {
    /// Bot credential.
    pub bot_token: String,
    /// The single conversation the bot answers.
    pub chat_id: i64,
    /// Working directory used when the state file has none.
    pub default_working_dir: PathBuf,
    /// Persisted state file.
    pub state_file: PathBuf,
    /// System prompt override file.
    pub system_prompt_file: PathBuf,
    /// Where received photos and documents are stored.
    pub received_dir: PathBuf,
    /// Assistant binary.
    pub assistant_program: String,
    /// Arguments placed before the generated ones.
    pub assistant_args: Vec<String>,
    /// Hard limit per dispatch.
    pub dispatch_timeout: Duration,
    /// `--max-turns` for the assistant.
    pub max_turns: u32,
    /// Bound on history plus current message.
    pub max_prompt_chars: usize,
    /// History entries prepended to the prompt.
    pub history_window: usize,
    /// Long-poll wait.
    pub poll_timeout: Duration,
    /// Pause after a failed poll or iteration.
    pub error_backoff: Duration,
    /// Typing indicator cadence.
    pub typing_interval: Duration,
    /// Outbound chunk size in characters.
    pub chunk_limit: usize,
    /// Delay between chunks.
    pub chunk_delay: Duration,
    /// Voice transcription, if configured.
    pub voice: Option<VoiceConfig>,
}

impl SecretaryConfig {
    /// Creates a config with default layout and timings.
    pub fn new(bot_token: impl Into<String>, chat_id: i64) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id,
            default_working_dir: default_working_dir(),
            state_file: state_file(),
            system_prompt_file: system_prompt_file(),
            received_dir: received_dir(),
            assistant_program: "claude".to_string(),
            assistant_args: Vec::new(),
            dispatch_timeout: Duration::from_secs(DEFAULT_DISPATCH_TIMEOUT_SECS),
            max_turns: DEFAULT_MAX_TURNS,
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
            history_window: DEFAULT_HISTORY_WINDOW,
            poll_timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
            error_backoff: Duration::from_secs(DEFAULT_ERROR_BACKOFF_SECS),
            typing_interval: Duration::from_secs(DEFAULT_TYPING_INTERVAL_SECS),
            chunk_limit: DEFAULT_CHUNK_LIMIT,
            chunk_delay: Duration::from_millis(DEFAULT_CHUNK_DELAY_MS),
            voice: None,
        }
    }

    /// Sets the default working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.default_working_dir = dir.into();
        self
    }

    /// Sets the state file.
    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = path.into();
        self
    }

    /// Sets the system prompt file.
    pub fn with_system_prompt_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.system_prompt_file = path.into();
        self
    }

    /// Sets the received-files directory.
    pub fn with_received_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.received_dir = dir.into();
        self
    }

    /// Sets the assistant binary and its leading arguments.
    pub fn with_assistant(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.assistant_program = program.into();
        self.assistant_args = args;
        self
    }

    /// Sets the per-dispatch timeout.
    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    /// Sets `--max-turns`.
    pub fn with_max_turns(mut self, turns: u32) -> Self {
        self.max_turns = turns;
        self
    }

    /// Sets the combined prompt bound.
    pub fn with_max_prompt_chars(mut self, max: usize) -> Self {
        self.max_prompt_chars = max;
        self
    }

    /// Sets the long-poll wait.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Sets the error backoff.
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Sets the typing indicator cadence.
    pub fn with_typing_interval(mut self, interval: Duration) -> Self {
        self.typing_interval = interval;
        self
    }

    /// Sets the chunk size and inter-chunk delay.
    pub fn with_chunking(mut self, limit: usize, delay: Duration) -> Self {
        self.chunk_limit = limit;
        self.chunk_delay = delay;
        self
    }

    /// Enables voice transcription.
    pub fn with_voice(mut self, voice: VoiceConfig) -> Self {
        self.voice = Some(voice);
        self
    }

    /// Last six characters of the token, for logs.
    pub fn redacted_token(&self) -> String {
        let count = self.bot_token.chars().count();
        let tail: String = self.bot_token.chars().skip(count.saturating_sub(6)).collect();
        format!("...{}", tail)
    }
}

impl fmt::Debug for SecretaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretaryConfig")
            .field("bot_token", &self.redacted_token())
            .field("chat_id", &self.chat_id)
            .field("default_working_dir", &self.default_working_dir)
            .field("state_file", &self.state_file)
            .field("assistant_program", &self.assistant_program)
            .field("dispatch_timeout", &self.dispatch_timeout)
            .field("max_turns", &self.max_turns)
            .field("voice", &self.voice.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_file_names() {
        assert!(state_file().ends_with("state/memory.json"));
        assert!(received_dir().ends_with("received"));
        assert!(env_file().ends_with(".env"));
        assert!(system_prompt_file().ends_with("system_prompt.txt"));
    }

    #[test]
    fn test_default_config() {
        let config = SecretaryConfig::new("123:abc", 42);

        assert_eq!(config.chat_id, 42);
        assert_eq!(config.assistant_program, "claude");
        assert_eq!(config.dispatch_timeout, Duration::from_secs(300));
        assert_eq!(config.max_turns, 15);
        assert_eq!(config.poll_timeout, Duration::from_secs(30));
        assert_eq!(config.chunk_limit, 4000);
        assert!(config.voice.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = SecretaryConfig::new("t", 1)
            .with_working_dir("/srv")
            .with_dispatch_timeout(Duration::from_secs(600))
            .with_chunking(100, Duration::ZERO)
            .with_voice(VoiceConfig::new("whisper-cli"));

        assert_eq!(config.default_working_dir, PathBuf::from("/srv"));
        assert_eq!(config.dispatch_timeout, Duration::from_secs(600));
        assert_eq!(config.chunk_limit, 100);
        assert_eq!(config.voice.unwrap().locales, vec!["zh", "en"]);
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = SecretaryConfig::new("123456:SECRETtokenVALUE", 7);
        let debug = format!("{:?}", config);

        assert!(!debug.contains("SECRETtoken"));
        assert!(debug.contains("...nVALUE"));
        assert_eq!(config.redacted_token(), "...nVALUE");
    }

    #[test]
    fn test_recognizer_args_substitution() {
        let voice = VoiceConfig::new("whisper-cli");
        assert_eq!(
            voice.recognizer_args_for("/tmp/v.wav", "en"),
            vec!["-nt", "-l", "en", "-f", "/tmp/v.wav"]
        );
    }
}
