//! AI secretary bot binary.
//!
//! Start the bot with:
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx TELEGRAM_CHAT_ID=123 cargo run -p secretary-telegram
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use secretary_assistant::ClaudeCode;
use secretary_core::config::{
    self, DEFAULT_DISPATCH_TIMEOUT_SECS, DEFAULT_MAX_PROMPT_CHARS, DEFAULT_MAX_TURNS,
};
use secretary_core::{SecretaryConfig, VoiceConfig};
use secretary_telegram::{CommandSpeechToText, SecretaryBot, SecretaryError, TelegramTransport};
use tracing_subscriber::EnvFilter;

/// AI secretary - drive a coding assistant from Telegram
#[derive(Parser, Debug)]
#[command(name = "secretary")]
#[command(about = "Telegram bot that relays your messages to a local coding assistant")]
struct Args {
    /// Bot token from @BotFather
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// The only chat the bot answers
    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    chat_id: Option<String>,

    /// Working directory used until changed with /cd (default: home)
    #[arg(long, env = "SECRETARY_CWD")]
    cwd: Option<PathBuf>,

    /// Assistant program
    #[arg(long, env = "SECRETARY_ASSISTANT", default_value = "claude")]
    assistant: String,

    /// Extra argument placed before the generated ones (repeatable)
    #[arg(long = "assistant-arg", allow_hyphen_values = true)]
    assistant_args: Vec<String>,

    /// Seconds before a dispatch is killed
    #[arg(long, env = "SECRETARY_TIMEOUT_SECS", default_value_t = DEFAULT_DISPATCH_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Maximum assistant turns per dispatch
    #[arg(long, env = "SECRETARY_MAX_TURNS", default_value_t = DEFAULT_MAX_TURNS)]
    max_turns: u32,

    /// Upper bound on prompt plus history, in characters
    #[arg(long, env = "SECRETARY_MAX_PROMPT_CHARS", default_value_t = DEFAULT_MAX_PROMPT_CHARS)]
    max_prompt_chars: usize,

    /// Speech recognizer program; voice notes are refused without one
    #[arg(long, env = "SECRETARY_RECOGNIZER")]
    recognizer: Option<String>,

    /// Recognizer argument template with {input} and {locale} (repeatable)
    #[arg(long = "recognizer-arg", allow_hyphen_values = true)]
    recognizer_args: Vec<String>,

    /// Recognition locales, tried in order
    #[arg(long, env = "SECRETARY_LOCALES", value_delimiter = ',', default_value = "zh,en")]
    locales: Vec<String>,

    /// Audio transcoder program
    #[arg(long, env = "SECRETARY_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: String,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn into_config(self) -> Result<SecretaryConfig, SecretaryError> {
        let token = self
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or(SecretaryError::MissingToken)?;
        let chat_id_raw = self
            .chat_id
            .filter(|c| !c.trim().is_empty())
            .ok_or(SecretaryError::MissingChatId)?;
        let chat_id = chat_id_raw
            .trim()
            .parse::<i64>()
            .map_err(|_| SecretaryError::InvalidChatId(chat_id_raw.clone()))?;

        let mut cfg = SecretaryConfig::new(token.trim(), chat_id)
            .with_assistant(self.assistant, self.assistant_args)
            .with_dispatch_timeout(Duration::from_secs(self.timeout_secs))
            .with_max_turns(self.max_turns)
            .with_max_prompt_chars(self.max_prompt_chars);

        if let Some(cwd) = self.cwd {
            cfg = cfg.with_working_dir(cwd);
        }

        if let Some(recognizer) = self.recognizer {
            let mut voice = VoiceConfig::new(recognizer)
                .with_ffmpeg(self.ffmpeg)
                .with_locales(self.locales);
            if !self.recognizer_args.is_empty() {
                voice = voice.with_recognizer_args(self.recognizer_args);
            }
            cfg = cfg.with_voice(voice);
        }

        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Env files first so clap's env fallbacks can see them
    let env_path = config::env_file();
    if env_path.exists() {
        let _ = dotenvy::from_path(&env_path);
    }
    let _ = dotenvy::from_filename(".env.local").or_else(|_| dotenvy::dotenv());

    let args = Args::parse();

    let filter = match args.verbose {
        0 => "secretary_telegram=info,secretary_assistant=info,teloxide=warn",
        1 => "secretary_telegram=debug,secretary_assistant=debug,secretary_persistence=debug,teloxide=info",
        2 => "secretary_telegram=trace,secretary_assistant=trace,secretary_persistence=trace,teloxide=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = match args.into_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config::ensure_dirs(&cfg) {
        tracing::warn!(error = %e, "Failed to create all directories");
    }

    tracing::info!(
        token = %cfg.redacted_token(),
        chat_id = cfg.chat_id,
        state_file = %cfg.state_file.display(),
        voice = cfg.voice.is_some(),
        "AI secretary starting"
    );

    let assistant = ClaudeCode::new(cfg.assistant_program.clone())
        .with_leading_args(cfg.assistant_args.clone())
        .with_max_turns(cfg.max_turns)
        .with_timeout(cfg.dispatch_timeout);
    if !assistant.is_available() {
        tracing::warn!(program = %assistant.program(), "Assistant program not found on PATH");
    }

    let transport = TelegramTransport::new(&cfg.bot_token, cfg.poll_timeout)?;
    match transport.get_me().await {
        Ok(username) => tracing::info!(username = %username, "Bot initialized successfully"),
        Err(e) => tracing::warn!(error = %e, "Failed to get bot info, polling anyway"),
    }

    let speech = cfg
        .voice
        .clone()
        .map(|voice| Arc::new(CommandSpeechToText::new(voice)));

    let mut bot = SecretaryBot::new(cfg, Arc::new(transport), Arc::new(assistant));
    if let Some(speech) = speech {
        bot = bot.with_speech(speech);
    }

    println!("\n[robot] AI secretary running");
    println!("   Press Ctrl+C to stop\n");

    bot.run().await?;
    Ok(())
}
