//! Secretary Core - shared logic with no I/O against the chat endpoint.
//!
//! - **config**: on-disk layout and the [`SecretaryConfig`] struct built once at startup
//! - **control_tags**: lexer for `[CMD:...]` / `[FILE:...]` directives in assistant output
//! - **markup**: markup cleanup and length-bounded message chunking
//! - **workdir**: path resolution for `/cd` and `[FILE:...]` tags

pub mod config;
pub mod control_tags;
pub mod markup;
pub mod workdir;

pub use config::{SecretaryConfig, VoiceConfig};
pub use control_tags::{parse_response, tokenize, ControlTag, ParsedResponse, Token};
pub use markup::{split_message, strip_markup};
pub use workdir::resolve_path;
