//! Dispatch of user tasks to a locally installed coding assistant.
//!
//! # Key Concepts
//!
//! - **Assistant**: trait the main loop dispatches through
//! - **DispatchContext**: per-call prompt, model, working directory and
//!   session-continuation flag
//! - **DispatchOutcome**: every way a call can end, each with a canned
//!   user-facing reply; dispatch itself never fails
//!
//! # Example
//!
//! ```no_run
//! use secretary_assistant::{Assistant, ClaudeCode, DispatchContext};
//! use secretary_models::PersistedState;
//!
//! # async fn demo() {
//! let state = PersistedState::new("/tmp");
//! let ctx = DispatchContext::new("list the files here", &state).continuing(true);
//!
//! let claude = ClaudeCode::new("claude");
//! let reply = claude.dispatch(&ctx).await.into_reply();
//! println!("{}", reply);
//! # }
//! ```

pub mod claude_code;
pub mod context;
pub mod outcome;
pub mod traits;

pub use claude_code::ClaudeCode;
pub use context::{load_system_prompt, DispatchContext, DEFAULT_SYSTEM_PROMPT};
pub use outcome::DispatchOutcome;
pub use traits::Assistant;
