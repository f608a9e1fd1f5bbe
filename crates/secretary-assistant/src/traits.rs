//! The dispatch seam between the main loop and the assistant process.

use async_trait::async_trait;

use crate::context::DispatchContext;
use crate::outcome::DispatchOutcome;

/// Something that can answer a task.
///
/// Implementations must not panic or return early with an error: every
/// failure is reported through [`DispatchOutcome`].
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Runs one task to completion (or timeout).
    async fn dispatch(&self, ctx: &DispatchContext) -> DispatchOutcome;
}
