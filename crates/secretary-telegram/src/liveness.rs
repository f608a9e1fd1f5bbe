//! Liveness Indicator: repeats the "typing" action while a task runs.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::transport::ChatTransport;

/// Background typing signal. Stops on [`TypingIndicator::stop`] or drop.
pub struct TypingIndicator {
    handle: Option<JoinHandle<()>>,
}

impl TypingIndicator {
    /// Sends a typing action now and then every `interval`.
    pub fn start(transport: Arc<dyn ChatTransport>, chat_id: i64, interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match transport.send_typing(chat_id).await {
                    Ok(()) => trace!(chat_id, "Typing signal sent"),
                    Err(e) => debug!(error = %e, "Typing signal failed"),
                }
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    /// True until stopped.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancels the background signal.
    pub fn stop(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for TypingIndicator {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::error::Result;
    use crate::transport::InboundEvent;

    #[derive(Default)]
    struct CountingTransport {
        typing: AtomicUsize,
    }

    #[async_trait]
    impl ChatTransport for CountingTransport {
        async fn get_updates(&self, _offset: i32, _timeout: Duration) -> Result<Vec<InboundEvent>> {
            Ok(Vec::new())
        }

        async fn send_text(&self, _chat_id: i64, _text: &str) -> Result<()> {
            Ok(())
        }

        async fn send_document(&self, _chat_id: i64, _path: &Path, _caption: Option<&str>) -> Result<()> {
            Ok(())
        }

        async fn send_typing(&self, _chat_id: i64) -> Result<()> {
            self.typing.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn download(&self, _file_id: &str, _dest: &Path) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_signals_on_interval_until_stopped() {
        let transport = Arc::new(CountingTransport::default());
        let indicator = TypingIndicator::start(transport.clone(), 42, Duration::from_secs(4));

        // Ticks at 0s, 4s and 8s
        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(transport.typing.load(Ordering::SeqCst), 3);
        assert!(indicator.is_running());

        indicator.stop();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(transport.typing.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let transport = Arc::new(CountingTransport::default());
        {
            let _indicator = TypingIndicator::start(transport.clone(), 42, Duration::from_secs(4));
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        let before = transport.typing.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.typing.load(Ordering::SeqCst), before);
        assert_eq!(before, 1);
    }
}
