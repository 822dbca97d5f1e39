use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Latched ctrl-c flag. Bots check it between items only; there is no
/// mid-request cancellation, and the loop that observes the flag flushes its
/// partial results before bailing.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    interrupted: Arc<AtomicBool>,
}

impl InterruptFlag {
    pub fn listen() -> Self {
        let flag = Self::default();
        let interrupted = Arc::clone(&flag.interrupted);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received; flushing results after the current item");
                interrupted.store(true, Ordering::SeqCst);
            }
        });
        flag
    }

    pub fn is_set(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}
