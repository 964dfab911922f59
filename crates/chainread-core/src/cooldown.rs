//! Scheduled reconnects for faulted endpoints.
//!
//! Each faulted slot gets one task: wait `delay`, try to reconnect, put the
//! slot back into rotation on success, otherwise wait again. All tasks hang
//! off one root [`CancellationToken`] so the pool can stop them together.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::pool::Slot;

pub(crate) struct CooldownRegistry {
    shutdown: CancellationToken,
    tasks: Mutex<HashMap<usize, JoinHandle<()>>>,
    delay: Duration,
    dial_timeout: Duration,
}

impl CooldownRegistry {
    pub(crate) fn new(delay: Duration, dial_timeout: Duration) -> Self {
        Self {
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(HashMap::new()),
            delay,
            dial_timeout,
        }
    }

    /// Start the reconnect loop for the slot at `index`. The slot must
    /// already be marked as cooling down.
    pub(crate) fn schedule(&self, index: usize, slot: Arc<Slot>) {
        let token = self.shutdown.child_token();
        if token.is_cancelled() {
            return;
        }
        let delay = self.delay;
        let dial_timeout = self.dial_timeout;
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
                let url = slot.endpoint.address();
                let attempt = tokio::select! {
                    _ = token.cancelled() => return,
                    res = tokio::time::timeout(dial_timeout, slot.endpoint.reconnect()) => res,
                };
                match attempt {
                    Ok(Ok(())) => {
                        slot.release();
                        tracing::info!(url, "Endpoint back in rotation");
                        return;
                    }
                    Ok(Err(e)) => tracing::warn!(url, error = %e, "Reconnect failed"),
                    Err(_) => tracing::warn!(
                        url,
                        timeout_ms = dial_timeout.as_millis() as u64,
                        "Reconnect timed out"
                    ),
                }
            }
        });

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|_, h| !h.is_finished());
        if let Some(previous) = tasks.insert(index, handle) {
            previous.abort();
        }
    }

    /// Number of reconnect loops still running.
    pub(crate) fn pending(&self) -> usize {
        let tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.values().filter(|h| !h.is_finished()).count()
    }

    /// Cancel every pending reconnect. Later `schedule` calls are ignored.
    pub(crate) fn shutdown(&self) {
        self.shutdown.cancel();
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
    }
}

impl Drop for CooldownRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
