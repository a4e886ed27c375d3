use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::AbortHandle;
use tracing::debug;

#[derive(Debug, Default)]
pub struct FlashScheduler {
    pending: Mutex<HashMap<String, HashMap<String, AbortHandle>>>,
}

impl FlashScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `task` once `after` has elapsed, unless cancelled first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(self: &Arc<Self>, topic: &str, flash_id: &str, after: Duration, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // The lock is held across spawn so the task cannot finish and
        // deregister before its handle is recorded.
        let mut pending = self.pending.lock();
        let scheduler = Arc::clone(self);
        let (topic_key, flash_key) = (topic.to_string(), flash_id.to_string());
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            scheduler.finish(&topic_key, &flash_key);
            task();
        });
        pending
            .entry(topic.to_string())
            .or_default()
            .insert(flash_id.to_string(), handle.abort_handle());
        debug!("flash {flash_id} scheduled on {topic} in {after:?}");
    }

    fn finish(&self, topic: &str, flash_id: &str) {
        let mut pending = self.pending.lock();
        if let Some(flashes) = pending.get_mut(topic) {
            flashes.remove(flash_id);
            if flashes.is_empty() {
                pending.remove(topic);
            }
        }
    }

    /// Aborts every flash pending on `topic`. Returns how many were aborted.
    pub fn cancel_topic(&self, topic: &str) -> usize {
        let Some(flashes) = self.pending.lock().remove(topic) else {
            return 0;
        };
        for handle in flashes.values() {
            handle.abort();
        }
        debug!("cancelled {} flashes on {topic}", flashes.len());
        flashes.len()
    }

    pub fn cancel_all(&self) {
        let drained: Vec<_> = self.pending.lock().drain().collect();
        for (_, flashes) in drained {
            for handle in flashes.values() {
                handle.abort();
            }
        }
    }

    pub fn pending(&self, topic: &str) -> usize {
        self.pending.lock().get(topic).map(HashMap::len).unwrap_or(0)
    }
}
