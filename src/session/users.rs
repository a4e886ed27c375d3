use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use crate::session::InMemoryStore;

/// Stable identity of one browser, carried in a cookie.
pub type ViewerId = u64;

/// Per-viewer session stores, created lazily.
///
/// There is no eviction: every viewer seen by the process keeps its store.
#[derive(Debug, Default)]
pub struct UserSessions {
    stores: RwLock<HashMap<ViewerId, Arc<InMemoryStore>>>,
    last_viewer: AtomicU64,
}

impl UserSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an identity for a viewer that presented none.
    pub fn next_viewer(&self) -> ViewerId {
        self.last_viewer.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get_or_create(&self, viewer: ViewerId) -> Arc<InMemoryStore> {
        if let Some(store) = self.stores.read().get(&viewer) {
            debug!("existing viewer {viewer}");
            return store.clone();
        }
        self.stores
            .write()
            .entry(viewer)
            .or_insert_with(|| Arc::new(InMemoryStore::new()))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.stores.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.read().is_empty()
    }
}
