use std::collections::HashMap;

use crate::connection::{Connection, ConnectionId};

/// A broadcast channel grouping every connection watching one view.
///
/// A topic exists only while it has at least one connection; the registry
/// drops it as soon as the last one leaves.
#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    pub connections: HashMap<ConnectionId, Connection>,
}

impl Topic {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            connections: HashMap::new(),
        }
    }

    /// Adds a connection. Re-adding an id replaces the previous entry.
    pub fn subscribe(&mut self, conn: Connection) {
        self.connections.insert(conn.id.clone(), conn);
    }

    pub fn unsubscribe(&mut self, id: &str) -> Option<Connection> {
        self.connections.remove(id)
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
