//! Topic registry
//!
//! Process-wide map from topic name to the set of live connections subscribed
//! to it. One instance is created at server start and shared by every
//! connection task.
//!
//! Concurrency notes:
//! - All mutation happens under a single reader/writer lock.
//! - `broadcast` holds the read lock only long enough to clone the topic's
//!   connections, then writes with no lock held, so a slow or failing
//!   subscriber never stalls subscribe/unsubscribe on other topics.
//! - Connections whose writes fail are evicted afterwards under the write
//!   lock; delivery to the remaining connections is unaffected.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::broker::topic::Topic;
use crate::connection::{Connection, ConnectionId};
use crate::utils::LiveError;
use crate::wire::Envelope;

/// Per-connection outcome of one broadcast.
#[derive(Debug, Default)]
pub struct BroadcastReport {
    pub delivered: Vec<ConnectionId>,
    pub failed: Vec<(ConnectionId, LiveError)>,
    /// Set when evicting failed connections emptied and dropped the topic.
    pub topic_dropped: bool,
}

impl BroadcastReport {
    pub fn delivered_count(&self) -> usize {
        self.delivered.len()
    }
}

#[derive(Debug, Default)]
pub struct TopicRegistry {
    topics: RwLock<HashMap<String, Topic>>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a connection to a topic, creating the topic if needed.
    pub fn subscribe(&self, topic: &str, conn: Connection) {
        let mut topics = self.topics.write();
        let entry = topics
            .entry(topic.to_string())
            .or_insert_with(|| Topic::new(topic));
        let conn_id = conn.id.clone();
        entry.subscribe(conn);
        info!(
            "subscribed {conn_id} to {topic} ({} connections)",
            entry.connections.len()
        );
    }

    /// Removes a connection from a topic.
    ///
    /// Returns `true` when this removed the topic's last connection and the
    /// topic itself was dropped.
    pub fn unsubscribe(&self, topic: &str, conn_id: &str) -> bool {
        let mut topics = self.topics.write();
        let Some(entry) = topics.get_mut(topic) else {
            return false;
        };
        entry.unsubscribe(conn_id);
        let remaining = entry.connections.len();
        info!("unsubscribed {conn_id} from {topic} ({remaining} connections)");
        if remaining == 0 {
            topics.remove(topic);
            debug!("topic {topic} removed");
            return true;
        }
        false
    }

    /// Sends an envelope to every connection subscribed to `topic`.
    ///
    /// Broadcasting to a topic that does not exist delivers nothing and is
    /// not an error.
    pub fn broadcast(&self, topic: &str, envelope: &Envelope) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let conns = self.snapshot(topic);
        if conns.is_empty() {
            debug!("topic {topic} has no connections");
            return report;
        }

        let text = match envelope.encode() {
            Ok(text) => text,
            Err(e) => {
                warn!("failed to encode envelope for {topic}: {e}");
                return report;
            }
        };

        for conn in conns {
            match conn.send_text(&text) {
                Ok(()) => report.delivered.push(conn.id),
                Err(e) => {
                    warn!("err writing message for topic {topic}: {e}, evicting");
                    report.failed.push((conn.id, e));
                }
            }
        }

        for (conn_id, _) in &report.failed {
            if self.unsubscribe(topic, conn_id) {
                report.topic_dropped = true;
            }
        }
        report
    }

    /// Clones the connections of a topic under the read lock.
    fn snapshot(&self, topic: &str) -> Vec<Connection> {
        self.topics
            .read()
            .get(topic)
            .map(|t| t.connections.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Sends a close frame to every connection and forgets all topics.
    pub fn close_all(&self) {
        let drained: Vec<Topic> = self.topics.write().drain().map(|(_, t)| t).collect();
        for topic in drained {
            for conn in topic.connections.values() {
                if let Err(e) = conn.close() {
                    debug!("close {}: {e}", conn.id);
                }
            }
        }
        info!("topic registry closed");
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.read().contains_key(topic)
    }

    pub fn topic_count(&self) -> usize {
        self.topics.read().len()
    }

    pub fn connection_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .get(topic)
            .map(|t| t.connections.len())
            .unwrap_or(0)
    }
}
