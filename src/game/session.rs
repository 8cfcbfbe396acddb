//! Session registry - maps connections to combatants
//!
//! Connection handlers never touch the world. `connect` and `disconnect`
//! only queue lifecycle events; the tick loop applies them between ticks,
//! spawning or removing the combatant and attaching the session's outbound
//! queue once the combatant exists.

use dashmap::DashMap;
use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::skin::Skin;

/// Longest display name kept, in characters
pub const MAX_NAME_CHARS: usize = 20;

/// Membership change waiting for the next tick boundary
#[derive(Debug)]
pub enum Lifecycle {
    Join {
        id: Uuid,
        name: String,
        skin: Skin,
        outbound: mpsc::Sender<String>,
    },
    Leave {
        id: Uuid,
    },
}

/// Result of a best-effort send to one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Queue full: the client is not keeping up
    Lagging,
    /// Session already gone
    Closed,
}

/// Open sessions and the lifecycle queue feeding the tick loop
pub struct SessionRegistry {
    sessions: DashMap<Uuid, mpsc::Sender<String>>,
    lifecycle_tx: mpsc::UnboundedSender<Lifecycle>,
    buffer: usize,
}

impl SessionRegistry {
    /// Create a registry whose sessions queue at most `buffer` outbound frames
    pub fn new(buffer: usize) -> (Self, mpsc::UnboundedReceiver<Lifecycle>) {
        let (lifecycle_tx, lifecycle_rx) = mpsc::unbounded_channel();
        let registry = Self {
            sessions: DashMap::new(),
            lifecycle_tx,
            buffer: buffer.max(1),
        };
        (registry, lifecycle_rx)
    }

    /// Open a session. Returns its id (also the combatant id) and the queue
    /// of frames to write to the transport.
    pub fn connect(&self, name: String, skin: Skin) -> (Uuid, mpsc::Receiver<String>) {
        let id = Uuid::new_v4();
        let (outbound, outbound_rx) = mpsc::channel(self.buffer);
        self.queue(Lifecycle::Join {
            id,
            name,
            skin,
            outbound,
        });
        (id, outbound_rx)
    }

    /// Close a session. Safe to call more than once.
    pub fn disconnect(&self, id: Uuid) {
        self.queue(Lifecycle::Leave { id });
    }

    /// Detach a session that cannot keep up and schedule its removal
    pub fn drop_session(&self, id: Uuid) {
        if self.detach(id) {
            warn!(session_id = %id, "Dropping slow session");
            self.disconnect(id);
        }
    }

    pub(crate) fn attach(&self, id: Uuid, outbound: mpsc::Sender<String>) {
        self.sessions.insert(id, outbound);
    }

    /// Remove the outbound queue; the session's writer ends once it drains
    pub(crate) fn detach(&self, id: Uuid) -> bool {
        self.sessions.remove(&id).is_some()
    }

    pub fn send_to(&self, id: Uuid, frame: String) -> Delivery {
        let Some(outbound) = self.sessions.get(&id) else {
            return Delivery::Closed;
        };
        match outbound.try_send(frame) {
            Ok(()) => Delivery::Sent,
            Err(mpsc::error::TrySendError::Full(_)) => Delivery::Lagging,
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Send one frame to every session. Returns sessions that failed.
    pub fn fan_out(&self, frame: &str) -> Vec<Uuid> {
        self.sessions
            .iter()
            .filter_map(|entry| match entry.value().try_send(frame.to_owned()) {
                Ok(()) => None,
                Err(_) => Some(*entry.key()),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn queue(&self, event: Lifecycle) {
        if self.lifecycle_tx.send(event).is_err() {
            debug!("Tick loop stopped, lifecycle event discarded");
        }
    }
}

/// Clean up a requested display name, generating one when nothing usable is left
pub fn sanitize_name(requested: Option<&str>) -> String {
    let cleaned: String = requested
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .chars()
        .take(MAX_NAME_CHARS)
        .collect();

    if cleaned.trim().is_empty() {
        format!("Player{}", rand::thread_rng().gen_range(0..10_000))
    } else {
        cleaned.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_queues_join_with_fresh_id() {
        let (registry, mut lifecycle) = SessionRegistry::new(4);
        let (id, _rx) = registry.connect("Ada".into(), Skin::Tank);

        match lifecycle.try_recv().unwrap() {
            Lifecycle::Join { id: join_id, name, skin, .. } => {
                assert_eq!(join_id, id);
                assert_eq!(name, "Ada");
                assert_eq!(skin, Skin::Tank);
            }
            other => panic!("unexpected {other:?}"),
        }
        // Not attached until the tick loop spawns the combatant
        assert!(registry.is_empty());
    }

    #[test]
    fn send_reports_lagging_when_queue_is_full() {
        let (registry, _lifecycle) = SessionRegistry::new(1);
        let (tx, mut rx) = mpsc::channel(1);
        let id = Uuid::new_v4();
        registry.attach(id, tx);

        assert_eq!(registry.send_to(id, "a".into()), Delivery::Sent);
        assert_eq!(registry.send_to(id, "b".into()), Delivery::Lagging);
        assert_eq!(rx.try_recv().unwrap(), "a");
    }

    #[test]
    fn send_to_closed_or_unknown_session() {
        let (registry, _lifecycle) = SessionRegistry::new(1);
        let (tx, rx) = mpsc::channel(1);
        let id = Uuid::new_v4();
        registry.attach(id, tx);
        drop(rx);

        assert_eq!(registry.send_to(id, "a".into()), Delivery::Closed);
        assert_eq!(registry.send_to(Uuid::new_v4(), "a".into()), Delivery::Closed);
    }

    #[test]
    fn fan_out_reports_failed_sessions() {
        let (registry, _lifecycle) = SessionRegistry::new(1);
        let (fast_tx, mut fast_rx) = mpsc::channel(8);
        let (slow_tx, _slow_rx) = mpsc::channel(1);
        let fast = Uuid::new_v4();
        let slow = Uuid::new_v4();
        registry.attach(fast, fast_tx);
        registry.attach(slow, slow_tx);

        assert!(registry.fan_out("one").is_empty());
        assert_eq!(registry.fan_out("two"), vec![slow]);
        assert_eq!(fast_rx.try_recv().unwrap(), "one");
        assert_eq!(fast_rx.try_recv().unwrap(), "two");
    }

    #[test]
    fn drop_session_detaches_and_queues_leave_once() {
        let (registry, mut lifecycle) = SessionRegistry::new(1);
        let (tx, _rx) = mpsc::channel(1);
        let id = Uuid::new_v4();
        registry.attach(id, tx);

        registry.drop_session(id);
        registry.drop_session(id);

        assert!(registry.is_empty());
        assert!(matches!(lifecycle.try_recv(), Ok(Lifecycle::Leave { id: left }) if left == id));
        assert!(lifecycle.try_recv().is_err());
    }

    #[test]
    fn names_are_cleaned_and_truncated() {
        assert_eq!(sanitize_name(Some("  Ada  ")), "Ada");
        assert_eq!(sanitize_name(Some("Bad\u{7}Name\n")), "BadName");
        assert_eq!(
            sanitize_name(Some("abcdefghijklmnopqrstuvwxyz")),
            "abcdefghijklmnopqrst"
        );
    }

    #[test]
    fn empty_name_is_generated() {
        for raw in [None, Some(""), Some("   "), Some("\n\t")] {
            let name = sanitize_name(raw);
            assert!(name.starts_with("Player"));
            assert!(!name.is_empty() && name.chars().count() <= MAX_NAME_CHARS);
        }
    }
}
