//! Snapshot building and fan-out

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, warn};
use uuid::Uuid;

use crate::ws::protocol::ServerMsg;

use super::session::{Delivery, SessionRegistry};
use super::world::WorldState;

/// Serializes server messages once and delivers them to sessions.
///
/// Every send is a non-blocking enqueue; a session whose queue is full is
/// dropped instead of stalling the tick.
pub struct Broadcaster {
    sessions: Arc<SessionRegistry>,
    stats: Arc<Mutex<SnapshotStats>>,
}

impl Broadcaster {
    pub fn new(sessions: Arc<SessionRegistry>, stats: Arc<Mutex<SnapshotStats>>) -> Self {
        Self { sessions, stats }
    }

    /// Build the periodic snapshot message
    pub fn build_snapshot(world: &WorldState) -> ServerMsg {
        ServerMsg::GameState {
            players: world.all().iter().map(|c| c.state()).collect(),
        }
    }

    /// Send the full world state to every open session
    pub fn publish_snapshot(&self, world: &WorldState) {
        let snapshot = Self::build_snapshot(world);
        if let Some(bytes) = self.publish(&snapshot) {
            self.stats.lock().record(world.len(), bytes);
        }
    }

    /// Send one message to every open session. Returns the encoded size.
    pub fn publish(&self, msg: &ServerMsg) -> Option<usize> {
        let frame = encode(msg)?;
        for id in self.sessions.fan_out(&frame) {
            self.sessions.drop_session(id);
        }
        Some(frame.len())
    }

    /// Send one message to a single session
    pub fn send_to(&self, id: Uuid, msg: &ServerMsg) {
        let Some(frame) = encode(msg) else {
            return;
        };
        match self.sessions.send_to(id, frame) {
            Delivery::Sent => {}
            Delivery::Lagging => self.sessions.drop_session(id),
            Delivery::Closed => {
                warn!(session_id = %id, "Targeted send to closed session");
                self.sessions.drop_session(id);
            }
        }
    }
}

fn encode(msg: &ServerMsg) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(frame) => Some(frame),
        Err(e) => {
            error!(error = %e, "Failed to encode server message");
            None
        }
    }
}

/// Snapshot volume for the health endpoint
#[derive(Debug, Default, Clone)]
pub struct SnapshotStats {
    pub total_snapshots: u64,
    pub total_bytes: u64,
    pub avg_players_per_snapshot: f32,
}

impl SnapshotStats {
    pub fn record(&mut self, player_count: usize, bytes: usize) {
        self.total_snapshots += 1;
        self.total_bytes += bytes as u64;

        // Running average
        let n = self.total_snapshots as f32;
        self.avg_players_per_snapshot =
            self.avg_players_per_snapshot * ((n - 1.0) / n) + (player_count as f32 / n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::rules::ArenaRules;
    use crate::game::skin::Skin;
    use tokio::sync::mpsc;

    fn broadcaster(buffer: usize) -> (Broadcaster, Arc<SessionRegistry>) {
        let (registry, _lifecycle) = SessionRegistry::new(buffer);
        let registry = Arc::new(registry);
        let stats = Arc::new(Mutex::new(SnapshotStats::default()));
        (Broadcaster::new(registry.clone(), stats), registry)
    }

    #[test]
    fn snapshot_lists_every_combatant() {
        let mut world = WorldState::new(ArenaRules::default(), 3);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        world.add_combatant(a, "A".into(), Skin::Warrior);
        world.add_combatant(b, "B".into(), Skin::Ninja);

        match Broadcaster::build_snapshot(&world) {
            ServerMsg::GameState { players } => {
                let ids: Vec<Uuid> = players.iter().map(|p| p.id).collect();
                assert_eq!(ids, vec![a, b]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn identical_frame_reaches_every_session() {
        let (broadcaster, registry) = broadcaster(4);
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        registry.attach(Uuid::new_v4(), tx1);
        registry.attach(Uuid::new_v4(), tx2);

        let world = WorldState::new(ArenaRules::default(), 3);
        broadcaster.publish_snapshot(&world);

        let f1 = rx1.try_recv().unwrap();
        let f2 = rx2.try_recv().unwrap();
        assert_eq!(f1, f2);
        assert!(f1.contains(r#""type":"gameState""#));
        assert_eq!(broadcaster.stats.lock().total_snapshots, 1);
    }

    #[test]
    fn lagging_session_is_dropped() {
        let (broadcaster, registry) = broadcaster(1);
        let (tx, _rx) = mpsc::channel(1);
        let id = Uuid::new_v4();
        registry.attach(id, tx);

        broadcaster.publish(&ServerMsg::Pong { t: 1 });
        assert_eq!(registry.len(), 1);
        broadcaster.publish(&ServerMsg::Pong { t: 2 });
        assert!(registry.is_empty());
    }

    #[test]
    fn running_average_tracks_player_counts() {
        let mut stats = SnapshotStats::default();
        stats.record(2, 100);
        stats.record(4, 100);
        assert_eq!(stats.total_snapshots, 2);
        assert_eq!(stats.total_bytes, 200);
        assert!((stats.avg_players_per_snapshot - 3.0).abs() < 1e-5);
    }
}
