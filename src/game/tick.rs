//! Authoritative tick loop
//!
//! One task owns the [`WorldState`] and runs lifecycle -> ingest -> resolve ->
//! broadcast as a unit. Connection handlers talk to it only through the
//! [`ArenaHandle`].

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::util::time::{server_millis, tick_duration, Timer};
use crate::ws::protocol::ServerMsg;

use super::combat::{CombatResolver, TickOutcome};
use super::input::InputIngestor;
use super::session::{Lifecycle, SessionRegistry};
use super::skin::Skin;
use super::snapshot::{Broadcaster, SnapshotStats};
use super::world::WorldState;

/// Shared view of a running arena for connection handlers and HTTP routes
#[derive(Clone)]
pub struct ArenaHandle {
    pub ingestor: Arc<InputIngestor>,
    pub sessions: Arc<SessionRegistry>,
    pub snapshot_stats: Arc<Mutex<SnapshotStats>>,
    tick: Arc<AtomicU64>,
    player_count: Arc<AtomicUsize>,
}

impl ArenaHandle {
    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::Relaxed)
    }

    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }
}

/// Fixed-rate driver and sole mutator of the world
pub struct TickScheduler {
    world: WorldState,
    ingestor: Arc<InputIngestor>,
    sessions: Arc<SessionRegistry>,
    lifecycle_rx: mpsc::UnboundedReceiver<Lifecycle>,
    broadcaster: Broadcaster,
    tick_rate: u32,
    tick: Arc<AtomicU64>,
    player_count: Arc<AtomicUsize>,
}

impl TickScheduler {
    pub fn new(world: WorldState, tick_rate: u32, session_buffer: usize) -> (Self, ArenaHandle) {
        let (sessions, lifecycle_rx) = SessionRegistry::new(session_buffer);
        let sessions = Arc::new(sessions);
        let ingestor = Arc::new(InputIngestor::new());
        let snapshot_stats = Arc::new(Mutex::new(SnapshotStats::default()));
        let tick = Arc::new(AtomicU64::new(0));
        let player_count = Arc::new(AtomicUsize::new(0));

        let handle = ArenaHandle {
            ingestor: ingestor.clone(),
            sessions: sessions.clone(),
            snapshot_stats: snapshot_stats.clone(),
            tick: tick.clone(),
            player_count: player_count.clone(),
        };

        let scheduler = Self {
            world,
            ingestor,
            broadcaster: Broadcaster::new(sessions.clone(), snapshot_stats),
            sessions,
            lifecycle_rx,
            tick_rate,
            tick,
            player_count,
        };

        (scheduler, handle)
    }

    /// Run forever at the configured rate. Late ticks run late; none are skipped.
    pub async fn run(mut self) {
        let budget = tick_duration(self.tick_rate);
        info!(tick_rate = self.tick_rate, "Arena tick loop started");

        let mut tick_interval = interval(budget);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tick_interval.tick().await;

            let timer = Timer::new();
            self.step(server_millis());

            let elapsed = timer.elapsed();
            if elapsed > budget {
                warn!(
                    tick = self.tick.load(Ordering::Relaxed),
                    elapsed_micros = timer.elapsed_micros(),
                    players = self.world.len(),
                    "Tick overran its budget"
                );
            }
        }
    }

    /// One complete tick at timestamp `now`
    pub fn step(&mut self, now: u64) -> TickOutcome {
        self.apply_lifecycle();

        let intents = self.ingestor.drain();
        let outcome = CombatResolver::resolve(&mut self.world, &intents, now);

        for hit in &outcome.hits {
            debug!(
                attacker_id = %hit.attacker_id,
                target_id = %hit.target_id,
                damage = hit.damage,
                knockback = ?hit.knockback,
                eliminated = hit.target_eliminated,
                "Hit"
            );
        }

        for elimination in &outcome.eliminations {
            info!(
                victim_id = %elimination.victim_id,
                killer_id = %elimination.killer_id,
                kills = elimination.killer_state.kills,
                "Combatant eliminated"
            );
            self.broadcaster.publish(&ServerMsg::PlayerEliminated {
                eliminated_id: elimination.victim_id,
                killed_by_id: elimination.killer_id,
                killer_state: elimination.killer_state.clone(),
            });
        }

        for id in &outcome.respawned {
            debug!(combatant_id = %id, "Combatant respawned");
        }

        self.broadcaster.publish_snapshot(&self.world);
        self.tick.fetch_add(1, Ordering::Relaxed);

        outcome
    }

    /// Apply joins and leaves queued since the previous tick
    fn apply_lifecycle(&mut self) {
        while let Ok(event) = self.lifecycle_rx.try_recv() {
            match event {
                Lifecycle::Join {
                    id,
                    name,
                    skin,
                    outbound,
                } => self.handle_join(id, name, skin, outbound),
                Lifecycle::Leave { id } => self.handle_leave(id),
            }
        }
        self.player_count.store(self.world.len(), Ordering::Relaxed);
    }

    fn handle_join(
        &mut self,
        id: Uuid,
        name: String,
        skin: Skin,
        outbound: mpsc::Sender<String>,
    ) {
        if outbound.is_closed() {
            debug!(session_id = %id, "Session closed before joining");
            return;
        }

        let player = self.world.add_combatant(id, name, skin).state();
        self.sessions.attach(id, outbound);

        let players = self.world.all().iter().map(|c| c.state()).collect();
        self.broadcaster.send_to(
            id,
            &ServerMsg::Init {
                player_id: id,
                player_name: player.name.clone(),
                players,
            },
        );

        info!(
            combatant_id = %id,
            name = %player.name,
            skin = skin.as_str(),
            player_count = self.world.len(),
            "Combatant joined"
        );
        self.broadcaster.publish(&ServerMsg::PlayerJoined { player });
    }

    fn handle_leave(&mut self, id: Uuid) {
        self.sessions.detach(id);
        self.ingestor.discard(id);

        if self.world.remove(id).is_some() {
            info!(
                combatant_id = %id,
                player_count = self.world.len(),
                "Combatant left"
            );
            self.broadcaster.publish(&ServerMsg::PlayerLeft { player_id: id });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::input::Intent;
    use crate::game::rules::ArenaRules;
    use serde_json::Value;

    fn scheduler() -> (TickScheduler, ArenaHandle) {
        TickScheduler::new(WorldState::new(ArenaRules::default(), 11), 60, 64)
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(serde_json::from_str(&frame).unwrap());
        }
        frames
    }

    fn types(frames: &[Value]) -> Vec<String> {
        frames
            .iter()
            .map(|f| f["type"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn join_sends_init_before_first_snapshot() {
        let (mut scheduler, handle) = scheduler();
        let (id, mut rx) = handle.sessions.connect("Ada".into(), Skin::Warrior);

        scheduler.step(0);

        let frames = drain(&mut rx);
        assert_eq!(types(&frames), vec!["init", "playerJoined", "gameState"]);
        assert_eq!(frames[0]["playerId"], id.to_string());
        assert_eq!(frames[0]["players"].as_array().unwrap().len(), 1);
        assert_eq!(handle.player_count(), 1);
        assert_eq!(handle.tick(), 1);
    }

    #[test]
    fn init_lists_existing_combatants() {
        let (mut scheduler, handle) = scheduler();
        let (_first, mut first_rx) = handle.sessions.connect("A".into(), Skin::Warrior);
        scheduler.step(0);
        drain(&mut first_rx);

        let (_second, mut second_rx) = handle.sessions.connect("B".into(), Skin::Warrior);
        scheduler.step(16);

        let frames = drain(&mut second_rx);
        assert_eq!(frames[0]["type"], "init");
        assert_eq!(frames[0]["players"].as_array().unwrap().len(), 2);

        let seen_by_first = drain(&mut first_rx);
        assert_eq!(types(&seen_by_first), vec!["playerJoined", "gameState"]);
        assert_eq!(seen_by_first[0]["player"]["name"], "B");
    }

    #[test]
    fn disconnect_broadcasts_player_left_before_next_snapshot() {
        let (mut scheduler, handle) = scheduler();
        let (stay, mut stay_rx) = handle.sessions.connect("Stay".into(), Skin::Warrior);
        let (leave, _leave_rx) = handle.sessions.connect("Leave".into(), Skin::Warrior);
        scheduler.step(0);
        drain(&mut stay_rx);

        // Arrives while the tick is conceptually in flight; applied at the next boundary
        handle.ingestor.submit(leave, Intent::attack()).unwrap();
        handle.sessions.disconnect(leave);
        scheduler.step(16);

        let frames = drain(&mut stay_rx);
        assert_eq!(types(&frames), vec!["playerLeft", "gameState"]);
        assert_eq!(frames[0]["playerId"], leave.to_string());
        assert_eq!(frames[1]["players"].as_array().unwrap().len(), 1);
        assert_eq!(frames[1]["players"][0]["id"], stay.to_string());
        assert_eq!(handle.player_count(), 1);
    }

    #[test]
    fn repeated_disconnect_only_announces_once() {
        let (mut scheduler, handle) = scheduler();
        let (_stay, mut stay_rx) = handle.sessions.connect("Stay".into(), Skin::Warrior);
        let (leave, _leave_rx) = handle.sessions.connect("Leave".into(), Skin::Warrior);
        scheduler.step(0);
        drain(&mut stay_rx);

        handle.sessions.disconnect(leave);
        handle.sessions.disconnect(leave);
        scheduler.step(16);

        let frames = drain(&mut stay_rx);
        assert_eq!(types(&frames), vec!["playerLeft", "gameState"]);
    }

    #[test]
    fn session_closed_before_join_never_spawns() {
        let (mut scheduler, handle) = scheduler();
        let (_id, rx) = handle.sessions.connect("Ghost".into(), Skin::Warrior);
        drop(rx);

        scheduler.step(0);
        assert_eq!(handle.player_count(), 0);
        assert!(handle.sessions.is_empty());
    }

    #[test]
    fn elimination_event_precedes_snapshot() {
        let (mut scheduler, handle) = scheduler();
        let (killer, mut killer_rx) = handle.sessions.connect("K".into(), Skin::Warrior);
        let (victim, _victim_rx) = handle.sessions.connect("V".into(), Skin::Warrior);
        scheduler.step(0);
        drain(&mut killer_rx);

        {
            let k = scheduler.world.get_mut(killer).unwrap();
            k.x = 500.0;
            k.y = 500.0;
        }
        {
            let v = scheduler.world.get_mut(victim).unwrap();
            v.x = 550.0;
            v.y = 500.0;
            v.hp = 20.0;
        }

        handle
            .ingestor
            .submit(
                killer,
                Intent {
                    facing_angle: Some(0.0),
                    attack_requested: true,
                    ..Intent::default()
                },
            )
            .unwrap();
        let outcome = scheduler.step(16);
        assert_eq!(outcome.eliminations.len(), 1);

        let frames = drain(&mut killer_rx);
        assert_eq!(types(&frames), vec!["playerEliminated", "gameState"]);
        assert_eq!(frames[0]["eliminatedId"], victim.to_string());
        assert_eq!(frames[0]["killedById"], killer.to_string());
        assert_eq!(frames[0]["killerState"]["kills"], 1);
        assert_eq!(frames[0]["killerState"]["maxHp"], 120.0);

        let snapshot_victim = frames[1]["players"]
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["id"] == victim.to_string())
            .unwrap();
        assert_eq!(snapshot_victim["eliminated"], true);
        assert_eq!(snapshot_victim["hp"], 0.0);
    }

    #[test]
    fn lagging_session_is_removed_from_the_world() {
        let (mut scheduler, handle) =
            TickScheduler::new(WorldState::new(ArenaRules::default(), 5), 60, 4);
        let (_fast, mut fast_rx) = handle.sessions.connect("Fast".into(), Skin::Warrior);
        let (slow, _slow_rx) = handle.sessions.connect("Slow".into(), Skin::Warrior);

        // Never read from the slow session; its four-frame queue overflows on the
        // third tick and the removal lands on the fourth
        for tick in 0..4 {
            scheduler.step(tick * 16);
            drain(&mut fast_rx);
        }

        assert!(scheduler.world.get(slow).is_none());
        assert_eq!(handle.player_count(), 1);
    }

    #[tokio::test]
    async fn run_loop_ticks_on_its_own() {
        let (scheduler, handle) =
            TickScheduler::new(WorldState::new(ArenaRules::default(), 5), 200, 64);
        let task = tokio::spawn(scheduler.run());

        tokio::time::sleep(std::time::Duration::from_millis(60)).await;
        assert!(handle.tick() > 0);
        task.abort();
    }

    #[test]
    fn writer_wakes_when_the_tick_publishes() {
        let (mut scheduler, handle) = scheduler();
        let (_id, mut rx) = handle.sessions.connect("A".into(), Skin::Warrior);

        let mut next_frame = tokio_test::task::spawn(rx.recv());
        tokio_test::assert_pending!(next_frame.poll());

        scheduler.step(0);
        assert!(next_frame.is_woken());
        let frame = tokio_test::assert_ready!(next_frame.poll()).unwrap();
        assert!(frame.contains(r#""type":"init""#));
    }

    #[test]
    fn intents_for_unknown_ids_are_ignored() {
        let (mut scheduler, handle) = scheduler();
        let (id, _rx) = handle.sessions.connect("A".into(), Skin::Warrior);
        scheduler.step(0);
        let unknown = Uuid::new_v4();
        handle.ingestor.submit(unknown, Intent::attack()).unwrap();
        let outcome = scheduler.step(16);
        assert!(outcome.hits.is_empty());
        assert!(scheduler.world.get(id).is_some());
        assert_eq!(handle.ingestor.pending_count(), 0);
    }
}
