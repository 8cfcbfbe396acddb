//! Offline fallback simulation
//!
//! Runs the same combat rules against bot opponents when no server is
//! reachable. It owns its own [`WorldState`] and shares nothing with the
//! authoritative tick loop; results are for continuity only.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;
use uuid::Uuid;

use crate::ws::protocol::CombatantState;

use super::combat::{CombatResolver, TickOutcome};
use super::combatant::Combatant;
use super::input::{Intent, Movement};
use super::rules::ArenaRules;
use super::skin::Skin;
use super::world::WorldState;

/// Chance per tick that a bot picks a new heading
const BOT_REDIRECT_CHANCE: f64 = 0.02;
/// Chance per tick that a bot swings, before its strength multiplier
const BOT_SWING_CHANCE: f64 = 0.01;
/// Share of the local coin balance lost on each death, in percent
const DEATH_PENALTY_PERCENT: u32 = 20;
/// Bot opponents in a default local match
pub const DEFAULT_BOTS: usize = 9;

/// Local match statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalStats {
    pub kills: u32,
    pub deaths: u32,
}

/// Local match: one player, bots, same resolver
pub struct FallbackSimulation {
    world: WorldState,
    local_id: Uuid,
    bots: Vec<Uuid>,
    rng: ChaCha8Rng,
    stats: LocalStats,
}

impl FallbackSimulation {
    pub fn new(rules: ArenaRules, seed: u64, bot_count: usize, skin: Skin, coins: u32) -> Self {
        let center = (rules.world_width / 2.0, rules.world_height / 2.0);
        let mut world = WorldState::new(rules, seed);
        let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));

        let local_id = Uuid::new_v4();
        world.add_combatant(local_id, "You".to_string(), skin);
        if let Some(local) = world.get_mut(local_id) {
            local.x = center.0;
            local.y = center.1;
            local.coins = coins;
        }

        let bots = (1..=bot_count)
            .map(|n| {
                let id = Uuid::new_v4();
                let skin = Skin::ALL[rng.gen_range(0..Skin::ALL.len())];
                world.add_combatant(id, format!("Player{n}"), skin);
                id
            })
            .collect();

        Self {
            world,
            local_id,
            bots,
            rng,
            stats: LocalStats::default(),
        }
    }

    /// Advance one tick with the local player's intent for this frame
    pub fn step(&mut self, now: u64, local_intent: Option<Intent>) -> TickOutcome {
        let mut intents: HashMap<Uuid, Intent> = self
            .bots
            .iter()
            .filter_map(|id| self.world.get(*id))
            .filter(|bot| bot.is_live())
            .map(|bot| (bot.id, Self::think(bot, self.world.all(), &mut self.rng)))
            .collect();

        if let Some(intent) = local_intent {
            intents.insert(self.local_id, intent);
        }

        let outcome = CombatResolver::resolve(&mut self.world, &intents, now);
        self.record(&outcome);
        outcome
    }

    pub fn local(&self) -> Option<&Combatant> {
        self.world.get(self.local_id)
    }

    pub fn local_id(&self) -> Uuid {
        self.local_id
    }

    pub fn stats(&self) -> LocalStats {
        self.stats
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    /// Current state of everyone, for drawing
    pub fn snapshot(&self) -> Vec<CombatantState> {
        self.world.all().iter().map(|c| c.state()).collect()
    }

    /// Bot behaviour: drift, face the nearest opponent, swing at random
    fn think(bot: &Combatant, everyone: &[Combatant], rng: &mut ChaCha8Rng) -> Intent {
        let movement = if rng.gen_bool(BOT_REDIRECT_CHANCE) {
            let dx: i8 = rng.gen_range(-1..=1);
            let dy: i8 = rng.gen_range(-1..=1);
            Some(Movement {
                move_left: dx < 0,
                move_right: dx > 0,
                move_up: dy < 0,
                move_down: dy > 0,
            })
        } else {
            None
        };

        let facing_angle = everyone
            .iter()
            .filter(|other| other.id != bot.id && other.is_live())
            .map(|other| {
                let dx = other.x - bot.x;
                let dy = other.y - bot.y;
                (dx * dx + dy * dy, dy.atan2(dx))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, angle)| angle);

        let swing_chance = (BOT_SWING_CHANCE * f64::from(bot.strength())).clamp(0.0, 1.0);

        Intent {
            movement,
            facing_angle,
            attack_requested: rng.gen_bool(swing_chance),
            dash_requested: false,
        }
    }

    /// Local bookkeeping: kill/death counters and the death coin penalty
    fn record(&mut self, outcome: &TickOutcome) {
        for elimination in &outcome.eliminations {
            if elimination.killer_id == self.local_id {
                self.stats.kills += 1;
            }
            if elimination.victim_id == self.local_id {
                self.stats.deaths += 1;
                if let Some(local) = self.world.get_mut(self.local_id) {
                    let penalty = local.coins * DEATH_PENALTY_PERCENT / 100;
                    local.coins -= penalty;
                    debug!(penalty, coins = local.coins, "Local player eliminated");
                }
            }
        }
    }
}
