//! Combat resolution - movement, separation, sword swings, eliminations, respawns

use std::collections::HashMap;

use uuid::Uuid;

use crate::ws::protocol::CombatantState;

use super::combatant::Combatant;
use super::input::Intent;
use super::physics::PhysicsSystem;
use super::rules::{ArenaRules, RespawnPolicy};
use super::world::WorldState;

/// A swing that connected
#[derive(Debug, Clone)]
pub struct HitResult {
    pub attacker_id: Uuid,
    pub target_id: Uuid,
    pub damage: f32,
    pub knockback: (f32, f32),
    pub target_eliminated: bool,
}

/// A life that ended this tick
#[derive(Debug, Clone)]
pub struct Elimination {
    pub victim_id: Uuid,
    pub killer_id: Uuid,
    /// Killer state after the kill reward was applied
    pub killer_state: CombatantState,
}

/// Everything a tick produced besides the mutated world
#[derive(Debug, Default)]
pub struct TickOutcome {
    pub hits: Vec<HitResult>,
    pub eliminations: Vec<Elimination>,
    pub respawned: Vec<Uuid>,
}

/// Per-tick resolver. Stateless: all state lives in the [`WorldState`].
pub struct CombatResolver;

impl CombatResolver {
    /// Run one tick against `world` using the intents buffered since the last
    /// tick. `now` is the single timestamp captured for this tick.
    pub fn resolve(world: &mut WorldState, intents: &HashMap<Uuid, Intent>, now: u64) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        let (combatants, rules, rng) = world.parts_mut();

        let attack_requests: Vec<bool> = combatants
            .iter_mut()
            .map(|c| {
                c.attack.advance(now);
                c.dash.advance(now);
                intents
                    .get(&c.id)
                    .map_or(false, |intent| Self::apply_intent(c, intent, now))
            })
            .collect();

        Self::update_movement(combatants, rules);
        Self::separate(combatants, rules);

        for (idx, requested) in attack_requests.into_iter().enumerate() {
            if requested {
                Self::resolve_swing(combatants, idx, rules, now, &mut outcome);
            }
        }

        for c in combatants.iter_mut() {
            if Self::respawn_due(c, rules, now) {
                let (x, y) = WorldState::random_spawn(rng, rules);
                Self::respawn(c, x, y, rules);
                outcome.respawned.push(c.id);
            }
            c.attack.advance(now);
            c.dash.advance(now);
        }

        outcome
    }

    /// Latch the intent onto the combatant. Returns whether an attack was requested.
    fn apply_intent(c: &mut Combatant, intent: &Intent, now: u64) -> bool {
        if let Some(movement) = intent.movement {
            c.movement = movement;
        }
        if let Some(angle) = intent.facing_angle {
            c.facing_angle = angle;
        }
        if !c.is_live() {
            return false;
        }
        if intent.dash_requested {
            c.dash.try_start(now);
        }
        intent.attack_requested
    }

    /// Integrate held movement for every live combatant
    fn update_movement(combatants: &mut [Combatant], rules: &ArenaRules) {
        for c in combatants.iter_mut() {
            if !c.is_live() {
                c.vel_x = 0.0;
                c.vel_y = 0.0;
                continue;
            }

            let (vx, vy) = PhysicsSystem::movement_velocity(
                c.movement,
                c.effective_speed(rules),
                c.dash.is_active(),
                rules.dash_multiplier,
            );
            c.vel_x = vx;
            c.vel_y = vy;
            Self::place(c, c.x + vx, c.y + vy, rules);
        }
    }

    /// Pairwise push-apart of overlapping live combatants
    fn separate(combatants: &mut [Combatant], rules: &ArenaRules) {
        for j in 1..combatants.len() {
            let (head, tail) = combatants.split_at_mut(j);
            let b = &mut tail[0];
            if !b.is_live() {
                continue;
            }

            for a in head.iter_mut().filter(|a| a.is_live()) {
                if !PhysicsSystem::check_overlap(a.x, a.y, a.radius, b.x, b.y, b.radius) {
                    continue;
                }
                let ((ax, ay), (bx, by)) = PhysicsSystem::resolve_overlap(
                    a.x,
                    a.y,
                    a.radius,
                    b.x,
                    b.y,
                    b.radius,
                    rules.separation_buffer,
                );
                Self::place(a, ax, ay, rules);
                Self::place(b, bx, by, rules);
            }
        }
    }

    /// Start a swing for `combatants[idx]` and apply it to everything in its arc
    fn resolve_swing(
        combatants: &mut [Combatant],
        idx: usize,
        rules: &ArenaRules,
        now: u64,
        outcome: &mut TickOutcome,
    ) {
        let attacker = &mut combatants[idx];
        if !attacker.is_live() || !attacker.attack.try_start(now) {
            return;
        }

        let attacker_id = attacker.id;
        let (ax, ay) = (attacker.x, attacker.y);
        let facing = attacker.facing_angle;
        let reach = attacker.radius + rules.sword_length;
        let damage = rules.base_damage * attacker.strength();

        for target_idx in 0..combatants.len() {
            if target_idx == idx {
                continue;
            }
            let target = &mut combatants[target_idx];
            if !target.is_live() || target.is_swinging() {
                continue;
            }

            let dx = target.x - ax;
            let dy = target.y - ay;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist >= reach || !PhysicsSystem::within_arc(facing, dy.atan2(dx), rules.half_arc) {
                continue;
            }

            let (nx, ny) = if dist > f32::EPSILON {
                (dx / dist, dy / dist)
            } else {
                (facing.cos(), facing.sin())
            };
            let knockback = (nx * rules.knockback_force, ny * rules.knockback_force);

            target.hp = (target.hp - damage).max(0.0);
            target.vel_x = knockback.0;
            target.vel_y = knockback.1;
            Self::place(target, target.x + knockback.0, target.y + knockback.1, rules);

            let eliminated = target.hp <= 0.0;
            if eliminated {
                target.hp = 0.0;
                target.eliminated = true;
                target.eliminated_by = Some(attacker_id);
                target.eliminated_at = Some(now);
                target.attack.reset();
                target.dash.reset();
            }

            outcome.hits.push(HitResult {
                attacker_id,
                target_id: target.id,
                damage,
                knockback,
                target_eliminated: eliminated,
            });

            if eliminated {
                let victim_id = target.id;
                let killer = &mut combatants[idx];
                Self::award_kill(killer, rules);
                outcome.eliminations.push(Elimination {
                    victim_id,
                    killer_id: attacker_id,
                    killer_state: killer.state(),
                });
            }
        }
    }

    /// Growth-on-kill: bigger, tougher, fully healed, paid
    fn award_kill(killer: &mut Combatant, rules: &ArenaRules) {
        killer.kills += 1;
        killer.radius = (killer.radius * rules.growth_factor).min(rules.max_radius);
        killer.max_hp += rules.growth_increment;
        killer.hp = killer.max_hp;
        killer.coins = killer.coins.saturating_add(rules.coin_reward(killer.kills));
        Self::place(killer, killer.x, killer.y, rules);
    }

    fn respawn_due(c: &Combatant, rules: &ArenaRules, now: u64) -> bool {
        match (rules.respawn, c.eliminated_at) {
            (RespawnPolicy::Respawn { grace_ms }, Some(at)) if c.eliminated => {
                now.saturating_sub(at) > grace_ms
            }
            _ => false,
        }
    }

    /// New life: position, hp and elimination state reset; growth and kills kept
    fn respawn(c: &mut Combatant, x: f32, y: f32, rules: &ArenaRules) {
        Self::place(c, x, y, rules);
        c.vel_x = 0.0;
        c.vel_y = 0.0;
        c.hp = c.max_hp;
        c.eliminated = false;
        c.eliminated_by = None;
        c.eliminated_at = None;
        c.attack.reset();
        c.dash.reset();
    }

    fn place(c: &mut Combatant, x: f32, y: f32, rules: &ArenaRules) {
        let (x, y) =
            PhysicsSystem::clamp_to_world(x, y, c.radius, rules.world_width, rules.world_height);
        c.x = x;
        c.y = y;
    }
}
