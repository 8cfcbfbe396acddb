//! Arena tuning constants
//!
//! Every number the resolver depends on lives in [`ArenaRules`] so a
//! deployment can fix its own policy (world size, respawn grace) while the
//! combat constants stay identical between the server and the fallback
//! simulation.

/// What happens to an eliminated combatant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespawnPolicy {
    /// Return to the arena once the grace period has elapsed
    Respawn { grace_ms: u64 },
    /// Stay eliminated until the connection closes
    SingleLife,
}

impl Default for RespawnPolicy {
    fn default() -> Self {
        Self::Respawn { grace_ms: 3000 }
    }
}

/// Simulation constants. Distances are world units, speeds are units per tick,
/// durations are milliseconds of simulation clock.
#[derive(Debug, Clone)]
pub struct ArenaRules {
    pub world_width: f32,
    pub world_height: f32,
    /// Distance from the world edge inside which spawns are placed
    pub spawn_inset: f32,

    pub base_radius: f32,
    /// Upper bound on growth so a combatant always fits inside the world
    pub max_radius: f32,
    pub base_speed: f32,
    pub base_max_hp: f32,

    pub sword_length: f32,
    /// Half-width of the attack arc in radians (inclusive)
    pub half_arc: f32,
    pub base_damage: f32,
    pub knockback_force: f32,
    pub swing_duration_ms: u64,
    pub attack_cooldown_ms: u64,

    pub dash_multiplier: f32,
    pub dash_duration_ms: u64,
    pub dash_cooldown_ms: u64,

    /// Extra distance added when pushing overlapping combatants apart
    pub separation_buffer: f32,

    pub growth_factor: f32,
    pub growth_increment: f32,
    pub coin_reward_base: u32,
    pub coin_reward_per_kill: u32,

    pub respawn: RespawnPolicy,
}

impl Default for ArenaRules {
    fn default() -> Self {
        Self {
            world_width: 2000.0,
            world_height: 2000.0,
            spawn_inset: 100.0,
            base_radius: 25.0,
            max_radius: 250.0,
            base_speed: 5.0,
            base_max_hp: 100.0,
            sword_length: 60.0,
            half_arc: std::f32::consts::FRAC_PI_4,
            base_damage: 20.0,
            knockback_force: 15.0,
            swing_duration_ms: 300,
            attack_cooldown_ms: 200,
            dash_multiplier: 2.5,
            dash_duration_ms: 150,
            dash_cooldown_ms: 1500,
            separation_buffer: 0.1,
            growth_factor: 1.1,
            growth_increment: 20.0,
            coin_reward_base: 10,
            coin_reward_per_kill: 5,
            respawn: RespawnPolicy::default(),
        }
    }
}

impl ArenaRules {
    /// Coins awarded for a kill, given the killer's kill count after the kill
    pub fn coin_reward(&self, kills: u32) -> u32 {
        self.coin_reward_base
            .saturating_add(self.coin_reward_per_kill.saturating_mul(kills))
    }

    /// Check that spawn and growth bounds fit inside the world
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(self.world_width.is_finite() && self.world_height.is_finite()) {
            return Err("world size must be a finite number");
        }
        let min_side = self.world_width.min(self.world_height);
        if !(min_side > 2.0 * self.spawn_inset) {
            return Err("world must be larger than twice the spawn inset");
        }
        if !(self.max_radius >= self.base_radius && 2.0 * self.max_radius < min_side) {
            return Err("max radius must be at least the base radius and fit inside the world");
        }
        if self.spawn_inset < self.base_radius {
            return Err("spawn inset must be at least the base radius");
        }
        Ok(())
    }
}
