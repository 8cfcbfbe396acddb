//! Authoritative combatant state

use uuid::Uuid;

use crate::ws::protocol::CombatantState;

use super::input::Movement;
use super::rules::ArenaRules;
use super::skin::Skin;

/// Phase of a timed action (attack swing, dash)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Active,
    Cooldown,
}

/// Idle -> Active -> Cooldown -> Idle, advanced purely from tick timestamps
#[derive(Debug, Clone, Copy)]
pub struct ActionTimer {
    phase: TimerPhase,
    started_at: u64,
    active_ms: u64,
    cooldown_ms: u64,
}

impl ActionTimer {
    pub fn new(active_ms: u64, cooldown_ms: u64) -> Self {
        Self {
            phase: TimerPhase::Idle,
            started_at: 0,
            active_ms,
            cooldown_ms,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    pub fn is_active(&self) -> bool {
        self.phase == TimerPhase::Active
    }

    /// Move through every window that has fully elapsed by `now`
    pub fn advance(&mut self, now: u64) {
        let elapsed = now.saturating_sub(self.started_at);
        if self.phase == TimerPhase::Active && elapsed >= self.active_ms {
            self.phase = TimerPhase::Cooldown;
        }
        if self.phase == TimerPhase::Cooldown
            && elapsed >= self.active_ms.saturating_add(self.cooldown_ms)
        {
            self.phase = TimerPhase::Idle;
        }
    }

    /// Enter the active window if idle. Returns whether it started.
    pub fn try_start(&mut self, now: u64) -> bool {
        if self.phase != TimerPhase::Idle {
            return false;
        }
        self.phase = TimerPhase::Active;
        self.started_at = now;
        true
    }

    pub fn reset(&mut self) {
        self.phase = TimerPhase::Idle;
    }
}

/// Palette clients use to tell combatants apart
pub const COLORS: [&str; 10] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8", "#F7DC6F", "#BB8FCE", "#85C1E2",
    "#F8B988", "#52D273",
];

/// One player's in-match entity
#[derive(Debug, Clone)]
pub struct Combatant {
    pub id: Uuid,
    pub display_name: String,
    pub color: &'static str,
    pub skin: Skin,
    pub coins: u32,

    // Position and movement
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub facing_angle: f32,
    pub movement: Movement,

    // Combat
    pub radius: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub kills: u32,
    pub eliminated: bool,
    pub eliminated_by: Option<Uuid>,
    pub eliminated_at: Option<u64>,
    pub attack: ActionTimer,
    pub dash: ActionTimer,
}

impl Combatant {
    pub fn new(
        id: Uuid,
        display_name: String,
        color: &'static str,
        skin: Skin,
        x: f32,
        y: f32,
        rules: &ArenaRules,
    ) -> Self {
        Self {
            id,
            display_name,
            color,
            skin,
            coins: 0,
            x,
            y,
            vel_x: 0.0,
            vel_y: 0.0,
            facing_angle: 0.0,
            movement: Movement::default(),
            radius: rules.base_radius,
            hp: rules.base_max_hp,
            max_hp: rules.base_max_hp,
            kills: 0,
            eliminated: false,
            eliminated_by: None,
            eliminated_at: None,
            attack: ActionTimer::new(rules.swing_duration_ms, rules.attack_cooldown_ms),
            dash: ActionTimer::new(rules.dash_duration_ms, rules.dash_cooldown_ms),
        }
    }

    pub fn strength(&self) -> f32 {
        self.skin.stats().strength
    }

    pub fn effective_speed(&self, rules: &ArenaRules) -> f32 {
        rules.base_speed * self.skin.stats().speed
    }

    pub fn is_swinging(&self) -> bool {
        self.attack.is_active()
    }

    /// Targetable and able to act
    pub fn is_live(&self) -> bool {
        !self.eliminated
    }

    /// Observable state for the wire
    pub fn state(&self) -> CombatantState {
        CombatantState {
            id: self.id,
            name: self.display_name.clone(),
            x: self.x,
            y: self.y,
            angle: self.facing_angle,
            hp: self.hp,
            max_hp: self.max_hp,
            radius: self.radius,
            is_swinging: self.is_swinging(),
            kills: self.kills,
            eliminated: self.eliminated,
            color: self.color.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_walks_through_all_phases() {
        let mut timer = ActionTimer::new(300, 200);
        assert!(timer.try_start(1000));
        assert_eq!(timer.phase(), TimerPhase::Active);

        timer.advance(1299);
        assert_eq!(timer.phase(), TimerPhase::Active);
        timer.advance(1300);
        assert_eq!(timer.phase(), TimerPhase::Cooldown);
        assert!(!timer.try_start(1300));
        timer.advance(1499);
        assert_eq!(timer.phase(), TimerPhase::Cooldown);
        timer.advance(1500);
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert!(timer.try_start(1500));
    }

    #[test]
    fn long_gap_skips_straight_to_idle() {
        let mut timer = ActionTimer::new(300, 200);
        timer.try_start(0);
        timer.advance(10_000);
        assert_eq!(timer.phase(), TimerPhase::Idle);
    }

    #[test]
    fn cannot_restart_while_active() {
        let mut timer = ActionTimer::new(300, 0);
        assert!(timer.try_start(0));
        assert!(!timer.try_start(100));
        assert_eq!(timer.started_at(), 0);
    }

    #[test]
    fn state_mirrors_entity() {
        let rules = ArenaRules::default();
        let c = Combatant::new(Uuid::new_v4(), "Ada".into(), COLORS[0], Skin::Ninja, 10.0, 20.0, &rules);
        let s = c.state();
        assert_eq!(s.id, c.id);
        assert_eq!(s.name, "Ada");
        assert_eq!((s.x, s.y), (10.0, 20.0));
        assert_eq!(s.max_hp, rules.base_max_hp);
        assert!(!s.is_swinging);
        assert_eq!(s.color, "#FF6B6B");
    }
}
