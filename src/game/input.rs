//! Per-connection intent buffering
//!
//! Connection readers write into their own slot at any time; the tick loop
//! swaps the whole slot table out once per tick. Within one tick window the
//! latest movement keys and facing angle win, while attack and dash requests
//! latch so a press is never lost to a later frame in the same window.

use std::collections::HashMap;

use parking_lot::Mutex;
use thiserror::Error;
use uuid::Uuid;

use super::physics::PhysicsSystem;

/// Held direction keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Movement {
    pub move_left: bool,
    pub move_right: bool,
    pub move_up: bool,
    pub move_down: bool,
}

/// One decoded intent record
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Intent {
    /// `None` leaves the held keys untouched
    pub movement: Option<Movement>,
    /// `None` keeps the previous facing angle
    pub facing_angle: Option<f32>,
    pub attack_requested: bool,
    pub dash_requested: bool,
}

impl Intent {
    /// Intent that only requests an attack
    pub fn attack() -> Self {
        Self {
            attack_requested: true,
            ..Self::default()
        }
    }

    /// Fold a newer intent from the same tick window into this one
    fn absorb(&mut self, newer: Intent) {
        if newer.movement.is_some() {
            self.movement = newer.movement;
        }
        if newer.facing_angle.is_some() {
            self.facing_angle = newer.facing_angle;
        }
        self.attack_requested |= newer.attack_requested;
        self.dash_requested |= newer.dash_requested;
    }
}

/// Why an intent was dropped
#[derive(Debug, Error, PartialEq)]
pub enum IntentError {
    #[error("facing angle is not a finite number")]
    NonFiniteAngle,
}

/// Latest-wins intent slots, one per connection
#[derive(Default)]
pub struct InputIngestor {
    pending: Mutex<HashMap<Uuid, Intent>>,
}

impl InputIngestor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer an intent for the next tick. Malformed intents are rejected and
    /// leave the slot as it was.
    pub fn submit(&self, id: Uuid, mut intent: Intent) -> Result<(), IntentError> {
        if let Some(angle) = intent.facing_angle {
            if !angle.is_finite() {
                return Err(IntentError::NonFiniteAngle);
            }
            intent.facing_angle = Some(PhysicsSystem::wrap_angle(angle));
        }

        self.pending
            .lock()
            .entry(id)
            .and_modify(|slot| slot.absorb(intent))
            .or_insert(intent);
        Ok(())
    }

    /// Take every buffered intent, leaving empty slots for the next window
    pub fn drain(&self) -> HashMap<Uuid, Intent> {
        std::mem::take(&mut *self.pending.lock())
    }

    /// Forget any buffered intent for a closed connection
    pub fn discard(&self, id: Uuid) {
        self.pending.lock().remove(&id);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}
