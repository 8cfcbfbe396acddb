//! World state: the registry of combatants in the match

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

use super::combatant::{Combatant, COLORS};
use super::rules::ArenaRules;
use super::skin::Skin;

/// Authoritative set of combatants, kept in join order.
///
/// Only the tick loop holds a `WorldState`; everything else sees it through
/// snapshots.
pub struct WorldState {
    combatants: Vec<Combatant>,
    rules: ArenaRules,
    rng: ChaCha8Rng,
}

impl WorldState {
    pub fn new(rules: ArenaRules, seed: u64) -> Self {
        Self {
            combatants: Vec::new(),
            rules,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn rules(&self) -> &ArenaRules {
        &self.rules
    }

    /// Spawn a combatant at a random inset position.
    ///
    /// # Panics
    /// If `id` is already present; ids are allocated uniquely per connection.
    pub fn add_combatant(&mut self, id: Uuid, name: String, skin: Skin) -> &Combatant {
        assert!(
            self.get(id).is_none(),
            "combatant {id} already exists in the world"
        );

        let (x, y) = self.spawn_position();
        let color = COLORS[self.rng.gen_range(0..COLORS.len())];
        let combatant = Combatant::new(id, name, color, skin, x, y, &self.rules);
        self.combatants.push(combatant);
        &self.combatants[self.combatants.len() - 1]
    }

    pub fn remove(&mut self, id: Uuid) -> Option<Combatant> {
        let idx = self.combatants.iter().position(|c| c.id == id)?;
        Some(self.combatants.remove(idx))
    }

    pub fn get(&self, id: Uuid) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Combatant> {
        self.combatants.iter_mut().find(|c| c.id == id)
    }

    /// All combatants in registry (join) order
    pub fn all(&self) -> &[Combatant] {
        &self.combatants
    }

    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    /// Random point inside the spawn inset
    pub fn spawn_position(&mut self) -> (f32, f32) {
        Self::random_spawn(&mut self.rng, &self.rules)
    }

    /// Split borrow for the resolver: combatants, rules and spawn RNG at once
    pub(crate) fn parts_mut(&mut self) -> (&mut [Combatant], &ArenaRules, &mut ChaCha8Rng) {
        (&mut self.combatants, &self.rules, &mut self.rng)
    }

    pub(crate) fn random_spawn(rng: &mut ChaCha8Rng, rules: &ArenaRules) -> (f32, f32) {
        let inset = rules.spawn_inset;
        let x = rng.gen_range(inset..rules.world_width - inset);
        let y = rng.gen_range(inset..rules.world_height - inset);
        (x, y)
    }
}
