//! Game simulation modules

pub mod combat;
pub mod combatant;
pub mod fallback;
pub mod input;
pub mod physics;
pub mod rules;
pub mod session;
pub mod skin;
pub mod snapshot;
pub mod tick;
pub mod world;

pub use input::{InputIngestor, Intent};
pub use rules::{ArenaRules, RespawnPolicy};
pub use session::sanitize_name;
pub use skin::Skin;
pub use tick::{ArenaHandle, TickScheduler};
pub use world::WorldState;
