//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{ArenaHandle, TickScheduler, WorldState};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub arena: ArenaHandle,
}

impl AppState {
    /// Build the arena and the state handed to routes. The returned
    /// scheduler must be spawned for the arena to run.
    pub fn new(config: Config) -> (Self, TickScheduler) {
        let config = Arc::new(config);

        let world = WorldState::new(config.rules.clone(), config.world_seed);
        let (scheduler, arena) =
            TickScheduler::new(world, config.tick_rate, config.session_buffer);

        (Self { config, arena }, scheduler)
    }
}
