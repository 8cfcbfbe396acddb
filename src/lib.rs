//! # Arena Sync Server
//!
//! Authoritative simulation and transport for real-time melee arena combat.
//!
//! One task owns the [`game::WorldState`] and advances it at a fixed rate
//! ([`game::TickScheduler`]). WebSocket sessions never touch the world: they
//! submit intents to the [`game::InputIngestor`] and queue join/leave events,
//! which the tick applies at its boundary.
//!
//! [`game::fallback`] runs the same resolver against bots for clients that
//! have no server to talk to.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;
