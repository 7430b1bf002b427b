//! Game simulation modules

pub mod arena;
pub mod combat;
pub mod gateway;
pub mod geometry;
pub mod hazard;
pub mod physics;
pub mod player;
pub mod registry;
pub mod snapshot;
pub mod spawner;
pub mod world;

pub use arena::{ArenaHandle, ArenaStats, GameArena, SessionEvent, SessionEventKind};
