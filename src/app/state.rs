//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{ArenaHandle, GameArena};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub arena: ArenaHandle,
}

impl AppState {
    /// Start the arena task and wrap its handle. Must run inside the tokio runtime.
    pub fn new(config: Config) -> Self {
        let arena = GameArena::spawn(config.arena.clone());
        Self {
            config: Arc::new(config),
            arena,
        }
    }
}
