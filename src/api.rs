//! HTTP API for turnloom

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::engine::Engine;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}
