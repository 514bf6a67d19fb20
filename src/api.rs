//! HTTP API hosting widget sessions

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::dispatch::ReplyBackend;
use crate::runtime::{EngineSettings, SessionManager};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(backend: Arc<dyn ReplyBackend>, settings: EngineSettings) -> Self {
        Self {
            sessions: SessionManager::new(backend, settings),
        }
    }
}
