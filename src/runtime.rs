//! Runtime for hosting widget engines
//!
//! Each session gets its own engine task. The `SessionManager` maps
//! session ids to running handles.

mod executor;
pub mod traits;


pub use executor::{spawn_engine, EngineError, WidgetHandle, WidgetSnapshot};
pub use traits::*;

use crate::dispatch::ReplyBackend;
use crate::router::IntentRouter;
use crate::state_machine::ConvContext;
use crate::transcript::Turn;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};

/// Events sent to stream clients
#[derive(Debug, Clone)]
pub enum WidgetEvent {
    Turn {
        turn: Turn,
    },
    /// A turn changed after it was appended (feedback)
    TurnUpdated {
        turn: Turn,
    },
    StateChange {
        /// `WidgetStatus` as JSON
        state: serde_json::Value,
    },
    Navigate {
        path: String,
    },
    Error {
        message: String,
    },
}

/// Settings shared by every engine the manager creates
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub company_name: String,
    pub router: IntentRouter,
    pub redirect_delay: Duration,
    pub speech_supported: bool,
    /// Sessions untouched for this long are disposed
    pub session_idle_timeout: Duration,
}

/// A running engine plus the client-fed speech capture attached to it
#[derive(Clone)]
pub struct HostedSession {
    pub handle: WidgetHandle,
    pub speech: Arc<ClientSpeechCapture>,
}

struct SessionEntry {
    session: HostedSession,
    /// Last lookup through the manager (for idle eviction)
    last_activity: Instant,
}

/// Upper bound on the idle sweep interval
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Manager for all hosted widget sessions
pub struct SessionManager {
    backend: Arc<dyn ReplyBackend>,
    settings: EngineSettings,
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionManager {
    /// Create the manager and start the idle sweep
    pub fn new(backend: Arc<dyn ReplyBackend>, settings: EngineSettings) -> Arc<Self> {
        let sweep_interval = (settings.session_idle_timeout / 2).min(MAX_SWEEP_INTERVAL);
        let manager = Arc::new(Self {
            backend,
            settings,
            sessions: RwLock::new(HashMap::new()),
        });

        // Weak reference so the sweep never keeps the manager alive
        let manager_weak = Arc::downgrade(&manager);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(sweep_interval).await;
                let Some(manager) = manager_weak.upgrade() else {
                    tracing::debug!("SessionManager dropped, idle sweep exiting");
                    break;
                };
                manager.evict_idle().await;
            }
        });

        manager
    }

    /// Start a fresh engine instance
    pub async fn create(&self) -> HostedSession {
        let session_id = uuid::Uuid::new_v4().to_string();
        let context = ConvContext::new(
            &session_id,
            &self.settings.company_name,
            self.settings.router.clone(),
        )
        .with_redirect_delay(self.settings.redirect_delay)
        .with_speech_supported(self.settings.speech_supported);

        let (broadcast_tx, _) = broadcast::channel(128);
        let navigator = Arc::new(BroadcastNavigator::new(broadcast_tx.clone()));
        let speech = Arc::new(ClientSpeechCapture::new(self.settings.speech_supported));

        let handle = spawn_engine(
            context,
            self.backend.clone(),
            navigator,
            speech.clone(),
            broadcast_tx,
        );
        let session = HostedSession { handle, speech };

        let active = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(
                session_id.clone(),
                SessionEntry {
                    session: session.clone(),
                    last_activity: Instant::now(),
                },
            );
            sessions.len()
        };
        tracing::info!(session_id = %session_id, active = active, "Session created");

        session
    }

    /// Look up a session and mark it active
    pub async fn get(&self, session_id: &str) -> Option<HostedSession> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(session_id)?;
        entry.last_activity = Instant::now();
        Some(entry.session.clone())
    }

    /// Dispose the engine and forget the session. Returns false if unknown.
    pub async fn dispose(&self, session_id: &str) -> bool {
        let Some(entry) = self.sessions.write().await.remove(session_id) else {
            return false;
        };
        if let Err(e) = entry.session.handle.dispose().await {
            tracing::warn!(session_id = %session_id, error = %e, "Dispose failed");
        }
        tracing::info!(session_id = %session_id, "Session disposed");
        true
    }

    /// Dispose sessions nobody has touched within the idle timeout.
    /// A session with an attached event stream is never idle.
    async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let idle: Vec<(String, HostedSession)> = {
            let mut sessions = self.sessions.write().await;
            let expired: Vec<String> = sessions
                .iter()
                .filter(|(_, entry)| {
                    entry.session.handle.stream_count() == 0
                        && now.duration_since(entry.last_activity)
                            > self.settings.session_idle_timeout
                })
                .map(|(id, _)| id.clone())
                .collect();
            expired
                .into_iter()
                .filter_map(|id| sessions.remove(&id).map(|entry| (id, entry.session)))
                .collect()
        };

        for (session_id, session) in &idle {
            if let Err(e) = session.handle.dispose().await {
                tracing::warn!(session_id = %session_id, error = %e, "Dispose failed");
            }
            tracing::info!(session_id = %session_id, "Idle session evicted");
        }
        idle.len()
    }
}
