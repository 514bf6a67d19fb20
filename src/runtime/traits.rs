//! Capability abstractions consumed by the widget engine
//!
//! These traits enable testing the executor with mock implementations.

use super::WidgetEvent;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};

/// Page navigation, fire-and-forget
pub trait Navigator: Send + Sync {
    fn navigate_to(&self, path: &str);
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeechError {
    #[error("Speech capture is not supported in this environment")]
    Unsupported,
    #[error("Speech capture is not listening")]
    NotListening,
    #[error("Speech capture failed: {0}")]
    Failed(String),
}

/// Speech-to-text capture
///
/// `start` and `stop` are idempotent. `transcript` returns the latest
/// recognized text, which may be empty.
#[async_trait]
pub trait SpeechCapture: Send + Sync {
    async fn start(&self) -> Result<(), SpeechError>;

    async fn stop(&self);

    async fn transcript(&self) -> String;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

impl<T: Navigator + ?Sized> Navigator for Arc<T> {
    fn navigate_to(&self, path: &str) {
        (**self).navigate_to(path);
    }
}

#[async_trait]
impl<T: SpeechCapture + ?Sized> SpeechCapture for Arc<T> {
    async fn start(&self) -> Result<(), SpeechError> {
        (**self).start().await
    }

    async fn stop(&self) {
        (**self).stop().await;
    }

    async fn transcript(&self) -> String {
        (**self).transcript().await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Delivers navigation to connected browsers as a `navigate` stream event
#[derive(Clone)]
pub struct BroadcastNavigator {
    broadcast_tx: broadcast::Sender<WidgetEvent>,
}

impl BroadcastNavigator {
    pub fn new(broadcast_tx: broadcast::Sender<WidgetEvent>) -> Self {
        Self { broadcast_tx }
    }
}

impl Navigator for BroadcastNavigator {
    fn navigate_to(&self, path: &str) {
        // No subscribers just means nobody is watching the widget right now
        if self
            .broadcast_tx
            .send(WidgetEvent::Navigate {
                path: path.to_string(),
            })
            .is_err()
        {
            tracing::debug!(path = %path, "Navigation dropped, no stream subscribers");
        }
    }
}

/// Capture fed by the browser: recognition runs client-side and the
/// resulting text is pushed in over HTTP.
pub struct ClientSpeechCapture {
    supported: bool,
    listening: AtomicBool,
    transcript: Mutex<String>,
}

impl ClientSpeechCapture {
    pub fn new(supported: bool) -> Self {
        Self {
            supported,
            listening: AtomicBool::new(false),
            transcript: Mutex::new(String::new()),
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    /// Store the latest recognized text
    pub async fn push_transcript(&self, text: impl Into<String>) -> Result<(), SpeechError> {
        if !self.supported {
            return Err(SpeechError::Unsupported);
        }
        if !self.is_listening() {
            return Err(SpeechError::NotListening);
        }
        *self.transcript.lock().await = text.into();
        Ok(())
    }
}

#[async_trait]
impl SpeechCapture for ClientSpeechCapture {
    async fn start(&self) -> Result<(), SpeechError> {
        if !self.supported {
            return Err(SpeechError::Unsupported);
        }
        if !self.listening.swap(true, Ordering::SeqCst) {
            // Fresh capture session
            self.transcript.lock().await.clear();
        }
        Ok(())
    }

    async fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    async fn transcript(&self) -> String {
        self.transcript.lock().await.clone()
    }
}
