//! Remote dispatch
//!
//! Client side of the request/response contract with the natural-language
//! backend: `{ message, context }` in, `{ reply, redirect?, context? }` out.

mod error;
mod http;
mod types;

pub use error::{DispatchError, DispatchErrorKind};
pub use http::HttpBackend;
pub use types::{DispatchRequest, DispatchResponse};

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for chat backends
#[async_trait]
pub trait ReplyBackend: Send + Sync {
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchResponse, DispatchError>;
}

#[async_trait]
impl<T: ReplyBackend + ?Sized> ReplyBackend for Arc<T> {
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchResponse, DispatchError> {
        (**self).dispatch(request).await
    }
}

/// Backend used when no endpoint is configured; every dispatch fails fast
pub struct UnavailableBackend;

#[async_trait]
impl ReplyBackend for UnavailableBackend {
    async fn dispatch(&self, _request: &DispatchRequest) -> Result<DispatchResponse, DispatchError> {
        Err(DispatchError::unavailable("No chat backend configured"))
    }
}

/// Logging wrapper for reply backends
pub struct LoggingBackend {
    inner: Arc<dyn ReplyBackend>,
    label: String,
}

impl LoggingBackend {
    pub fn new(inner: Arc<dyn ReplyBackend>, label: impl Into<String>) -> Self {
        Self {
            inner,
            label: label.into(),
        }
    }
}

#[async_trait]
impl ReplyBackend for LoggingBackend {
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchResponse, DispatchError> {
        let start = std::time::Instant::now();
        let result = self.inner.dispatch(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    backend = %self.label,
                    duration_ms = %duration.as_millis(),
                    has_redirect = response.redirect.is_some(),
                    has_context = response.context.is_some(),
                    "Dispatch completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    backend = %self.label,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    backend_fault = e.kind.is_backend_fault(),
                    "Dispatch failed"
                );
            }
        }

        result
    }
}
