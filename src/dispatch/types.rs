//! Wire types for the remote dispatch contract

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request sent to the backend for every remote turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchRequest {
    pub message: String,
    /// Opaque context from the previous response, forwarded untouched
    pub context: Option<Value>,
}

/// Backend reply
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DispatchResponse {
    pub reply: String,
    #[serde(default)]
    pub redirect: Option<String>,
    #[serde(default)]
    pub context: Option<Value>,
}

#[cfg(test)]
impl DispatchResponse {
    pub fn text(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            redirect: None,
            context: None,
        }
    }

    pub fn with_redirect(mut self, path: impl Into<String>) -> Self {
        self.redirect = Some(path.into());
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}
