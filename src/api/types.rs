//! API request and response types

use crate::runtime::WidgetSnapshot;
use crate::transcript::Vote;
use serde::{Deserialize, Serialize};

/// Response for a newly created session
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub session: WidgetSnapshot,
}

/// Request to edit the input buffer
#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub text: String,
}

/// Request to send a message; without `text` the current draft is sent
#[derive(Debug, Default, Deserialize)]
pub struct MessageRequest {
    #[serde(default)]
    pub text: Option<String>,
}

/// Request to vote on an assistant turn
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub vote: Vote,
}

/// Request to start or stop speech capture
#[derive(Debug, Deserialize)]
pub struct ListeningRequest {
    pub listening: bool,
}

/// Transcript pushed by a browser doing client-side recognition
#[derive(Debug, Deserialize)]
pub struct TranscriptRequest {
    pub text: String,
}

/// Response for dispose
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
