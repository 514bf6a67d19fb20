//! Events that can occur in a widget session

use crate::dispatch::DispatchErrorKind;
use crate::runtime::SpeechError;
use crate::transcript::{TurnId, Vote};
use serde_json::Value;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Visibility
    Open,
    Close,
    /// External trigger button
    Toggle,
    OutsideClick,

    // Input
    DraftChanged {
        text: String,
    },
    UserMessage {
        text: String,
    },
    /// Send whatever is in the input buffer
    Submit,

    // Remote dispatch
    ReplyReceived {
        request_id: u64,
        reply: String,
        redirect: Option<String>,
        context: Option<Value>,
    },
    ReplyFailed {
        request_id: u64,
        message: String,
        error_kind: DispatchErrorKind,
    },

    Feedback {
        turn_id: TurnId,
        vote: Vote,
    },

    // Speech capture
    StartListening,
    StopListening,
    TranscriptUpdated {
        text: String,
    },
    UseTranscript,
    CaptureFailed {
        error: SpeechError,
    },

    Dispose,
}
