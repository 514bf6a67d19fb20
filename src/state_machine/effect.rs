//! Effects produced by state transitions

use crate::transcript::{TurnDraft, TurnId, Vote};
use serde_json::Value;
use std::time::Duration;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append a turn to the transcript
    AppendTurn { turn: TurnDraft },

    /// Record a feedback vote (the transcript enforces once-only)
    RecordFeedback { turn_id: TurnId, vote: Vote },

    /// Dispatch the utterance to the remote backend (spawns as background task)
    RequestReply { request_id: u64, message: String },

    /// Abort the in-flight remote request; its reply is discarded
    AbortReply,

    /// Replace the carried context
    MergeContext { context: Value },

    /// Arm a delayed navigation
    ScheduleRedirect { path: String, delay: Duration },

    /// Disarm the delayed navigation
    CancelRedirect,

    StartCapture,
    StopCapture,

    /// Read the capture transcript and feed it back as `TranscriptUpdated`
    ReadTranscript,
}

impl Effect {
    pub fn append_user(text: impl Into<String>) -> Self {
        Effect::AppendTurn {
            turn: TurnDraft::user(text),
        }
    }

    pub fn append_assistant(text: impl Into<String>, redirect: Option<String>) -> Self {
        Effect::AppendTurn {
            turn: TurnDraft::assistant(text).with_redirect(redirect),
        }
    }

    pub fn schedule_redirect(path: impl Into<String>, delay: Duration) -> Self {
        Effect::ScheduleRedirect {
            path: path.into(),
            delay,
        }
    }
}
