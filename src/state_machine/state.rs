//! Widget state types

use crate::router::IntentRouter;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Remote dispatch bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchState {
    /// No remote request outstanding
    #[default]
    Ready,
    /// A remote request is in flight; only its reply is accepted
    Pending { request_id: u64 },
}

/// Coarse lifecycle phase derived from the state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Widget hidden
    Idle,
    /// Visible, only the welcome turns so far
    Greeting,
    /// Visible, the user has sent at least one message
    Active,
}

/// Persistent inline warning shown in the widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    SpeechUnsupported,
}

impl Notice {
    pub fn message(self) -> &'static str {
        match self {
            Notice::SpeechUnsupported => {
                "Voice input isn't available in this browser. You can still type your message."
            }
        }
    }
}

/// Widget state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConvState {
    pub visible: bool,
    pub dispatch: DispatchState,
    /// Welcome turns have been synthesized (once per engine instance)
    pub welcomed: bool,
    /// The user has sent at least one message
    pub engaged: bool,
    /// Input buffer
    pub draft: String,
    pub listening: bool,
    pub notice: Option<Notice>,
    /// Sequence for remote request ids
    pub request_seq: u64,
    /// Terminal: the engine has been torn down
    pub disposed: bool,
}

impl ConvState {
    pub fn is_pending(&self) -> bool {
        matches!(self.dispatch, DispatchState::Pending { .. })
    }

    /// Input can be edited while the widget is shown
    pub fn is_editable(&self) -> bool {
        self.visible && !self.disposed
    }

    pub fn phase(&self) -> Phase {
        if !self.visible {
            Phase::Idle
        } else if self.engaged {
            Phase::Active
        } else {
            Phase::Greeting
        }
    }
}

/// Default delay between a redirecting reply and the navigation it triggers
pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_millis(3500);

/// Context for a widget instance (immutable configuration)
#[derive(Debug, Clone)]
pub struct ConvContext {
    pub session_id: String,
    pub company_name: String,
    pub router: IntentRouter,
    pub redirect_delay: Duration,
    /// Whether the speech-capture capability exists in this environment
    pub speech_supported: bool,
}

impl ConvContext {
    pub fn new(
        session_id: impl Into<String>,
        company_name: impl Into<String>,
        router: IntentRouter,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            company_name: company_name.into(),
            router,
            redirect_delay: DEFAULT_REDIRECT_DELAY,
            speech_supported: true,
        }
    }

    pub fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay = delay;
        self
    }

    pub fn with_speech_supported(mut self, supported: bool) -> Self {
        self.speech_supported = supported;
        self
    }
}
