//! Transcript store
//!
//! Append-only log of conversation turns. Insertion order is display order;
//! turns are never reordered, edited or deleted. The only mutable field is
//! the feedback vote on assistant turns, which can be set exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier for a turn
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(String);

impl TurnId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl From<String> for TurnId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
impl From<&str> for TurnId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Feedback vote on an assistant turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    Helpful,
    Unhelpful,
}

/// One message unit in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub role: Role,
    pub text: String,
    /// Navigation target attached to an assistant reply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Vote>,
    pub created_at: DateTime<Utc>,
}

/// A turn that has not been appended yet.
///
/// Effects carry drafts so the pure transition function never has to mint
/// identifiers or read the clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnDraft {
    pub role: Role,
    pub text: String,
    pub redirect: Option<String>,
}

impl TurnDraft {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            redirect: None,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            redirect: None,
        }
    }

    pub fn with_redirect(mut self, redirect: Option<String>) -> Self {
        // Redirects only ride on assistant replies
        if self.role == Role::Assistant {
            self.redirect = redirect;
        }
        self
    }
}

/// Result of a feedback update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackOutcome {
    Recorded,
    /// A vote was already recorded; the first vote is kept
    AlreadyRecorded,
    /// User turns never carry feedback
    NotAssistant,
    NotFound,
}

impl FeedbackOutcome {
    pub fn is_recorded(self) -> bool {
        matches!(self, FeedbackOutcome::Recorded)
    }
}

/// Ordered, append-only turn log
#[derive(Debug, Default, Clone)]
pub struct TranscriptStore {
    turns: Vec<Turn>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn to the end of the log
    pub fn append(&mut self, draft: TurnDraft) -> &Turn {
        let turn = Turn {
            id: TurnId::generate(),
            role: draft.role,
            text: draft.text,
            redirect: draft.redirect,
            feedback: None,
            created_at: Utc::now(),
        };
        self.turns.push(turn);
        &self.turns[self.turns.len() - 1]
    }

    /// Record a vote on an assistant turn.
    ///
    /// Only the first vote sticks; repeated calls are no-ops.
    pub fn set_feedback(&mut self, turn_id: &TurnId, vote: Vote) -> FeedbackOutcome {
        let Some(turn) = self.turns.iter_mut().find(|t| &t.id == turn_id) else {
            return FeedbackOutcome::NotFound;
        };
        if turn.role != Role::Assistant {
            return FeedbackOutcome::NotAssistant;
        }
        if turn.feedback.is_some() {
            return FeedbackOutcome::AlreadyRecorded;
        }
        turn.feedback = Some(vote);
        FeedbackOutcome::Recorded
    }

    pub fn get(&self, turn_id: &TurnId) -> Option<&Turn> {
        self.turns.iter().find(|t| &t.id == turn_id)
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }
}
