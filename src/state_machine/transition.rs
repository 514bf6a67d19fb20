//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same
//! new state and effects; all I/O happens when the runtime executes the
//! effects.

use super::{ConvContext, ConvState, DispatchState, Effect, Event, Notice};
use crate::router::{welcome_messages, Route, APOLOGY_REPLY};
use crate::runtime::SpeechError;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("The widget is closed; open it before sending")]
    WidgetHidden,
    #[error("Still waiting for the previous reply")]
    ReplyPending,
    #[error("Reply for request {0} is no longer expected")]
    StaleReply(u64),
    #[error("The widget has been disposed")]
    Disposed,
}

/// Pure transition function
pub fn transition(
    state: &ConvState,
    context: &ConvContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    if state.disposed {
        return Err(TransitionError::Disposed);
    }

    match event {
        // ============================================================
        // Visibility
        // ============================================================
        Event::Open => Ok(open(state, context)),

        Event::Close | Event::OutsideClick => Ok(close(state)),

        Event::Toggle => {
            if state.visible {
                Ok(close(state))
            } else {
                Ok(open(state, context))
            }
        }

        // ============================================================
        // Input
        // ============================================================
        Event::DraftChanged { text } => {
            if !state.is_editable() {
                return Err(TransitionError::WidgetHidden);
            }
            let mut next = state.clone();
            next.draft = text;
            Ok(TransitionResult::new(next))
        }

        Event::UserMessage { text } => send(state, context, &text),

        Event::Submit => send(state, context, &state.draft),

        // ============================================================
        // Remote dispatch resolution
        // ============================================================
        Event::ReplyReceived {
            request_id,
            reply,
            redirect,
            context: reply_context,
        } => {
            expect_pending(state, request_id)?;
            let mut next = state.clone();
            next.dispatch = DispatchState::Ready;

            let reply = reply.trim();
            if reply.is_empty() {
                // A turn needs text; treat a blank reply like a failure
                return Ok(TransitionResult::new(next)
                    .with_effect(Effect::append_assistant(APOLOGY_REPLY, None)));
            }

            let redirect = redirect
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty());

            let mut result = TransitionResult::new(next);
            if let Some(reply_context) = reply_context {
                result = result.with_effect(Effect::MergeContext {
                    context: reply_context,
                });
            }
            result = result.with_effect(Effect::append_assistant(reply, redirect.clone()));
            // A hidden widget keeps the turn but never navigates
            if let Some(path) = redirect.filter(|_| state.visible) {
                result = result.with_effect(Effect::schedule_redirect(path, context.redirect_delay));
            }
            Ok(result)
        }

        Event::ReplyFailed { request_id, .. } => {
            expect_pending(state, request_id)?;
            let mut next = state.clone();
            next.dispatch = DispatchState::Ready;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::append_assistant(APOLOGY_REPLY, None)))
        }

        // ============================================================
        // Feedback
        // ============================================================
        Event::Feedback { turn_id, vote } => Ok(TransitionResult::new(state.clone())
            .with_effect(Effect::RecordFeedback { turn_id, vote })),

        // ============================================================
        // Speech capture
        // ============================================================
        Event::StartListening => {
            if !state.is_editable() {
                return Err(TransitionError::WidgetHidden);
            }
            let mut next = state.clone();
            if !context.speech_supported {
                next.notice = Some(Notice::SpeechUnsupported);
                return Ok(TransitionResult::new(next));
            }
            if state.listening {
                return Ok(TransitionResult::new(next));
            }
            next.listening = true;
            Ok(TransitionResult::new(next).with_effect(Effect::StartCapture))
        }

        Event::StopListening => {
            if !state.listening {
                return Ok(TransitionResult::new(state.clone()));
            }
            let mut next = state.clone();
            next.listening = false;
            Ok(TransitionResult::new(next).with_effect(Effect::StopCapture))
        }

        // Populates the input buffer; never sends
        Event::TranscriptUpdated { text } => {
            if !state.is_editable() {
                return Err(TransitionError::WidgetHidden);
            }
            let mut next = state.clone();
            next.draft = text;
            Ok(TransitionResult::new(next))
        }

        Event::UseTranscript => {
            if !state.is_editable() {
                return Err(TransitionError::WidgetHidden);
            }
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::ReadTranscript))
        }

        Event::CaptureFailed { error } => {
            let mut next = state.clone();
            next.listening = false;
            if error == SpeechError::Unsupported {
                next.notice = Some(Notice::SpeechUnsupported);
            }
            Ok(TransitionResult::new(next))
        }

        // ============================================================
        // Teardown
        // ============================================================
        Event::Dispose => Ok(dispose(state)),
    }
}

fn open(state: &ConvState, context: &ConvContext) -> TransitionResult {
    if state.visible {
        return TransitionResult::new(state.clone());
    }

    let mut next = state.clone();
    next.visible = true;
    if state.welcomed {
        return TransitionResult::new(next);
    }

    next.welcomed = true;
    let [first, second] = welcome_messages(&context.company_name);
    TransitionResult::new(next).with_effects([
        Effect::append_assistant(first, None),
        Effect::append_assistant(second, None),
    ])
}

/// Hide the widget and disarm any pending navigation. An in-flight
/// request stays alive so its reply still lands in the transcript.
fn close(state: &ConvState) -> TransitionResult {
    if !state.visible {
        return TransitionResult::new(state.clone());
    }

    let mut next = state.clone();
    next.visible = false;
    let mut result = TransitionResult::new(next).with_effect(Effect::CancelRedirect);
    if state.listening {
        result.new_state.listening = false;
        result = result.with_effect(Effect::StopCapture);
    }
    result
}

fn send(
    state: &ConvState,
    context: &ConvContext,
    raw: &str,
) -> Result<TransitionResult, TransitionError> {
    let utterance = raw.trim();
    if utterance.is_empty() {
        // Silently rejected: no turn, no pending
        return Ok(TransitionResult::new(state.clone()));
    }
    if !state.visible {
        return Err(TransitionError::WidgetHidden);
    }
    if state.is_pending() {
        return Err(TransitionError::ReplyPending);
    }

    let mut next = state.clone();
    next.draft.clear();
    next.engaged = true;

    match context.router.route(utterance) {
        Route::Local { reply, .. } => {
            let mut result = TransitionResult::new(next)
                .with_effect(Effect::append_user(utterance))
                .with_effect(Effect::append_assistant(reply.text, reply.redirect.clone()));
            if let Some(path) = reply.redirect {
                result = result.with_effect(Effect::schedule_redirect(path, context.redirect_delay));
            }
            Ok(result)
        }
        Route::Remote { message } => {
            let request_id = state.request_seq + 1;
            next.request_seq = request_id;
            next.dispatch = DispatchState::Pending { request_id };
            Ok(TransitionResult::new(next)
                .with_effect(Effect::append_user(utterance))
                .with_effect(Effect::RequestReply {
                    request_id,
                    message,
                }))
        }
    }
}

fn expect_pending(state: &ConvState, request_id: u64) -> Result<(), TransitionError> {
    match state.dispatch {
        DispatchState::Pending { request_id: pending } if pending == request_id => Ok(()),
        _ => Err(TransitionError::StaleReply(request_id)),
    }
}

/// Tear down: cancel the in-flight request and the armed redirect
fn dispose(state: &ConvState) -> TransitionResult {
    let mut next = state.clone();
    next.disposed = true;
    next.visible = false;
    next.listening = false;
    next.dispatch = DispatchState::Ready;

    let mut result = TransitionResult::new(next);
    if state.is_pending() {
        result = result.with_effect(Effect::AbortReply);
    }
    result = result.with_effect(Effect::CancelRedirect);
    if state.listening {
        result = result.with_effect(Effect::StopCapture);
    }
    result
}
