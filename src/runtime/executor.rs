//! Widget engine executor
//!
//! Owns all mutable conversation state on a single task. Events arrive over
//! an mpsc channel, run through the pure `transition` function, and the
//! resulting effects are executed here.

use super::traits::{Navigator, SpeechCapture};
use super::WidgetEvent;

use crate::context::ContextCarrier;
use crate::dispatch::{DispatchRequest, ReplyBackend};
use crate::scheduler::RedirectScheduler;
use crate::state_machine::{
    transition, ConvContext, ConvState, Effect, Event, Phase, TransitionError,
};
use crate::transcript::{TranscriptStore, Turn, TurnId, Vote};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

/// Errors surfaced to callers of a `WidgetHandle`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("The widget engine has shut down")]
    Closed,
    #[error(transparent)]
    Rejected(#[from] TransitionError),
}

/// An event plus an optional acknowledgement channel
struct Envelope {
    event: Event,
    ack: Option<oneshot::Sender<Result<(), TransitionError>>>,
}

impl Envelope {
    fn detached(event: Event) -> Self {
        Self { event, ack: None }
    }
}

/// Outward-facing widget status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WidgetStatus {
    pub visible: bool,
    pub pending: bool,
    pub phase: Phase,
    pub draft: String,
    pub listening: bool,
    pub notice: Option<String>,
    pub disposed: bool,
}

impl WidgetStatus {
    fn from_state(state: &ConvState) -> Self {
        Self {
            visible: state.visible,
            pending: state.is_pending(),
            phase: state.phase(),
            draft: state.draft.clone(),
            listening: state.listening,
            notice: state.notice.map(|n| n.message().to_string()),
            disposed: state.disposed,
        }
    }
}

/// Full read model of a widget, refreshed after every event
#[derive(Debug, Clone, Serialize)]
pub struct WidgetSnapshot {
    pub session_id: String,
    #[serde(flatten)]
    pub status: WidgetStatus,
    pub context: Option<Value>,
    pub redirect_armed: Option<String>,
    pub turns: Vec<Turn>,
}

/// Widget engine bound to concrete backend, navigation and speech capabilities
pub struct ConversationRuntime<B, N, S>
where
    B: ReplyBackend + ?Sized + 'static,
    N: Navigator + ?Sized + 'static,
    S: SpeechCapture + ?Sized + 'static,
{
    context: ConvContext,
    state: ConvState,
    transcript: TranscriptStore,
    carrier: ContextCarrier,
    scheduler: RedirectScheduler,
    backend: Arc<B>,
    navigator: Arc<N>,
    speech: Arc<S>,
    event_rx: mpsc::Receiver<Envelope>,
    /// Weak so that dropping every handle ends the loop
    event_tx: mpsc::WeakSender<Envelope>,
    broadcast_tx: broadcast::Sender<WidgetEvent>,
    snapshot_tx: watch::Sender<WidgetSnapshot>,
    /// Token to abort the outstanding remote request
    reply_cancel: Option<CancellationToken>,
}

impl<B, N, S> ConversationRuntime<B, N, S>
where
    B: ReplyBackend + ?Sized + 'static,
    N: Navigator + ?Sized + 'static,
    S: SpeechCapture + ?Sized + 'static,
{
    pub async fn run(mut self) {
        tracing::info!(session_id = %self.context.session_id, "Starting widget engine");

        while let Some(Envelope { event, ack }) = self.event_rx.recv().await {
            let result = self.process_event(event).await;
            if let Err(e) = &result {
                self.report_refusal(e);
            }
            self.publish_snapshot();
            if let Some(ack) = ack {
                let _ = ack.send(result);
            }
            if self.state.disposed {
                break;
            }
        }

        // Covers the case where every handle was dropped without disposing
        if let Some(token) = self.reply_cancel.take() {
            token.cancel();
        }
        self.scheduler.cancel();
        if self.state.listening {
            self.speech.stop().await;
        }

        tracing::info!(session_id = %self.context.session_id, "Widget engine stopped");
    }

    async fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        // Effects may feed events back (e.g. reading the speech transcript)
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            self.log_failure(&current_event);
            let result = transition(&self.state, &self.context, current_event)?;

            let old_state = std::mem::replace(&mut self.state, result.new_state);
            if old_state != self.state {
                let status = WidgetStatus::from_state(&self.state);
                let state = serde_json::to_value(&status).unwrap_or(Value::Null);
                let _ = self.broadcast_tx.send(WidgetEvent::StateChange { state });
            }

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(effect).await {
                    events_to_process.push(generated_event);
                }
            }
        }

        Ok(())
    }

    /// Failures are swallowed by the state machine; record the cause here
    fn log_failure(&self, event: &Event) {
        match event {
            Event::ReplyFailed {
                request_id,
                message,
                error_kind,
            } => {
                tracing::error!(
                    session_id = %self.context.session_id,
                    request_id = request_id,
                    error = %message,
                    kind = ?error_kind,
                    backend_fault = error_kind.is_backend_fault(),
                    "Remote dispatch failed, replying with apology"
                );
            }
            Event::CaptureFailed { error } => {
                tracing::warn!(
                    session_id = %self.context.session_id,
                    error = %error,
                    "Speech capture failed to start"
                );
            }
            _ => {}
        }
    }

    fn report_refusal(&self, error: &TransitionError) {
        match error {
            TransitionError::StaleReply(request_id) => {
                tracing::debug!(
                    session_id = %self.context.session_id,
                    request_id = request_id,
                    "Discarding stale reply"
                );
            }
            _ => {
                tracing::warn!(
                    session_id = %self.context.session_id,
                    error = %error,
                    "Event refused"
                );
                let _ = self.broadcast_tx.send(WidgetEvent::Error {
                    message: error.to_string(),
                });
            }
        }
    }

    fn publish_snapshot(&self) {
        let snapshot = WidgetSnapshot {
            session_id: self.context.session_id.clone(),
            status: WidgetStatus::from_state(&self.state),
            context: self.carrier.current().cloned(),
            redirect_armed: self.scheduler.armed_path().map(str::to_string),
            turns: self.transcript.turns().to_vec(),
        };
        self.snapshot_tx.send_replace(snapshot);
    }

    /// Execute an effect and optionally return a generated event
    async fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::AppendTurn { turn } => {
                let turn = self.transcript.append(turn).clone();
                tracing::debug!(
                    session_id = %self.context.session_id,
                    turn_id = %turn.id,
                    role = ?turn.role,
                    turns = self.transcript.turns().len(),
                    "Turn appended"
                );
                let _ = self.broadcast_tx.send(WidgetEvent::Turn { turn });
                None
            }

            Effect::RecordFeedback { turn_id, vote } => {
                self.record_feedback(&turn_id, vote);
                None
            }

            Effect::RequestReply {
                request_id,
                message,
            } => {
                self.spawn_reply_request(request_id, message);
                None
            }

            Effect::AbortReply => {
                if let Some(token) = self.reply_cancel.take() {
                    token.cancel();
                }
                None
            }

            Effect::MergeContext { context } => {
                if self.carrier.merge(Some(context)) {
                    tracing::debug!(session_id = %self.context.session_id, "Context replaced");
                }
                None
            }

            Effect::ScheduleRedirect { path, delay } => {
                self.scheduler.schedule(path, delay, self.navigator.clone());
                None
            }

            Effect::CancelRedirect => {
                self.scheduler.cancel();
                None
            }

            Effect::StartCapture => match self.speech.start().await {
                Ok(()) => None,
                Err(error) => Some(Event::CaptureFailed { error }),
            },

            Effect::StopCapture => {
                self.speech.stop().await;
                None
            }

            Effect::ReadTranscript => {
                let text = self.speech.transcript().await;
                if text.trim().is_empty() {
                    tracing::debug!(session_id = %self.context.session_id, "Transcript empty, nothing to use");
                    None
                } else {
                    Some(Event::TranscriptUpdated { text })
                }
            }
        }
    }

    fn record_feedback(&mut self, turn_id: &TurnId, vote: Vote) {
        let outcome = self.transcript.set_feedback(turn_id, vote);
        if !outcome.is_recorded() {
            tracing::debug!(
                session_id = %self.context.session_id,
                turn_id = %turn_id,
                outcome = ?outcome,
                "Feedback ignored"
            );
            return;
        }

        tracing::info!(
            session_id = %self.context.session_id,
            turn_id = %turn_id,
            vote = ?vote,
            "Feedback recorded"
        );
        if let Some(turn) = self.transcript.get(turn_id) {
            let _ = self
                .broadcast_tx
                .send(WidgetEvent::TurnUpdated { turn: turn.clone() });
        }
    }

    /// Dispatch to the backend as a background task so the engine keeps
    /// handling events (close, listening, dispose) while the reply is pending.
    fn spawn_reply_request(&mut self, request_id: u64, message: String) {
        let cancel_token = CancellationToken::new();
        if let Some(previous) = self.reply_cancel.replace(cancel_token.clone()) {
            previous.cancel();
        }

        let request = DispatchRequest {
            message,
            context: self.carrier.current().cloned(),
        };
        let backend = self.backend.clone();
        let event_tx = self.event_tx.clone();
        let session_id = self.context.session_id.clone();

        tokio::spawn(async move {
            tracing::info!(session_id = %session_id, request_id = request_id, "Dispatching to remote backend");

            tokio::select! {
                biased;

                () = cancel_token.cancelled() => {
                    tracing::info!(session_id = %session_id, request_id = request_id, "Remote dispatch aborted");
                }

                result = backend.dispatch(&request) => {
                    let event = match result {
                        Ok(response) => Event::ReplyReceived {
                            request_id,
                            reply: response.reply,
                            redirect: response.redirect,
                            context: response.context,
                        },
                        Err(e) => Event::ReplyFailed {
                            request_id,
                            message: e.message,
                            error_kind: e.kind,
                        },
                    };

                    // Aborted while the backend was answering
                    if cancel_token.is_cancelled() {
                        return;
                    }
                    match event_tx.upgrade() {
                        Some(tx) => {
                            if tx.send(Envelope::detached(event)).await.is_err() {
                                tracing::debug!(session_id = %session_id, "Engine stopped, reply discarded");
                            }
                        }
                        None => {
                            tracing::debug!(session_id = %session_id, "Engine gone, reply discarded");
                        }
                    }
                }
            }
        });
    }
}

/// Handle to interact with a running widget engine
#[derive(Clone)]
pub struct WidgetHandle {
    session_id: String,
    event_tx: mpsc::Sender<Envelope>,
    broadcast_tx: broadcast::Sender<WidgetEvent>,
    snapshot_rx: watch::Receiver<WidgetSnapshot>,
}

impl WidgetHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Number of attached event stream subscribers
    pub fn stream_count(&self) -> usize {
        self.broadcast_tx.receiver_count()
    }

    /// Deliver an event and wait until the engine has applied it
    pub async fn send(&self, event: Event) -> Result<(), EngineError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.event_tx
            .send(Envelope {
                event,
                ack: Some(ack_tx),
            })
            .await
            .map_err(|_| EngineError::Closed)?;
        ack_rx.await.map_err(|_| EngineError::Closed)??;
        Ok(())
    }

    pub async fn open(&self) -> Result<(), EngineError> {
        self.send(Event::Open).await
    }

    pub async fn close(&self) -> Result<(), EngineError> {
        self.send(Event::Close).await
    }

    pub async fn toggle(&self) -> Result<(), EngineError> {
        self.send(Event::Toggle).await
    }

    pub async fn outside_click(&self) -> Result<(), EngineError> {
        self.send(Event::OutsideClick).await
    }

    pub async fn set_draft(&self, text: impl Into<String>) -> Result<(), EngineError> {
        self.send(Event::DraftChanged { text: text.into() }).await
    }

    pub async fn send_message(&self, text: impl Into<String>) -> Result<(), EngineError> {
        self.send(Event::UserMessage { text: text.into() }).await
    }

    /// Send the current input buffer
    pub async fn submit(&self) -> Result<(), EngineError> {
        self.send(Event::Submit).await
    }

    pub async fn feedback(&self, turn_id: TurnId, vote: Vote) -> Result<(), EngineError> {
        self.send(Event::Feedback { turn_id, vote }).await
    }

    pub async fn start_listening(&self) -> Result<(), EngineError> {
        self.send(Event::StartListening).await
    }

    pub async fn stop_listening(&self) -> Result<(), EngineError> {
        self.send(Event::StopListening).await
    }

    /// Copy the capture transcript into the input buffer
    pub async fn use_transcript(&self) -> Result<(), EngineError> {
        self.send(Event::UseTranscript).await
    }

    /// Tear the engine down. Disposing twice is a no-op.
    pub async fn dispose(&self) -> Result<(), EngineError> {
        match self.send(Event::Dispose).await {
            Err(EngineError::Closed | EngineError::Rejected(TransitionError::Disposed)) => Ok(()),
            other => other,
        }
    }

    pub fn snapshot(&self) -> WidgetSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver that observes every snapshot refresh
    #[cfg(test)]
    pub fn watch(&self) -> watch::Receiver<WidgetSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.broadcast_tx.subscribe()
    }
}

/// Start a widget engine on its own task and return a handle to it.
///
/// `broadcast_tx` is taken from the caller so capabilities such as
/// `BroadcastNavigator` can share the stream.
pub fn spawn_engine<B, N, S>(
    context: ConvContext,
    backend: Arc<B>,
    navigator: Arc<N>,
    speech: Arc<S>,
    broadcast_tx: broadcast::Sender<WidgetEvent>,
) -> WidgetHandle
where
    B: ReplyBackend + ?Sized + 'static,
    N: Navigator + ?Sized + 'static,
    S: SpeechCapture + ?Sized + 'static,
{
    let (event_tx, event_rx) = mpsc::channel(32);
    let session_id = context.session_id.clone();
    let state = ConvState::default();

    let (snapshot_tx, snapshot_rx) = watch::channel(WidgetSnapshot {
        session_id: session_id.clone(),
        status: WidgetStatus::from_state(&state),
        context: None,
        redirect_armed: None,
        turns: Vec::new(),
    });

    let runtime = ConversationRuntime {
        context,
        state,
        transcript: TranscriptStore::new(),
        carrier: ContextCarrier::new(),
        scheduler: RedirectScheduler::new(),
        backend,
        navigator,
        speech,
        event_rx,
        event_tx: event_tx.downgrade(),
        broadcast_tx: broadcast_tx.clone(),
        snapshot_tx,
        reply_cancel: None,
    };

    tokio::spawn(runtime.run());

    WidgetHandle {
        session_id,
        event_tx,
        broadcast_tx,
        snapshot_rx,
    }
}
