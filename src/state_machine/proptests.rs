//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::transition::*;
use super::*;
use crate::dispatch::DispatchErrorKind;
use crate::router::{classify, ContactInfo, Intent, IntentRouter};
use crate::runtime::SpeechError;
use crate::transcript::{Role, TurnId, Vote};
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> ConvContext {
    let router = IntentRouter::new(
        ContactInfo {
            phone: "+1 555 0100".to_string(),
            email: "help@example.com".to_string(),
            address: "1 Market St".to_string(),
        },
        "/products",
    );
    ConvContext::new("test-session", "Acme", router)
}

fn welcome_count(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|e| match e {
            Effect::AppendTurn { turn } => {
                turn.role == Role::Assistant && turn.text.contains("Welcome to")
            }
            _ => false,
        })
        .count()
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_utterance() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("hello".to_string()),
        Just("what is your phone number".to_string()),
        Just("show me the products".to_string()),
        Just("where is my order".to_string()),
        Just("   ".to_string()),
        "[a-z ]{0,30}",
    ]
}

fn arb_error_kind() -> impl Strategy<Value = DispatchErrorKind> {
    prop_oneof![
        Just(DispatchErrorKind::Network),
        Just(DispatchErrorKind::Timeout),
        Just(DispatchErrorKind::RateLimit),
        Just(DispatchErrorKind::ServerError),
        Just(DispatchErrorKind::InvalidResponse),
        Just(DispatchErrorKind::Unavailable),
    ]
}

fn arb_reply_event() -> impl Strategy<Value = Event> {
    (
        1u64..5,
        "[a-zA-Z ]{0,20}",
        proptest::option::of(prop_oneof![Just("/deals".to_string()), Just(" ".to_string())]),
        any::<bool>(),
    )
        .prop_map(|(request_id, reply, redirect, with_context)| Event::ReplyReceived {
            request_id,
            reply,
            redirect,
            context: with_context.then(|| json!({"step": request_id})),
        })
}

fn arb_failure_event() -> impl Strategy<Value = Event> {
    (1u64..5, arb_error_kind()).prop_map(|(request_id, error_kind)| Event::ReplyFailed {
        request_id,
        message: "failed".to_string(),
        error_kind,
    })
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::Open),
        Just(Event::Close),
        Just(Event::Toggle),
        Just(Event::OutsideClick),
        arb_utterance().prop_map(|text| Event::DraftChanged { text }),
        arb_utterance().prop_map(|text| Event::UserMessage { text }),
        Just(Event::Submit),
        arb_reply_event(),
        arb_failure_event(),
        Just(Event::Feedback {
            turn_id: TurnId::from("t-1"),
            vote: Vote::Helpful,
        }),
        Just(Event::StartListening),
        Just(Event::StopListening),
        arb_utterance().prop_map(|text| Event::TranscriptUpdated { text }),
        Just(Event::UseTranscript),
        prop_oneof![
            Just(SpeechError::Unsupported),
            Just(SpeechError::Failed("microphone busy".to_string())),
        ]
        .prop_map(|error| Event::CaptureFailed { error }),
    ]
}

fn arb_state() -> impl Strategy<Value = ConvState> {
    (
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        proptest::option::of(1u64..5),
        arb_utterance(),
    )
        .prop_map(|(visible, engaged, listening, pending, draft)| ConvState {
            visible,
            welcomed: true,
            engaged,
            listening,
            draft,
            request_seq: pending.unwrap_or(0),
            dispatch: pending.map_or(DispatchState::Ready, |request_id| DispatchState::Pending {
                request_id,
            }),
            ..ConvState::default()
        })
}

// ============================================================================
// State Validity Checkers
// ============================================================================

fn is_valid_state(state: &ConvState) -> bool {
    if state.disposed {
        return !state.visible && !state.listening && !state.is_pending();
    }
    match state.dispatch {
        // The pending id is always the latest issued
        DispatchState::Pending { request_id } => request_id == state.request_seq,
        DispatchState::Ready => true,
    }
}

fn effects_are_valid(effects: &[Effect], old: &ConvState, new: &ConvState) -> bool {
    for effect in effects {
        match effect {
            Effect::RequestReply { request_id, .. } => {
                if new.dispatch != (DispatchState::Pending { request_id: *request_id }) {
                    return false;
                }
                if old.is_pending() {
                    return false;
                }
            }
            Effect::StartCapture => {
                if !new.listening {
                    return false;
                }
            }
            Effect::ScheduleRedirect { .. } => {
                if !new.visible {
                    return false;
                }
            }
            Effect::AppendTurn { turn } => {
                if turn.text.trim().is_empty() {
                    return false;
                }
                if turn.redirect.is_some() && turn.role == Role::User {
                    return false;
                }
            }
            _ => {}
        }
    }
    true
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Any sequence of events keeps the state valid and effects consistent
    #[test]
    fn prop_transitions_preserve_validity(events in proptest::collection::vec(arb_event(), 0..25)) {
        let ctx = test_context();
        let mut state = ConvState::default();
        let mut welcomes = 0;

        for event in events {
            match transition(&state, &ctx, event) {
                Ok(result) => {
                    prop_assert!(is_valid_state(&result.new_state), "Invalid state: {:?}", result.new_state);
                    prop_assert!(
                        effects_are_valid(&result.effects, &state, &result.new_state),
                        "Invalid effects {:?} from {:?}", result.effects, state
                    );
                    welcomes += welcome_count(&result.effects);
                    state = result.new_state;
                }
                Err(_) => {
                    // Rejected events leave the state untouched
                }
            }
        }

        prop_assert!(welcomes <= 1, "Welcome synthesized {} times", welcomes);
    }

    /// Whitespace-only input is a silent no-op in every state
    #[test]
    fn prop_blank_input_is_noop(state in arb_state(), text in "[ \t\n]{0,8}") {
        let result = transition(&state, &test_context(), Event::UserMessage { text });
        let result = result.expect("blank input must not error");
        prop_assert_eq!(&result.new_state, &state);
        prop_assert!(result.effects.is_empty());
    }

    /// A second send is refused while a reply is pending
    #[test]
    fn prop_pending_rejects_messages(request_id in 1u64..100, text in "[a-z]{1,20}") {
        let state = ConvState {
            visible: true,
            welcomed: true,
            request_seq: request_id,
            dispatch: DispatchState::Pending { request_id },
            ..ConvState::default()
        };
        let result = transition(&state, &test_context(), Event::UserMessage { text });
        prop_assert!(matches!(result, Err(TransitionError::ReplyPending)));
    }

    /// Local intents resolve in one step and never enter pending
    #[test]
    fn prop_local_intents_never_pend(text in arb_utterance()) {
        prop_assume!(!text.trim().is_empty());
        let state = ConvState { visible: true, welcomed: true, ..ConvState::default() };
        let result = transition(&state, &test_context(), Event::UserMessage { text: text.clone() }).unwrap();

        if classify(&text) != Intent::Remote {
            prop_assert!(!result.new_state.is_pending());
            prop_assert!(
                !result.effects.iter().any(|e| matches!(e, Effect::RequestReply { .. })),
                "local intent dispatched remotely: {:?}",
                result.effects
            );
        } else {
            prop_assert!(result.new_state.is_pending());
        }
    }

    /// Only the reply for the outstanding request is accepted
    #[test]
    fn prop_mismatched_reply_is_stale(pending in 1u64..50, other in 1u64..50) {
        prop_assume!(pending != other);
        let state = ConvState {
            visible: true,
            welcomed: true,
            request_seq: pending,
            dispatch: DispatchState::Pending { request_id: pending },
            ..ConvState::default()
        };
        let result = transition(&state, &test_context(), Event::ReplyReceived {
            request_id: other,
            reply: "late".to_string(),
            redirect: None,
            context: None,
        });
        prop_assert!(matches!(result, Err(TransitionError::StaleReply(id)) if id == other));
    }

    /// A resolved request always returns to Ready and appends exactly one turn
    #[test]
    fn prop_resolution_returns_to_ready(state in arb_state(), event in prop_oneof![arb_reply_event(), arb_failure_event()]) {
        if let Ok(result) = transition(&state, &test_context(), event) {
            prop_assert!(!result.new_state.is_pending());
            let appended = result.effects.iter().filter(|e| matches!(e, Effect::AppendTurn { .. })).count();
            prop_assert_eq!(appended, 1);
        }
    }

    /// Dispose is terminal
    #[test]
    fn prop_disposed_rejects_everything(state in arb_state(), event in arb_event()) {
        let disposed = transition(&state, &test_context(), Event::Dispose).unwrap();
        prop_assert!(disposed.new_state.disposed);
        prop_assert!(disposed.effects.contains(&Effect::CancelRedirect));

        let result = transition(&disposed.new_state, &test_context(), event);
        prop_assert!(matches!(result, Err(TransitionError::Disposed)));
    }
}
