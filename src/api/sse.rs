//! Server-Sent Events support

use crate::runtime::{WidgetEvent, WidgetSnapshot};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert broadcast stream to SSE stream, preceded by an `init` snapshot
pub fn sse_stream(
    snapshot: WidgetSnapshot,
    broadcast_rx: tokio::sync::broadcast::Receiver<WidgetEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init_data = json!({
        "type": "init",
        "session": snapshot,
    });
    let init = futures::stream::once(async move {
        Ok(Event::default().event("init").data(init_data.to_string()))
    });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(widget_event_to_axum(event))),
        Err(_) => None, // Skip lagged messages
    });

    let combined = init.chain(broadcasts);

    Sse::new(combined).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn widget_event_to_axum(event: WidgetEvent) -> Event {
    let (event_type, data) = match event {
        WidgetEvent::Turn { turn } => (
            "turn",
            json!({
                "type": "turn",
                "turn": turn
            }),
        ),
        WidgetEvent::TurnUpdated { turn } => (
            "turn_updated",
            json!({
                "type": "turn_updated",
                "turn": turn
            }),
        ),
        WidgetEvent::StateChange { state } => (
            "state_change",
            json!({
                "type": "state_change",
                "state": state
            }),
        ),
        WidgetEvent::Navigate { path } => (
            "navigate",
            json!({
                "type": "navigate",
                "path": path
            }),
        ),
        WidgetEvent::Error { message } => (
            "error",
            json!({
                "type": "error",
                "message": message
            }),
        ),
    };

    Event::default().event(event_type).data(data.to_string())
}
