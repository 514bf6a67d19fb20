//! Context carrier
//!
//! Holds the backend's opaque conversation context between remote
//! dispatches. The value is never inspected beyond an emptiness check; it is
//! replaced wholesale when the backend returns a new one and forwarded
//! unmodified on the next request.

use serde_json::Value;

#[derive(Debug, Default, Clone)]
pub struct ContextCarrier {
    current: Option<Value>,
}

impl ContextCarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held context if `incoming` carries a value.
    ///
    /// Returns true when the held context changed.
    pub fn merge(&mut self, incoming: Option<Value>) -> bool {
        match incoming {
            Some(value) if !is_empty(&value) => {
                self.current = Some(value);
                true
            }
            _ => false,
        }
    }

    /// Context to forward on the next dispatch
    pub fn current(&self) -> Option<&Value> {
        self.current.as_ref()
    }
}

/// Null and empty containers/strings count as "no context"
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
