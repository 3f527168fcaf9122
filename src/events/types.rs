use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// An event broadcast to every listener registered under its name.
///
/// Listeners receive it behind an `Arc`, so it is read-only once dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Create an event carrying `data`
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
            created_at: Utc::now(),
        }
    }

    /// Create an event with no payload
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, Value::Null)
    }
}

/// Identifies one listener invocation created by a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvocationId(pub u64);

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inv-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_creation() {
        let event = Event::new("order.created", json!({"order_id": 7}));
        assert_eq!(event.name, "order.created");
        assert_eq!(event.data["order_id"], 7);
    }

    #[test]
    fn test_named_event_has_null_payload() {
        let event = Event::named("cache.flushed");
        assert!(event.data.is_null());
    }

    #[test]
    fn test_invocation_id_display() {
        assert_eq!(InvocationId(12).to_string(), "inv-12");
    }
}
