//! Application events relayed to the broker.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An event raised by the application core.
///
/// Serialises flat: `{"type": "...", "class": "...", <params>}` so broker
/// consumers see one JSON object per event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    class: Option<String>,
    #[serde(flatten)]
    params: BTreeMap<String, String>,
}

impl AppEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            class: None,
            params: BTreeMap::new(),
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Attach a parameter. `type` and `class` are reserved and ignored here.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if key != "type" && key != "class" {
            self.params.insert(key, value.into());
        }
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_flat() {
        let event = AppEvent::new("CALL_ESTABLISHED")
            .with_class("call")
            .with_param("peeruri", "sip:bob@example.com");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "CALL_ESTABLISHED");
        assert_eq!(json["class"], "call");
        assert_eq!(json["peeruri"], "sip:bob@example.com");
    }

    #[test]
    fn omits_missing_class() {
        let json = serde_json::to_string(&AppEvent::new("REGISTER_OK")).unwrap();
        assert_eq!(json, r#"{"type":"REGISTER_OK"}"#);
    }

    #[test]
    fn reserved_keys_are_not_params() {
        let event = AppEvent::new("X")
            .with_param("type", "Y")
            .with_param("class", "Z");

        let json = serde_json::to_string(&event).unwrap();

        assert_eq!(json, r#"{"type":"X"}"#);
        assert_eq!(event.class(), None);
    }

    #[test]
    fn round_trips_params() {
        let event = AppEvent::new("VU_RX").with_param("value", "-12.5");
        let json = serde_json::to_string(&event).unwrap();
        let back: AppEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
