//! Persisted form of pending events.
//!
//! A saved queue is a list of entries:
//!
//! ```text
//! [
//!   { "Name": "daily", "TriggerTime": 24000, "Callback": { "Type": "function", "Name": "reset" } }
//! ]
//! ```
//!
//! Entries are decoded independently so one bad entry never costs the rest
//! of the list.

use serde_json::{Map, Value};
use tickq_core::{Error, Result};

use crate::callback::Callback;
use crate::event::TimerEvent;
use crate::registry::CallbackCodec;

/// Event name field.
pub const NAME_FIELD: &str = "Name";
/// Trigger tick field.
pub const TRIGGER_TIME_FIELD: &str = "TriggerTime";
/// Tagged callback field.
pub const CALLBACK_FIELD: &str = "Callback";

/// One persisted entry after decoding.
pub struct DecodedEntry<C> {
    /// Event name.
    pub name: String,
    /// Trigger tick.
    pub trigger_tick: i64,
    /// Decoded action.
    pub callback: Box<dyn Callback<C>>,
}

/// Encode a pending event as a persisted entry.
///
/// # Errors
///
/// Propagates the codec's error if the callback cannot be encoded.
pub fn encode_entry<C: 'static>(event: &TimerEvent<C>, codec: &CallbackCodec<'_, C>) -> Result<Value> {
    let callback = codec.encode(event.callback())?;

    let mut entry = Map::new();
    entry.insert(NAME_FIELD.to_string(), Value::String(event.name().to_string()));
    entry.insert(
        TRIGGER_TIME_FIELD.to_string(),
        Value::from(event.trigger_tick()),
    );
    entry.insert(CALLBACK_FIELD.to_string(), callback);
    Ok(Value::Object(entry))
}

/// Decode one persisted entry.
///
/// # Errors
///
/// Returns a data error ([`Error::is_data_error`]) when a field is missing,
/// has the wrong type, or the callback cannot be decoded.
pub fn decode_entry<C: 'static>(raw: &Value, codec: &CallbackCodec<'_, C>) -> Result<DecodedEntry<C>> {
    let Value::Object(fields) = raw else {
        return Err(Error::invalid_field("entry", "expected an object"));
    };

    let name = match fields.get(NAME_FIELD) {
        Some(Value::String(name)) => name.clone(),
        Some(_) => return Err(Error::invalid_field(NAME_FIELD, "expected a string")),
        None => return Err(Error::missing_field(NAME_FIELD)),
    };

    let trigger_tick = match fields.get(TRIGGER_TIME_FIELD) {
        Some(value) => value
            .as_i64()
            .ok_or_else(|| Error::invalid_field(TRIGGER_TIME_FIELD, "expected a 64-bit integer"))?,
        None => return Err(Error::missing_field(TRIGGER_TIME_FIELD)),
    };

    let callback = fields
        .get(CALLBACK_FIELD)
        .ok_or_else(|| Error::missing_field(CALLBACK_FIELD))
        .and_then(|value| codec.decode(value))?;

    Ok(DecodedEntry {
        name,
        trigger_tick,
        callback,
    })
}

/// An entry dropped during restore.
#[derive(Debug)]
pub struct SkippedEntry {
    /// Position of the entry in the input.
    pub index: usize,
    /// Why it was dropped.
    pub error: Error,
}

/// Outcome of restoring a queue from persisted entries.
#[derive(Debug, Default)]
pub struct RestoreReport {
    /// Entries inserted into the queue.
    pub loaded: usize,
    /// Entries dropped because an earlier entry had the same name and tick.
    pub duplicates: usize,
    /// Entries dropped because they could not be decoded.
    pub skipped: Vec<SkippedEntry>,
}

impl RestoreReport {
    /// Check whether every entry was loaded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.duplicates == 0 && self.skipped.is_empty()
    }

    /// Number of entries read.
    #[must_use]
    pub fn total(&self) -> usize {
        self.loaded
            .saturating_add(self.duplicates)
            .saturating_add(self.skipped.len())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use std::any::Any;

    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;
    use crate::event::EventKey;
    use crate::queue::TimerQueue;
    use crate::registry::CallbackRegistry;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Noop {
        #[serde(rename = "Label")]
        label: String,
    }

    impl Callback<()> for Noop {
        fn invoke(&self, _: &mut (), _: &mut TimerQueue<()>, _: i64) -> Result<()> {
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn registry() -> CallbackRegistry<()> {
        CallbackRegistry::builder()
            .register_serde::<Noop>("noop")
            .expect("registration")
            .build()
    }

    #[test]
    fn test_encode_entry_layout() {
        let registry = registry();
        let event = TimerEvent::new(
            "daily".to_string(),
            EventKey::new(24_000, 3),
            Box::new(Noop {
                label: "x".into(),
            }),
        );

        let entry = encode_entry(&event, &registry.codec()).unwrap();
        assert_eq!(
            entry,
            json!({
                "Name": "daily",
                "TriggerTime": 24_000,
                "Callback": {"Type": "noop", "Label": "x"}
            })
        );
    }

    #[test]
    fn test_decode_entry_success() {
        let registry = registry();
        let raw = json!({
            "Name": "a",
            "TriggerTime": -5,
            "Callback": {"Type": "noop", "Label": "y"}
        });
        let entry = decode_entry(&raw, &registry.codec()).unwrap();
        assert_eq!(entry.name, "a");
        assert_eq!(entry.trigger_tick, -5);
        let noop = entry.callback.as_any().downcast_ref::<Noop>().unwrap();
        assert_eq!(noop.label, "y");
    }

    #[test]
    fn test_decode_entry_missing_name() {
        let registry = registry();
        let raw = json!({"TriggerTime": 1, "Callback": {"Type": "noop", "Label": ""}});
        let result = decode_entry(&raw, &registry.codec());
        assert!(matches!(result, Err(Error::MissingField { ref field }) if field == "Name"));
    }

    #[test]
    fn test_decode_entry_missing_trigger_time() {
        let registry = registry();
        let raw = json!({"Name": "a", "Callback": {"Type": "noop", "Label": ""}});
        let result = decode_entry(&raw, &registry.codec());
        assert!(matches!(result, Err(Error::MissingField { ref field }) if field == "TriggerTime"));
    }

    #[test]
    fn test_decode_entry_fractional_trigger_time() {
        let registry = registry();
        let raw = json!({"Name": "a", "TriggerTime": 1.5, "Callback": {"Type": "noop", "Label": ""}});
        let result = decode_entry(&raw, &registry.codec());
        assert!(matches!(result, Err(Error::InvalidField { ref field, .. }) if field == "TriggerTime"));
    }

    #[test]
    fn test_decode_entry_missing_callback() {
        let registry = registry();
        let raw = json!({"Name": "a", "TriggerTime": 1});
        let result = decode_entry(&raw, &registry.codec());
        assert!(matches!(result, Err(Error::MissingField { ref field }) if field == "Callback"));
    }

    #[test]
    fn test_decode_entry_unknown_callback_type() {
        let registry = registry();
        let raw = json!({"Name": "a", "TriggerTime": 1, "Callback": {"Type": "unknown_tag"}});
        let result = decode_entry(&raw, &registry.codec());
        assert!(matches!(result, Err(ref e) if e.is_data_error()));
    }

    #[test]
    fn test_report_totals() {
        let report = RestoreReport {
            loaded: 2,
            duplicates: 1,
            skipped: vec![SkippedEntry {
                index: 1,
                error: Error::unknown_callback_type("unknown_tag"),
            }],
        };
        assert_eq!(report.total(), 4);
        assert!(!report.is_clean());
        assert!(RestoreReport::default().is_clean());
    }
}
