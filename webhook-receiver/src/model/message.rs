use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Header name to its values, in the order they were received.
pub type HeaderList = BTreeMap<String, Vec<String>>;

/// Latest timestamp handed out, in nanoseconds since the epoch.
static LAST_RECEIVED_NANOS: AtomicI64 = AtomicI64::new(i64::MIN);

/// A payload received on a webhook. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Raw request body, never parsed. Rendered as text only when the
    /// message is serialized.
    #[serde(with = "payload_text")]
    pub payload: Vec<u8>,
    /// Request headers minus credential headers
    pub headers: HeaderList,
    pub received_at: DateTime<Utc>,
}

impl Message {
    /// Create a message stamped with the current time.
    pub fn new(payload: impl Into<Vec<u8>>, headers: HeaderList) -> Self {
        Self {
            payload: payload.into(),
            headers,
            received_at: received_now(),
        }
    }
}

/// Current time, clamped so it never goes backwards within the process.
fn received_now() -> DateTime<Utc> {
    let now = Utc::now();
    let Some(nanos) = now.timestamp_nanos_opt() else {
        return now;
    };
    let previous = LAST_RECEIVED_NANOS.fetch_max(nanos, Ordering::AcqRel);
    if previous > nanos {
        DateTime::<Utc>::from_timestamp_nanos(previous)
    } else {
        now
    }
}

/// Serializes the raw payload as a JSON string; invalid UTF-8 sequences are
/// replaced in the output only.
mod payload_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(payload: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(payload))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        String::deserialize(deserializer).map(String::into_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serialization() {
        let mut headers = HeaderList::new();
        headers.insert(
            "x-multi".to_string(),
            vec!["one".to_string(), "two".to_string()],
        );
        let message = Message::new("{\"a\":1}".to_string(), headers);

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["payload"], "{\"a\":1}");
        assert_eq!(json["headers"]["x-multi"][1], "two");
        assert!(json["receivedAt"].is_string());

        let parsed: Message = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, message);
    }

    #[test]
    fn test_received_at_is_non_decreasing() {
        let stamps: Vec<_> = (0..1000)
            .map(|_| Message::new(Vec::new(), HeaderList::new()).received_at)
            .collect();

        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_non_utf8_payload_kept_raw() {
        let message = Message::new(vec![0xffu8, 0xfe, 0x00], HeaderList::new());
        assert_eq!(message.payload, vec![0xffu8, 0xfe, 0x00]);

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["payload"], "\u{fffd}\u{fffd}\u{0}");
    }
}
