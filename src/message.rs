use crate::error::Result;

/// A record handed to the producer. Partition, offset, and timestamp are
/// assigned by the broker and only exist on the acknowledged side.
#[derive(Debug, Clone)]
pub struct PendingRecord {
    /// Optional key, sent as UTF-8 bytes. A keyless record is valid.
    pub key: Option<String>,
    /// Arbitrary JSON document, sent as JSON bytes.
    pub value: serde_json::Value,
}

impl PendingRecord {
    pub fn new(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: Some(key.into()),
            value,
        }
    }

    pub fn keyless(value: serde_json::Value) -> Self {
        Self { key: None, value }
    }
}

/// A fully-populated record as read from the broker.
#[derive(Debug, Clone)]
pub struct Record {
    pub key: Option<String>,
    pub value: serde_json::Value,
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    /// Broker or producer timestamp, milliseconds since epoch.
    pub timestamp: Option<i64>,
}

/// Per-send acknowledgment: where the broker placed the record.
#[derive(Debug, Clone, Copy)]
pub struct Delivery {
    pub partition: i32,
    pub offset: i64,
}

pub(crate) fn encode_value(value: &serde_json::Value) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

pub(crate) fn decode_value(bytes: &[u8]) -> Result<serde_json::Value> {
    Ok(serde_json::from_slice(bytes)?)
}

/// An absent key passes through as `None`; a present key must be UTF-8.
pub(crate) fn decode_key(bytes: Option<&[u8]>) -> Result<Option<String>> {
    match bytes {
        Some(b) => Ok(Some(String::from_utf8(b.to_vec())?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    #[test]
    fn test_value_round_trip() {
        let value = json!({"id": 3, "message": "hello", "nested": {"tags": ["a", "b"]}});
        let bytes = encode_value(&value).unwrap();
        assert_eq!(decode_value(&bytes).unwrap(), value);
    }

    #[test]
    fn test_decode_value_rejects_garbage() {
        assert!(matches!(
            decode_value(b"not json"),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_decode_key_absent() {
        assert_eq!(decode_key(None).unwrap(), None);
    }

    #[test]
    fn test_decode_key_utf8() {
        assert_eq!(decode_key(Some(b"k0")).unwrap(), Some("k0".to_string()));
    }

    #[test]
    fn test_decode_key_invalid_utf8() {
        assert!(matches!(
            decode_key(Some(&[0xff, 0xfe])),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn test_keyless_record() {
        let record = PendingRecord::keyless(json!({"id": 1}));
        assert!(record.key.is_none());
    }
}
