//! JSON serialization for WebSocket messages.

use bizhub_core::error::AppError;

use super::types::{InboundMessage, OutboundMessage};

/// Serialize an outbound message to JSON text.
pub fn serialize_outbound(msg: &OutboundMessage) -> Result<String, AppError> {
    Ok(serde_json::to_string(msg)?)
}

/// Deserialize an inbound message from JSON text.
pub fn deserialize_inbound(text: &str) -> Result<InboundMessage, AppError> {
    serde_json::from_str(text)
        .map_err(|e| AppError::validation(format!("Failed to parse message: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_inbound_shapes() {
        let id = Uuid::new_v4();
        let raw = format!(r#"{{"type":"mark_read","notification_id":"{id}"}}"#);
        assert_eq!(
            deserialize_inbound(&raw).unwrap(),
            InboundMessage::MarkRead { notification_id: id }
        );
        assert_eq!(
            deserialize_inbound(r#"{"type":"mark_all_read"}"#).unwrap(),
            InboundMessage::MarkAllRead
        );
        assert_eq!(
            deserialize_inbound(r#"{"type":"pong"}"#).unwrap(),
            InboundMessage::Pong { timestamp: None }
        );
        assert!(deserialize_inbound(r#"{"type":"subscribe","channel":"x"}"#).is_err());
    }

    #[test]
    fn test_outbound_is_type_tagged() {
        let json = serialize_outbound(&OutboundMessage::NotificationsAllRead {
            updated: 3,
            unread_count: 0,
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "notifications_all_read");
        assert_eq!(value["updated"], 3);
    }
}
