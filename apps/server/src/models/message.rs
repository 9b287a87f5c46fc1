//! Direct messages between two users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub subject: Option<String>,
    pub body: String,
    pub is_read: bool,
    pub sent_at: DateTime<Utc>,
}

/// The sender is always the authenticated caller, never part of the payload.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMessageRequest {
    pub recipient_id: i64,
    pub subject: Option<String>,
    #[validate(length(min = 1, message = "message content is required"))]
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_in_payload_is_ignored() {
        let request: CreateMessageRequest = serde_json::from_value(serde_json::json!({
            "sender_id": 12,
            "recipient_id": 3,
            "body": "hello"
        }))
        .unwrap();
        assert_eq!(request.recipient_id, 3);
    }

    #[test]
    fn empty_body_fails_validation() {
        let request = CreateMessageRequest {
            recipient_id: 3,
            subject: None,
            body: String::new(),
        };
        assert!(request.validate().is_err());
    }
}
