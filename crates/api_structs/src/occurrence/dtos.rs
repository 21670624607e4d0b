use carecall_domain::{AttemptStatus, Channel, NotificationAttempt, ID};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationAttemptDTO {
    pub id: ID,
    pub occurrence_id: ID,
    pub channel: Channel,
    pub recipient: String,
    pub status: AttemptStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub response: Option<String>,
    pub error_message: Option<String>,
    pub created: DateTime<Utc>,
}

impl NotificationAttemptDTO {
    pub fn new(attempt: NotificationAttempt) -> Self {
        Self {
            id: attempt.id,
            occurrence_id: attempt.occurrence_id,
            channel: attempt.channel,
            recipient: attempt.recipient,
            status: attempt.status,
            sent_at: attempt.sent_at,
            delivered_at: attempt.delivered_at,
            response: attempt.response,
            error_message: attempt.error_message,
            created: attempt.created,
        }
    }
}
