use crate::shared::entity::{Entity, ID};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Voice,
    WhatsApp,
    Telegram,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Voice => "voice",
            Self::WhatsApp => "whatsapp",
            Self::Telegram => "telegram",
        }
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("Channel: {0} is not one of voice, whatsapp or telegram")]
pub struct InvalidChannelError(String);

impl FromStr for Channel {
    type Err = InvalidChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "voice" => Ok(Self::Voice),
            "whatsapp" => Ok(Self::WhatsApp),
            "telegram" => Ok(Self::Telegram),
            _ => Err(InvalidChannelError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Pending,
    Sent,
    Delivered,
    Rejected,
    Failed,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

impl Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("Attempt status: {0} is not valid")]
pub struct InvalidAttemptStatusError(String);

impl FromStr for AttemptStatus {
    type Err = InvalidAttemptStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "delivered" => Ok(Self::Delivered),
            "rejected" => Ok(Self::Rejected),
            "failed" => Ok(Self::Failed),
            _ => Err(InvalidAttemptStatusError(s.to_string())),
        }
    }
}

/// One delivery try of an occurrence over one channel. Attempts are
/// append-only apart from their own status, timestamps and texts.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationAttempt {
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

impl NotificationAttempt {
    pub fn pending(
        occurrence_id: ID,
        channel: Channel,
        recipient: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Default::default(),
            occurrence_id,
            channel,
            recipient,
            status: AttemptStatus::Pending,
            sent_at: None,
            delivered_at: None,
            response: None,
            error_message: None,
            created: now,
        }
    }
}

impl Entity for NotificationAttempt {
    fn id(&self) -> &ID {
        &self.id
    }
}

/// What came back from handing a message to a channel
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Sent { provider_message_id: Option<String> },
    Failed { error: String },
}
