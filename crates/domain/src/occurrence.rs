use crate::shared::entity::{Entity, ID};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

/// Lifecycle of a `ReminderOccurrence`:
///
/// `pending` -> `waiting` -> `success` | `rejected`
/// `pending` -> `failure`
///
/// `failure` may be put back to `pending` by an operator reset, every
/// other edge is taken by the delivery pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OccurrenceStatus {
    Pending,
    Waiting,
    Success,
    Failure,
    Rejected,
}

impl OccurrenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Waiting => "waiting",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure | Self::Rejected)
    }
}

impl Display for OccurrenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("Occurrence status: {0} is not valid")]
pub struct InvalidOccurrenceStatusError(String);

impl FromStr for OccurrenceStatus {
    type Err = InvalidOccurrenceStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "waiting" => Ok(Self::Waiting),
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            "rejected" => Ok(Self::Rejected),
            _ => Err(InvalidOccurrenceStatusError(s.to_string())),
        }
    }
}

/// A concrete instance of a `Reminder` at one scheduled instant.
/// There is at most one per (reminder, scheduled_datetime).
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderOccurrence {
    pub id: ID,
    pub reminder_id: ID,
    pub scheduled_datetime: DateTime<Utc>,
    pub status: OccurrenceStatus,
    pub taken_at: Option<DateTime<Utc>>,
    pub retry_count: i32,
    pub max_retries: i32,
    /// Correlation id returned by the channel that delivered this occurrence
    pub provider_message_id: Option<String>,
    pub notes: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl ReminderOccurrence {
    pub fn new(
        reminder_id: ID,
        scheduled_datetime: DateTime<Utc>,
        max_retries: i32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Default::default(),
            reminder_id,
            scheduled_datetime,
            status: OccurrenceStatus::Pending,
            taken_at: None,
            retry_count: 0,
            max_retries,
            provider_message_id: None,
            notes: None,
            created: now,
            updated: now,
        }
    }

    pub fn can_be_reset(&self) -> bool {
        self.status == OccurrenceStatus::Failure && self.retry_count < self.max_retries
    }
}

impl Entity for ReminderOccurrence {
    fn id(&self) -> &ID {
        &self.id
    }
}
