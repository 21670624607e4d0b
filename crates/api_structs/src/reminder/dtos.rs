use carecall_domain::{OccurrenceStatus, Reminder, ReminderOccurrence, ReminderType, ID};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReminderDTO {
    pub id: ID,
    #[serde(rename = "type")]
    pub reminder_type: ReminderType,
    pub start_date: DateTime<Utc>,
    pub periodicity: Option<i64>,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub medicine_id: Option<ID>,
    pub appointment_id: Option<ID>,
    pub elderly_profile_id: Option<ID>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl ReminderDTO {
    pub fn new(reminder: Reminder) -> Self {
        Self {
            id: reminder.id,
            reminder_type: reminder.reminder_type,
            start_date: reminder.start_date,
            periodicity: reminder.periodicity,
            end_date: reminder.end_date,
            is_active: reminder.is_active,
            medicine_id: reminder.medicine_id,
            appointment_id: reminder.appointment_id,
            elderly_profile_id: reminder.elderly_profile_id,
            created: reminder.created,
            updated: reminder.updated,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceDTO {
    pub id: ID,
    pub reminder_id: ID,
    pub scheduled_datetime: DateTime<Utc>,
    pub status: OccurrenceStatus,
    pub taken_at: Option<DateTime<Utc>>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub provider_message_id: Option<String>,
    pub notes: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl OccurrenceDTO {
    pub fn new(occurrence: ReminderOccurrence) -> Self {
        Self {
            id: occurrence.id,
            reminder_id: occurrence.reminder_id,
            scheduled_datetime: occurrence.scheduled_datetime,
            status: occurrence.status,
            taken_at: occurrence.taken_at,
            retry_count: occurrence.retry_count,
            max_retries: occurrence.max_retries,
            provider_message_id: occurrence.provider_message_id,
            notes: occurrence.notes,
            created: occurrence.created,
            updated: occurrence.updated,
        }
    }
}

/// Outcome of one scheduler or voice pass
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RunSummaryDTO {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<RunErrorDTO>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunErrorDTO {
    pub reminder_id: Option<ID>,
    pub occurrence_id: Option<ID>,
    pub error: String,
}
