use crate::dtos::{OccurrenceDTO, ReminderDTO, RunSummaryDTO};
use carecall_domain::{Reminder, ReminderOccurrence, ReminderType, ID};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderResponse {
    pub reminder: ReminderDTO,
}

impl ReminderResponse {
    pub fn new(reminder: Reminder) -> Self {
        Self {
            reminder: ReminderDTO::new(reminder),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrencesResponse {
    pub occurrences: Vec<OccurrenceDTO>,
}

impl OccurrencesResponse {
    pub fn new(occurrences: Vec<ReminderOccurrence>) -> Self {
        Self {
            occurrences: occurrences.into_iter().map(OccurrenceDTO::new).collect(),
        }
    }
}

pub mod create_reminder {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        #[serde(rename = "type")]
        pub reminder_type: ReminderType,
        pub start_date: DateTime<Utc>,
        #[serde(default)]
        pub periodicity: Option<i64>,
        #[serde(default)]
        pub end_date: Option<NaiveDate>,
        #[serde(default)]
        pub medicine_id: Option<ID>,
        #[serde(default)]
        pub appointment_id: Option<ID>,
        #[serde(default)]
        pub elderly_profile_id: Option<ID>,
    }

    pub type APIResponse = ReminderResponse;
}

pub mod update_reminder_schedule {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PathParams {
        pub reminder_id: ID,
    }

    /// Absent fields are left untouched
    #[derive(Debug, Deserialize, Serialize, Default)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        #[serde(default)]
        pub start_date: Option<DateTime<Utc>>,
        #[serde(default)]
        pub periodicity: Option<i64>,
        #[serde(default)]
        pub end_date: Option<NaiveDate>,
        /// Removes the end date. Takes precedence over `end_date`.
        #[serde(default)]
        pub clear_end_date: bool,
        #[serde(default)]
        pub is_active: Option<bool>,
    }

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub reminder: ReminderDTO,
        /// Whether the future occurrences were regenerated
        pub schedule_changed: bool,
    }

    impl APIResponse {
        pub fn new(reminder: Reminder, schedule_changed: bool) -> Self {
            Self {
                reminder: ReminderDTO::new(reminder),
                schedule_changed,
            }
        }
    }
}

pub mod regenerate_occurrences {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PathParams {
        pub reminder_id: ID,
    }

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub deleted: u64,
        pub inserted: u64,
    }
}

pub mod get_reminder_occurrences {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PathParams {
        pub reminder_id: ID,
    }

    pub type APIResponse = OccurrencesResponse;
}

pub mod check_reminders {
    use super::*;

    pub type APIResponse = RunSummaryDTO;
}
