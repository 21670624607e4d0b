use crate::dtos::{NotificationAttemptDTO, OccurrenceDTO, RunSummaryDTO};
use carecall_domain::{NotificationAttempt, ReminderOccurrence, ID};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceResponse {
    pub occurrence: OccurrenceDTO,
}

impl OccurrenceResponse {
    pub fn new(occurrence: ReminderOccurrence) -> Self {
        Self {
            occurrence: OccurrenceDTO::new(occurrence),
        }
    }
}

pub mod get_occurrence {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PathParams {
        pub occurrence_id: ID,
    }

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub occurrence: OccurrenceDTO,
        pub attempts: Vec<NotificationAttemptDTO>,
    }

    impl APIResponse {
        pub fn new(occurrence: ReminderOccurrence, attempts: Vec<NotificationAttempt>) -> Self {
            Self {
                occurrence: OccurrenceDTO::new(occurrence),
                attempts: attempts
                    .into_iter()
                    .map(NotificationAttemptDTO::new)
                    .collect(),
            }
        }
    }
}

pub mod reset_occurrence {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PathParams {
        pub occurrence_id: ID,
    }

    #[derive(Debug, Deserialize, Serialize, Default)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        #[serde(default)]
        pub notes: Option<String>,
    }

    pub type APIResponse = OccurrenceResponse;
}

pub mod check_calls {
    use super::*;

    pub type APIResponse = RunSummaryDTO;
}
