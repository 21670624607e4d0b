use crate::{APIResponse, BaseClient};
use carecall_api_structs::*;
use carecall_domain::{ReminderType, ID};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::StatusCode;
use std::sync::Arc;

#[derive(Clone)]
pub struct ReminderClient {
    base: Arc<BaseClient>,
}

pub struct CreateReminderInput {
    pub reminder_type: ReminderType,
    pub start_date: DateTime<Utc>,
    pub periodicity: Option<i64>,
    pub end_date: Option<NaiveDate>,
    pub medicine_id: Option<ID>,
    pub appointment_id: Option<ID>,
    pub elderly_profile_id: Option<ID>,
}

#[derive(Default)]
pub struct UpdateReminderScheduleInput {
    pub start_date: Option<DateTime<Utc>>,
    pub periodicity: Option<i64>,
    pub end_date: Option<NaiveDate>,
    pub clear_end_date: bool,
    pub is_active: Option<bool>,
}

impl ReminderClient {
    pub(crate) fn new(base: Arc<BaseClient>) -> Self {
        Self { base }
    }

    pub async fn create(
        &self,
        input: CreateReminderInput,
    ) -> APIResponse<create_reminder::APIResponse> {
        let body = create_reminder::RequestBody {
            reminder_type: input.reminder_type,
            start_date: input.start_date,
            periodicity: input.periodicity,
            end_date: input.end_date,
            medicine_id: input.medicine_id,
            appointment_id: input.appointment_id,
            elderly_profile_id: input.elderly_profile_id,
        };
        self.base
            .post(body, "reminders".into(), StatusCode::CREATED)
            .await
    }

    pub async fn update_schedule(
        &self,
        reminder_id: &ID,
        input: UpdateReminderScheduleInput,
    ) -> APIResponse<update_reminder_schedule::APIResponse> {
        let body = update_reminder_schedule::RequestBody {
            start_date: input.start_date,
            periodicity: input.periodicity,
            end_date: input.end_date,
            clear_end_date: input.clear_end_date,
            is_active: input.is_active,
        };
        self.base
            .put(
                body,
                format!("reminders/{}/schedule", reminder_id),
                StatusCode::OK,
            )
            .await
    }

    pub async fn regenerate(
        &self,
        reminder_id: &ID,
    ) -> APIResponse<regenerate_occurrences::APIResponse> {
        self.base
            .post(
                (),
                format!("reminders/{}/regenerate", reminder_id),
                StatusCode::OK,
            )
            .await
    }

    pub async fn occurrences(
        &self,
        reminder_id: &ID,
    ) -> APIResponse<get_reminder_occurrences::APIResponse> {
        self.base
            .get(
                format!("reminders/{}/occurrences", reminder_id),
                StatusCode::OK,
            )
            .await
    }

    /// Runs one scheduler pass
    pub async fn check(&self) -> APIResponse<check_reminders::APIResponse> {
        self.base
            .post((), "reminders/check".into(), StatusCode::OK)
            .await
    }
}
