use super::{
    create_reminder::{validate_end_date, validate_periodicity, UseCaseError as ValidationError},
    regenerate_occurrences::upcoming_occurrences,
};
use crate::{
    error::CarecallError,
    shared::usecase::{execute, UseCase},
};
use actix_web::{web, HttpResponse};
use carecall_api_structs::update_reminder_schedule::{APIResponse, PathParams, RequestBody};
use carecall_domain::{Reminder, ID};
use carecall_infra::{CarecallContext, ReplaceFutureResult};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

fn handle_error(e: UseCaseError) -> CarecallError {
    match e {
        UseCaseError::StorageError => CarecallError::InternalError,
        UseCaseError::NotFound(id) => {
            CarecallError::NotFound(format!("The reminder with id: {}, was not found.", id))
        }
        UseCaseError::InvalidSchedule(msg) => CarecallError::BadClientData(msg),
    }
}

pub async fn update_reminder_schedule_controller(
    path: web::Path<PathParams>,
    body: web::Json<RequestBody>,
    ctx: web::Data<CarecallContext>,
) -> Result<HttpResponse, CarecallError> {
    let body = body.0;
    let end_date = if body.clear_end_date {
        Some(None)
    } else {
        body.end_date.map(Some)
    };
    let usecase = UpdateReminderScheduleUseCase {
        reminder_id: path.reminder_id.clone(),
        start_date: body.start_date,
        periodicity: body.periodicity,
        end_date,
        is_active: body.is_active,
    };

    execute(usecase, &ctx)
        .await
        .map(|res| HttpResponse::Ok().json(APIResponse::new(res.reminder, res.schedule_changed)))
        .map_err(handle_error)
}

/// Changes the schedule of a reminder. `None` leaves a field untouched.
///
/// When the series of occurrences changes, the future `pending`
/// occurrences are regenerated in the same write as the reminder.
#[derive(Debug)]
pub struct UpdateReminderScheduleUseCase {
    pub reminder_id: ID,
    pub start_date: Option<DateTime<Utc>>,
    /// Zero turns the reminder into a one-shot reminder
    pub periodicity: Option<i64>,
    /// `Some(None)` removes the end date
    pub end_date: Option<Option<NaiveDate>>,
    pub is_active: Option<bool>,
}

#[derive(Debug)]
pub struct UpdatedReminder {
    pub reminder: Reminder,
    pub schedule_changed: bool,
    pub regenerated: Option<ReplaceFutureResult>,
}

#[derive(Debug)]
pub enum UseCaseError {
    NotFound(ID),
    InvalidSchedule(String),
    StorageError,
}

impl From<ValidationError> for UseCaseError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::InvalidPeriodicity(p) => {
                Self::InvalidSchedule(format!("Invalid periodicity: {}", p))
            }
            ValidationError::EndDateBeforeStart => Self::InvalidSchedule(
                "The end date can not be before the day of the start date".into(),
            ),
            _ => Self::StorageError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for UpdateReminderScheduleUseCase {
    type Response = UpdatedReminder;

    type Errors = UseCaseError;

    const NAME: &'static str = "UpdateReminderSchedule";

    async fn execute(&mut self, ctx: &CarecallContext) -> Result<Self::Response, Self::Errors> {
        let previous = match ctx.repos.reminders.find(&self.reminder_id).await {
            Ok(Some(reminder)) => reminder,
            Ok(None) => return Err(UseCaseError::NotFound(self.reminder_id.clone())),
            Err(_) => return Err(UseCaseError::StorageError),
        };

        let mut reminder = previous.clone();
        if let Some(start_date) = self.start_date {
            reminder.start_date = start_date;
        }
        if let Some(periodicity) = self.periodicity {
            validate_periodicity(Some(periodicity))?;
            reminder.periodicity = Some(periodicity);
        }
        if let Some(end_date) = self.end_date {
            reminder.end_date = end_date;
        }
        if let Some(is_active) = self.is_active {
            reminder.is_active = is_active;
        }
        validate_end_date(reminder.start_date, reminder.end_date, ctx)?;

        let schedule_changed = previous.schedule_differs(&reminder);
        let mut regenerated = None;
        if schedule_changed {
            let now = ctx.sys.get_datetime();
            reminder.updated = now;
            let occurrences = upcoming_occurrences(&reminder, now, ctx);
            let res = ctx
                .repos
                .deliveries
                .reschedule(&reminder, now, &occurrences)
                .await
                .map_err(|_| UseCaseError::StorageError)?;
            info!(
                "Rescheduled reminder {}: {} occurrences deleted, {} inserted",
                reminder.id, res.deleted, res.inserted
            );
            regenerated = Some(res);
        } else if reminder != previous {
            reminder.updated = ctx.sys.get_datetime();
            ctx.repos
                .reminders
                .save(&reminder)
                .await
                .map_err(|_| UseCaseError::StorageError)?;
        }

        Ok(UpdatedReminder {
            reminder,
            schedule_changed,
            regenerated,
        })
    }
}
