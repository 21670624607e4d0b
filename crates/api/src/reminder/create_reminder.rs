use crate::{
    error::CarecallError,
    shared::usecase::{execute, UseCase},
};
use actix_web::{web, HttpResponse};
use carecall_api_structs::create_reminder::{APIResponse, RequestBody};
use carecall_domain::{Reminder, ReminderType, ID};
use carecall_infra::CarecallContext;
use chrono::{DateTime, NaiveDate, Utc};

/// One year, in minutes
pub const MAX_PERIODICITY: i64 = 60 * 24 * 366;

fn handle_error(e: UseCaseError) -> CarecallError {
    match e {
        UseCaseError::StorageError => CarecallError::InternalError,
        UseCaseError::InvalidPeriodicity(periodicity) => CarecallError::BadClientData(format!(
            "Periodicity must be between 0 and {} minutes, got {}",
            MAX_PERIODICITY, periodicity
        )),
        UseCaseError::EndDateBeforeStart => CarecallError::BadClientData(
            "The end date can not be before the day of the start date".into(),
        ),
        UseCaseError::MissingLink(link) => CarecallError::BadClientData(format!(
            "This type of reminder requires a {}",
            link
        )),
        UseCaseError::MedicineNotFound(id) => {
            CarecallError::NotFound(format!("The medicine with id: {}, was not found.", id))
        }
        UseCaseError::AppointmentNotFound(id) => {
            CarecallError::NotFound(format!("The appointment with id: {}, was not found.", id))
        }
        UseCaseError::ProfileNotFound(id) => CarecallError::NotFound(format!(
            "The elderly profile with id: {}, was not found.",
            id
        )),
    }
}

pub async fn create_reminder_controller(
    body: web::Json<RequestBody>,
    ctx: web::Data<CarecallContext>,
) -> Result<HttpResponse, CarecallError> {
    let body = body.0;
    let usecase = CreateReminderUseCase {
        reminder_type: body.reminder_type,
        start_date: body.start_date,
        periodicity: body.periodicity,
        end_date: body.end_date,
        medicine_id: body.medicine_id,
        appointment_id: body.appointment_id,
        elderly_profile_id: body.elderly_profile_id,
    };

    execute(usecase, &ctx)
        .await
        .map(|reminder| HttpResponse::Created().json(APIResponse::new(reminder)))
        .map_err(handle_error)
}

#[derive(Debug)]
pub struct CreateReminderUseCase {
    pub reminder_type: ReminderType,
    pub start_date: DateTime<Utc>,
    pub periodicity: Option<i64>,
    pub end_date: Option<NaiveDate>,
    pub medicine_id: Option<ID>,
    pub appointment_id: Option<ID>,
    pub elderly_profile_id: Option<ID>,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    InvalidPeriodicity(i64),
    EndDateBeforeStart,
    MissingLink(&'static str),
    MedicineNotFound(ID),
    AppointmentNotFound(ID),
    ProfileNotFound(ID),
    StorageError,
}

pub fn validate_periodicity(periodicity: Option<i64>) -> Result<(), UseCaseError> {
    match periodicity {
        Some(p) if !(0..=MAX_PERIODICITY).contains(&p) => Err(UseCaseError::InvalidPeriodicity(p)),
        _ => Ok(()),
    }
}

pub fn validate_end_date(
    start_date: DateTime<Utc>,
    end_date: Option<NaiveDate>,
    ctx: &CarecallContext,
) -> Result<(), UseCaseError> {
    match end_date {
        Some(end_date)
            if end_date < start_date.with_timezone(&ctx.config.timezone).date_naive() =>
        {
            Err(UseCaseError::EndDateBeforeStart)
        }
        _ => Ok(()),
    }
}

impl CreateReminderUseCase {
    async fn validate_links(&self, ctx: &CarecallContext) -> Result<(), UseCaseError> {
        match self.reminder_type {
            ReminderType::Medicine if self.medicine_id.is_none() => {
                return Err(UseCaseError::MissingLink("medicineId"))
            }
            ReminderType::Appointment if self.appointment_id.is_none() => {
                return Err(UseCaseError::MissingLink("appointmentId"))
            }
            ReminderType::Other if self.elderly_profile_id.is_none() => {
                return Err(UseCaseError::MissingLink("elderlyProfileId"))
            }
            _ => (),
        }

        if let Some(medicine_id) = &self.medicine_id {
            let medicine = ctx
                .repos
                .medicines
                .find(medicine_id)
                .await
                .map_err(|_| UseCaseError::StorageError)?;
            if medicine.is_none() {
                return Err(UseCaseError::MedicineNotFound(medicine_id.clone()));
            }
        }
        if let Some(appointment_id) = &self.appointment_id {
            let appointment = ctx
                .repos
                .profiles
                .find_appointment(appointment_id)
                .await
                .map_err(|_| UseCaseError::StorageError)?;
            if appointment.is_none() {
                return Err(UseCaseError::AppointmentNotFound(appointment_id.clone()));
            }
        }
        if let Some(profile_id) = &self.elderly_profile_id {
            let profile = ctx
                .repos
                .profiles
                .find_profile(profile_id)
                .await
                .map_err(|_| UseCaseError::StorageError)?;
            if profile.is_none() {
                return Err(UseCaseError::ProfileNotFound(profile_id.clone()));
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for CreateReminderUseCase {
    type Response = Reminder;

    type Errors = UseCaseError;

    const NAME: &'static str = "CreateReminder";

    async fn execute(&mut self, ctx: &CarecallContext) -> Result<Self::Response, Self::Errors> {
        validate_periodicity(self.periodicity)?;
        validate_end_date(self.start_date, self.end_date, ctx)?;
        self.validate_links(ctx).await?;

        let mut reminder = Reminder::new(
            self.reminder_type,
            self.start_date,
            ctx.sys.get_datetime(),
        );
        reminder.periodicity = self.periodicity;
        reminder.end_date = self.end_date;
        reminder.medicine_id = self.medicine_id.clone();
        reminder.appointment_id = self.appointment_id.clone();
        reminder.elderly_profile_id = self.elderly_profile_id.clone();

        ctx.repos
            .reminders
            .insert(&reminder)
            .await
            .map(|_| reminder)
            .map_err(|_| UseCaseError::StorageError)
    }
}
