use crate::{
    error::CarecallError,
    shared::usecase::{execute, UseCase},
};
use actix_web::{web, HttpResponse};
use carecall_api_structs::get_reminder_occurrences::{APIResponse, PathParams};
use carecall_domain::{ReminderOccurrence, ID};
use carecall_infra::CarecallContext;

fn handle_error(e: UseCaseError) -> CarecallError {
    match e {
        UseCaseError::StorageError => CarecallError::InternalError,
        UseCaseError::NotFound(id) => {
            CarecallError::NotFound(format!("The reminder with id: {}, was not found.", id))
        }
    }
}

pub async fn get_reminder_occurrences_controller(
    path: web::Path<PathParams>,
    ctx: web::Data<CarecallContext>,
) -> Result<HttpResponse, CarecallError> {
    let usecase = GetReminderOccurrencesUseCase {
        reminder_id: path.reminder_id.clone(),
    };

    execute(usecase, &ctx)
        .await
        .map(|occurrences| HttpResponse::Ok().json(APIResponse::new(occurrences)))
        .map_err(handle_error)
}

#[derive(Debug)]
pub struct GetReminderOccurrencesUseCase {
    pub reminder_id: ID,
}

#[derive(Debug)]
pub enum UseCaseError {
    NotFound(ID),
    StorageError,
}

#[async_trait::async_trait(?Send)]
impl UseCase for GetReminderOccurrencesUseCase {
    type Response = Vec<ReminderOccurrence>;

    type Errors = UseCaseError;

    const NAME: &'static str = "GetReminderOccurrences";

    async fn execute(&mut self, ctx: &CarecallContext) -> Result<Self::Response, Self::Errors> {
        match ctx.repos.reminders.find(&self.reminder_id).await {
            Ok(Some(_)) => (),
            Ok(None) => return Err(UseCaseError::NotFound(self.reminder_id.clone())),
            Err(_) => return Err(UseCaseError::StorageError),
        }

        ctx.repos
            .occurrences
            .find_by_reminder(&self.reminder_id)
            .await
            .map_err(|_| UseCaseError::StorageError)
    }
}
