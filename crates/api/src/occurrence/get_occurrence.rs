use crate::{
    error::CarecallError,
    shared::usecase::{execute, UseCase},
};
use actix_web::{web, HttpResponse};
use carecall_api_structs::get_occurrence::{APIResponse, PathParams};
use carecall_domain::{NotificationAttempt, ReminderOccurrence, ID};
use carecall_infra::CarecallContext;

fn handle_error(e: UseCaseError) -> CarecallError {
    match e {
        UseCaseError::StorageError => CarecallError::InternalError,
        UseCaseError::NotFound(id) => {
            CarecallError::NotFound(format!("The occurrence with id: {}, was not found.", id))
        }
    }
}

pub async fn get_occurrence_controller(
    path: web::Path<PathParams>,
    ctx: web::Data<CarecallContext>,
) -> Result<HttpResponse, CarecallError> {
    let usecase = GetOccurrenceUseCase {
        occurrence_id: path.occurrence_id.clone(),
    };

    execute(usecase, &ctx)
        .await
        .map(|(occurrence, attempts)| {
            HttpResponse::Ok().json(APIResponse::new(occurrence, attempts))
        })
        .map_err(handle_error)
}

/// An occurrence together with every delivery attempt made for it
#[derive(Debug)]
pub struct GetOccurrenceUseCase {
    pub occurrence_id: ID,
}

#[derive(Debug)]
pub enum UseCaseError {
    NotFound(ID),
    StorageError,
}

#[async_trait::async_trait(?Send)]
impl UseCase for GetOccurrenceUseCase {
    type Response = (ReminderOccurrence, Vec<NotificationAttempt>);

    type Errors = UseCaseError;

    const NAME: &'static str = "GetOccurrence";

    async fn execute(&mut self, ctx: &CarecallContext) -> Result<Self::Response, Self::Errors> {
        let occurrence = match ctx.repos.occurrences.find(&self.occurrence_id).await {
            Ok(Some(occurrence)) => occurrence,
            Ok(None) => return Err(UseCaseError::NotFound(self.occurrence_id.clone())),
            Err(_) => return Err(UseCaseError::StorageError),
        };
        let attempts = ctx
            .repos
            .attempts
            .find_by_occurrence(&occurrence.id)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        Ok((occurrence, attempts))
    }
}
