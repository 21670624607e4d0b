use crate::{
    error::CarecallError,
    shared::usecase::{execute, UseCase},
};
use actix_web::{web, HttpResponse};
use carecall_api_structs::reset_occurrence::{APIResponse, PathParams, RequestBody};
use carecall_domain::{OccurrenceStatus, ReminderOccurrence, ID};
use carecall_infra::CarecallContext;

fn handle_error(e: UseCaseError) -> CarecallError {
    match e {
        UseCaseError::StorageError => CarecallError::InternalError,
        UseCaseError::NotFound(id) => {
            CarecallError::NotFound(format!("The occurrence with id: {}, was not found.", id))
        }
        UseCaseError::NotFailed(status) => CarecallError::Conflict(format!(
            "Only occurrences in failure can be reset, this one is {}",
            status.as_str()
        )),
        UseCaseError::RetriesExhausted { max_retries } => CarecallError::Conflict(format!(
            "The occurrence was already reset {} times, which is the maximum",
            max_retries
        )),
        UseCaseError::ChangedConcurrently => CarecallError::Conflict(
            "The occurrence changed while it was being reset".into(),
        ),
    }
}

pub async fn reset_occurrence_controller(
    path: web::Path<PathParams>,
    body: Option<web::Json<RequestBody>>,
    ctx: web::Data<CarecallContext>,
) -> Result<HttpResponse, CarecallError> {
    let usecase = ResetOccurrenceUseCase {
        occurrence_id: path.occurrence_id.clone(),
        notes: body.and_then(|body| body.0.notes),
    };

    execute(usecase, &ctx)
        .await
        .map(|occurrence| HttpResponse::Ok().json(APIResponse::new(occurrence)))
        .map_err(handle_error)
}

/// Re-arms an occurrence that failed to be delivered, so the voice sweep
/// dispatches it again. Bounded by the occurrence's `max_retries`.
#[derive(Debug)]
pub struct ResetOccurrenceUseCase {
    pub occurrence_id: ID,
    pub notes: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    NotFound(ID),
    NotFailed(OccurrenceStatus),
    RetriesExhausted { max_retries: i32 },
    ChangedConcurrently,
    StorageError,
}

#[async_trait::async_trait(?Send)]
impl UseCase for ResetOccurrenceUseCase {
    type Response = ReminderOccurrence;

    type Errors = UseCaseError;

    const NAME: &'static str = "ResetOccurrence";

    async fn execute(&mut self, ctx: &CarecallContext) -> Result<Self::Response, Self::Errors> {
        let occurrence = match ctx.repos.occurrences.find(&self.occurrence_id).await {
            Ok(Some(occurrence)) => occurrence,
            Ok(None) => return Err(UseCaseError::NotFound(self.occurrence_id.clone())),
            Err(_) => return Err(UseCaseError::StorageError),
        };
        if occurrence.status != OccurrenceStatus::Failure {
            return Err(UseCaseError::NotFailed(occurrence.status));
        }
        if !occurrence.can_be_reset() {
            return Err(UseCaseError::RetriesExhausted {
                max_retries: occurrence.max_retries,
            });
        }

        match ctx
            .repos
            .occurrences
            .reset_for_retry(&occurrence.id, self.notes.clone(), ctx.sys.get_datetime())
            .await
        {
            Ok(Some(occurrence)) => Ok(occurrence),
            Ok(None) => Err(UseCaseError::ChangedConcurrently),
            Err(_) => Err(UseCaseError::StorageError),
        }
    }
}
