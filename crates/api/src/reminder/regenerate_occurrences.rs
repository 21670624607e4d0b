use crate::{
    error::CarecallError,
    shared::usecase::{execute, UseCase},
};
use actix_web::{web, HttpResponse};
use carecall_api_structs::regenerate_occurrences::{APIResponse, PathParams};
use carecall_domain::{Reminder, ReminderOccurrence, ID};
use carecall_infra::{CarecallContext, ReplaceFutureResult};
use chrono::{DateTime, Utc};
use tracing::info;

fn handle_error(e: UseCaseError) -> CarecallError {
    match e {
        UseCaseError::StorageError => CarecallError::InternalError,
        UseCaseError::NotFound(id) => {
            CarecallError::NotFound(format!("The reminder with id: {}, was not found.", id))
        }
    }
}

pub async fn regenerate_occurrences_controller(
    path: web::Path<PathParams>,
    ctx: web::Data<CarecallContext>,
) -> Result<HttpResponse, CarecallError> {
    let usecase = RegenerateOccurrencesUseCase {
        reminder_id: path.reminder_id.clone(),
    };

    execute(usecase, &ctx)
        .await
        .map(|res| {
            HttpResponse::Ok().json(APIResponse {
                deleted: res.deleted,
                inserted: res.inserted,
            })
        })
        .map_err(handle_error)
}

/// The occurrences the reminder's rule yields after `now`, up to the
/// regeneration horizon
pub(crate) fn upcoming_occurrences(
    reminder: &Reminder,
    now: DateTime<Utc>,
    ctx: &CarecallContext,
) -> Vec<ReminderOccurrence> {
    reminder
        .recurrence(&ctx.config.timezone)
        .upcoming(now, ctx.config.regeneration_horizon)
        .into_iter()
        .map(|at| {
            ReminderOccurrence::new(
                reminder.id.clone(),
                at,
                ctx.config.occurrence_max_retries,
                now,
            )
        })
        .collect()
}

/// Replaces the future `pending` occurrences of a reminder with a fresh
/// expansion of its rule. Occurrences that already went out, and any
/// instant that still has an occurrence, are left alone.
#[derive(Debug)]
pub struct RegenerateOccurrencesUseCase {
    pub reminder_id: ID,
}

#[derive(Debug)]
pub enum UseCaseError {
    NotFound(ID),
    StorageError,
}

#[async_trait::async_trait(?Send)]
impl UseCase for RegenerateOccurrencesUseCase {
    type Response = ReplaceFutureResult;

    type Errors = UseCaseError;

    const NAME: &'static str = "RegenerateOccurrences";

    async fn execute(&mut self, ctx: &CarecallContext) -> Result<Self::Response, Self::Errors> {
        let reminder = match ctx.repos.reminders.find(&self.reminder_id).await {
            Ok(Some(reminder)) => reminder,
            Ok(None) => return Err(UseCaseError::NotFound(self.reminder_id.clone())),
            Err(_) => return Err(UseCaseError::StorageError),
        };

        let now = ctx.sys.get_datetime();
        let occurrences = upcoming_occurrences(&reminder, now, ctx);

        let res = ctx
            .repos
            .occurrences
            .replace_future(&reminder.id, now, &occurrences)
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        info!(
            "Regenerated occurrences of reminder {}: {} deleted, {} inserted",
            reminder.id, res.deleted, res.inserted
        );
        Ok(res)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shared::test_utils::*;
    use carecall_domain::OccurrenceStatus;

    #[actix_web::main]
    #[test]
    async fn materialises_the_horizon() {
        let test = TestContext::new(at(2024, 1, 1, 10, 0));
        let fixture = insert_medicine_reminder(&test.ctx, at(2024, 1, 1, 9, 0), Some(60)).await;

        let mut usecase = RegenerateOccurrencesUseCase {
            reminder_id: fixture.reminder.id.clone(),
        };
        let res = usecase.execute(&test.ctx).await.unwrap();
        assert_eq!(res.deleted, 0);
        assert_eq!(res.inserted, 30);

        let occurrences = test
            .ctx
            .repos
            .occurrences
            .find_by_reminder(&fixture.reminder.id)
            .await
            .unwrap();
        assert_eq!(occurrences.len(), 30);
        assert!(occurrences
            .iter()
            .all(|o| o.status == OccurrenceStatus::Pending && o.scheduled_datetime > at(2024, 1, 1, 10, 0)));
        assert_eq!(occurrences[0].scheduled_datetime, at(2024, 1, 1, 11, 0));

        // Running it again swaps the same instants
        let res = usecase.execute(&test.ctx).await.unwrap();
        assert_eq!(res.deleted, 30);
        assert_eq!(res.inserted, 30);
    }

    #[actix_web::main]
    #[test]
    async fn unknown_reminder() {
        let test = TestContext::new(at(2024, 1, 1, 10, 0));
        let mut usecase = RegenerateOccurrencesUseCase {
            reminder_id: ID::new(),
        };
        assert!(matches!(
            usecase.execute(&test.ctx).await,
            Err(UseCaseError::NotFound(_))
        ));
    }
}
