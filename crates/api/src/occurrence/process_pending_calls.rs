use crate::{
    dispatch::{dispatch, stale_claim_age, DispatchReport, RunSummary},
    error::CarecallError,
    shared::usecase::{execute, UseCase},
};
use actix_web::{web, HttpResponse};
use carecall_domain::{Channel, ReminderOccurrence};
use carecall_infra::{CarecallContext, INTERRUPTED_DISPATCH};
use tracing::{info, warn};

pub async fn check_calls_controller(
    ctx: web::Data<CarecallContext>,
) -> Result<HttpResponse, CarecallError> {
    execute(ProcessPendingCallsUseCase, &ctx)
        .await
        .map(|summary| HttpResponse::Ok().json(summary.into_dto()))
        .map_err(|_| CarecallError::InternalError)
}

/// One voice sweep. Every `pending` occurrence that has come due is
/// delivered as a phone call, whichever pass created it.
///
/// Dispatch claims older than the stale claim age are expired first, so an
/// occurrence whose dispatch was cut short ends up in `failure` where it
/// can be reset.
#[derive(Debug)]
pub struct ProcessPendingCallsUseCase;

#[derive(Debug)]
pub enum UseCaseError {
    StorageError,
}

impl ProcessPendingCallsUseCase {
    async fn call(
        &self,
        occurrence: &ReminderOccurrence,
        ctx: &CarecallContext,
    ) -> Result<DispatchReport, String> {
        let reminder = match ctx.repos.reminders.find(&occurrence.reminder_id).await {
            Ok(Some(reminder)) => reminder,
            Ok(None) => return Err(format!("Reminder {} was not found", occurrence.reminder_id)),
            Err(e) => return Err(format!("Unable to load reminder: {}", e)),
        };
        if !reminder.is_active {
            info!(
                "Reminder {} is inactive, not calling for occurrence {}",
                reminder.id, occurrence.id
            );
            return Ok(DispatchReport::Skipped);
        }

        let recipient = ctx
            .recipients
            .resolve(&reminder, Channel::Voice)
            .await
            .map_err(|e| e.to_string())?;

        dispatch(occurrence, &reminder, &recipient, Channel::Voice, ctx)
            .await
            .map_err(|e| format!("Unable to record the call: {}", e))
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for ProcessPendingCallsUseCase {
    type Response = RunSummary;

    type Errors = UseCaseError;

    const NAME: &'static str = "ProcessPendingCalls";

    async fn execute(&mut self, ctx: &CarecallContext) -> Result<Self::Response, Self::Errors> {
        let now = ctx.sys.get_datetime();
        let mut summary = RunSummary::default();

        let claimed_before = chrono::Duration::from_std(stale_claim_age(&ctx.config))
            .map(|age| now - age)
            .map_err(|_| UseCaseError::StorageError)?;
        let expired = ctx
            .repos
            .deliveries
            .expire_stale_claims(claimed_before, now)
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        for claim in &expired {
            warn!(
                "Dispatch of occurrence {} was never settled, marked as failed",
                claim.occurrence_id
            );
            summary.record_error(
                Some(&claim.reminder_id),
                Some(&claim.occurrence_id),
                INTERRUPTED_DISPATCH.into(),
            );
        }

        let occurrences = ctx
            .repos
            .occurrences
            .find_pending_due(now)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        for occurrence in &occurrences {
            match self.call(occurrence, ctx).await {
                Ok(report) => summary.record(&occurrence.id, &occurrence.reminder_id, report),
                Err(error) => {
                    warn!("No call placed for occurrence {}: {}", occurrence.id, error);
                    summary.record_error(
                        Some(&occurrence.reminder_id),
                        Some(&occurrence.id),
                        error,
                    );
                }
            }
        }

        if !occurrences.is_empty() {
            info!(
                "Voice sweep over {} pending occurrences: {} successful, {} failed",
                occurrences.len(),
                summary.successful,
                summary.failed
            );
        }
        Ok(summary)
    }
}
