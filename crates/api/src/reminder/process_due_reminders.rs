use crate::{
    dispatch::{dispatch, DispatchReport, RunSummary},
    error::CarecallError,
    shared::usecase::{execute, UseCase},
};
use actix_web::{web, HttpResponse};
use carecall_domain::{OccurrenceStatus, Reminder, ReminderOccurrence, ID};
use carecall_infra::CarecallContext;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

pub async fn check_reminders_controller(
    ctx: web::Data<CarecallContext>,
) -> Result<HttpResponse, CarecallError> {
    execute(ProcessDueRemindersUseCase, &ctx)
        .await
        .map(|summary| HttpResponse::Ok().json(summary.into_dto()))
        .map_err(|_| CarecallError::InternalError)
}

/// One scheduler pass. Every active, started reminder gets at most one new
/// occurrence, which is then dispatched over the configured chat channel.
/// A failing reminder is recorded in the summary and does not stop the pass.
///
/// The next instant is computed from the reminder's latest occurrence. After
/// a regeneration that is the end of the materialised horizon, so until then
/// the regenerated occurrences are only delivered by the voice sweep.
#[derive(Debug)]
pub struct ProcessDueRemindersUseCase;

#[derive(Debug)]
pub enum UseCaseError {
    StorageError,
}

#[derive(Debug)]
struct ReminderFailure {
    occurrence_id: Option<ID>,
    error: String,
}

impl ReminderFailure {
    fn new(occurrence_id: Option<&ID>, error: String) -> Self {
        Self {
            occurrence_id: occurrence_id.cloned(),
            error,
        }
    }
}

impl ProcessDueRemindersUseCase {
    async fn process_reminder(
        &self,
        reminder: &Reminder,
        now: DateTime<Utc>,
        ctx: &CarecallContext,
    ) -> Result<Option<(ID, DispatchReport)>, ReminderFailure> {
        let latest = ctx
            .repos
            .occurrences
            .find_latest(&reminder.id)
            .await
            .map_err(|e| ReminderFailure::new(None, format!("Unable to load occurrences: {}", e)))?;

        let due = match reminder
            .recurrence(&ctx.config.timezone)
            .next_due(latest.map(|o| o.scheduled_datetime), now)
        {
            Some(due) => due,
            None => return Ok(None),
        };

        let occurrence = self
            .occurrence_at(reminder, due, now, ctx)
            .await
            .map_err(|e| ReminderFailure::new(None, format!("Unable to store occurrence: {}", e)))?;
        if occurrence.status != OccurrenceStatus::Pending {
            return Ok(None);
        }

        let channel = ctx.config.chat_channel;
        let recipient = ctx
            .recipients
            .resolve(reminder, channel)
            .await
            .map_err(|e| ReminderFailure::new(Some(&occurrence.id), e.to_string()))?;

        let report = dispatch(&occurrence, reminder, &recipient, channel, ctx)
            .await
            .map_err(|e| {
                ReminderFailure::new(
                    Some(&occurrence.id),
                    format!("Unable to record the dispatch: {}", e),
                )
            })?;
        Ok(Some((occurrence.id, report)))
    }

    /// The occurrence of `reminder` at `due`, created as `pending` if absent
    async fn occurrence_at(
        &self,
        reminder: &Reminder,
        due: DateTime<Utc>,
        now: DateTime<Utc>,
        ctx: &CarecallContext,
    ) -> anyhow::Result<ReminderOccurrence> {
        let occurrences = &ctx.repos.occurrences;
        if let Some(existing) = occurrences.find_by_reminder_and_time(&reminder.id, due).await? {
            return Ok(existing);
        }

        let occurrence = ReminderOccurrence::new(
            reminder.id.clone(),
            due,
            ctx.config.occurrence_max_retries,
            now,
        );
        if occurrences.insert_if_absent(&occurrence).await? {
            return Ok(occurrence);
        }

        // Another pass created it in the meantime
        occurrences
            .find_by_reminder_and_time(&reminder.id, due)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Occurrence at {} vanished after a conflict", due))
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for ProcessDueRemindersUseCase {
    type Response = RunSummary;

    type Errors = UseCaseError;

    const NAME: &'static str = "ProcessDueReminders";

    async fn execute(&mut self, ctx: &CarecallContext) -> Result<Self::Response, Self::Errors> {
        let now = ctx.sys.get_datetime();
        let reminders = ctx
            .repos
            .reminders
            .find_active_started(now)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        let mut summary = RunSummary::default();
        for reminder in &reminders {
            match self.process_reminder(reminder, now, ctx).await {
                Ok(Some((occurrence_id, report))) => {
                    summary.record(&occurrence_id, &reminder.id, report)
                }
                Ok(None) => (),
                Err(failure) => {
                    warn!("Reminder {} was not processed: {}", reminder.id, failure.error);
                    summary.record_error(
                        Some(&reminder.id),
                        failure.occurrence_id.as_ref(),
                        failure.error,
                    );
                }
            }
        }

        info!(
            "Scheduler pass over {} reminders: {} processed, {} successful, {} failed",
            reminders.len(),
            summary.processed,
            summary.successful,
            summary.failed
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shared::test_utils::*;
    use carecall_domain::{Channel, ElderlyProfile, ReminderType};
    use carecall_infra::InMemoryChannel;
    use chrono::NaiveDate;

    async fn run_pass(test: &mut TestContext, now: DateTime<Utc>) -> RunSummary {
        test.set_now(now);
        ProcessDueRemindersUseCase.execute(&test.ctx).await.unwrap()
    }

    async fn scheduled(test: &TestContext, reminder_id: &ID) -> Vec<DateTime<Utc>> {
        test.ctx
            .repos
            .occurrences
            .find_by_reminder(reminder_id)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.scheduled_datetime)
            .collect()
    }

    #[actix_web::main]
    #[test]
    async fn daily_reminder_until_end_date() {
        let mut test = TestContext::new(at(2024, 1, 1, 8, 0));
        let mut fixture =
            insert_medicine_reminder(&test.ctx, at(2024, 1, 1, 9, 0), Some(1440)).await;
        fixture.reminder.end_date = NaiveDate::from_ymd_opt(2024, 1, 3);
        test.ctx.repos.reminders.save(&fixture.reminder).await.unwrap();

        for day in 1..=4 {
            run_pass(&mut test, at(2024, 1, day, 9, 0)).await;
        }

        assert_eq!(
            scheduled(&test, &fixture.reminder.id).await,
            vec![
                at(2024, 1, 1, 9, 0),
                at(2024, 1, 2, 9, 0),
                at(2024, 1, 3, 9, 0)
            ]
        );
        assert_eq!(test.whatsapp.sent().len(), 3);
    }

    #[actix_web::main]
    #[test]
    async fn same_clock_twice_creates_one_occurrence() {
        let mut test = TestContext::new(at(2024, 1, 1, 8, 0));
        let fixture = insert_medicine_reminder(&test.ctx, at(2024, 1, 1, 9, 0), Some(60)).await;

        let first = run_pass(&mut test, at(2024, 1, 1, 9, 0)).await;
        let second = run_pass(&mut test, at(2024, 1, 1, 9, 0)).await;
        assert_eq!(first.successful, 1);
        assert_eq!(second.processed, 0);
        assert_eq!(scheduled(&test, &fixture.reminder.id).await.len(), 1);
        assert_eq!(test.whatsapp.sent().len(), 1);
    }

    #[actix_web::main]
    #[test]
    async fn one_shot_reminder_fires_once() {
        let mut test = TestContext::new(at(2024, 1, 1, 8, 0));
        let fixture = insert_medicine_reminder(&test.ctx, at(2024, 1, 1, 9, 0), None).await;

        for hour in 9..15 {
            run_pass(&mut test, at(2024, 1, 1, hour, 0)).await;
        }
        assert_eq!(
            scheduled(&test, &fixture.reminder.id).await,
            vec![at(2024, 1, 1, 9, 0)]
        );
    }

    #[actix_web::main]
    #[test]
    async fn consecutive_occurrences_are_one_period_apart() {
        let mut test = TestContext::new(at(2024, 1, 1, 8, 0));
        let fixture = insert_medicine_reminder(&test.ctx, at(2024, 1, 1, 9, 0), Some(90)).await;

        // Passes run late and irregularly, occurrences stay on the grid
        for (hour, min) in [(9, 5), (10, 40), (12, 1), (14, 0), (15, 30)] {
            run_pass(&mut test, at(2024, 1, 1, hour, min)).await;
        }
        let instants = scheduled(&test, &fixture.reminder.id).await;
        assert_eq!(instants.len(), 5);
        for pair in instants.windows(2) {
            assert_eq!(pair[1] - pair[0], chrono::Duration::minutes(90));
        }
    }

    #[actix_web::main]
    #[test]
    async fn one_failing_reminder_does_not_stop_the_pass() {
        let mut test = TestContext::new(at(2024, 1, 1, 8, 0));
        insert_medicine_reminder(&test.ctx, at(2024, 1, 1, 9, 0), None).await;

        let unreachable = ElderlyProfile::new("Sin Teléfono".into(), at(2024, 1, 1, 8, 0));
        test.ctx.repos.profiles.insert_profile(&unreachable).await.unwrap();
        let mut orphan = Reminder::new(ReminderType::Other, at(2024, 1, 1, 9, 0), at(2024, 1, 1, 8, 0));
        orphan.elderly_profile_id = Some(unreachable.id.clone());
        test.ctx.repos.reminders.insert(&orphan).await.unwrap();

        let summary = run_pass(&mut test, at(2024, 1, 1, 9, 0)).await;
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].reminder_id, Some(orphan.id.clone()));
        assert!(summary.errors[0].occurrence_id.is_some());

        assert_eq!(test.whatsapp.sent().len(), 1);
        assert_eq!(test.whatsapp.sent()[0].recipient, "+56911111111");
        // The occurrence exists and waits for the voice sweep or an operator
        let orphan_occurrences = test
            .ctx
            .repos
            .occurrences
            .find_by_reminder(&orphan.id)
            .await
            .unwrap();
        assert_eq!(orphan_occurrences.len(), 1);
        assert_eq!(orphan_occurrences[0].status, OccurrenceStatus::Pending);
    }

    #[actix_web::main]
    #[test]
    async fn failed_sends_are_counted() {
        let mut test = TestContext::with_channels(
            at(2024, 1, 1, 8, 0),
            InMemoryChannel::failing(Channel::WhatsApp, "Kapso API returned status 401"),
            InMemoryChannel::new(Channel::Telegram),
            InMemoryChannel::new(Channel::Voice),
        );
        let fixture = insert_medicine_reminder(&test.ctx, at(2024, 1, 1, 9, 0), None).await;

        let summary = run_pass(&mut test, at(2024, 1, 1, 9, 0)).await;
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors[0].error, "Kapso API returned status 401");

        let occurrences = test
            .ctx
            .repos
            .occurrences
            .find_by_reminder(&fixture.reminder.id)
            .await
            .unwrap();
        assert_eq!(occurrences[0].status, OccurrenceStatus::Failure);
    }

    #[actix_web::main]
    #[test]
    async fn uses_the_configured_chat_channel() {
        let mut test = TestContext::new(at(2024, 1, 1, 8, 0));
        test.ctx.config.chat_channel = Channel::Telegram;
        insert_medicine_reminder(&test.ctx, at(2024, 1, 1, 9, 0), None).await;

        run_pass(&mut test, at(2024, 1, 1, 9, 0)).await;
        assert!(test.whatsapp.sent().is_empty());
        assert_eq!(test.telegram.sent().len(), 1);
        assert_eq!(test.telegram.sent()[0].recipient, "4242");
    }
}
