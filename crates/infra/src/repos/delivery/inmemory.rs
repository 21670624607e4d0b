use super::{
    ExpiredClaim, IDeliveryRepo, ResolutionOutcome, ResponseResolution, INTERRUPTED_DISPATCH,
};
use crate::repos::{
    medicine::InMemoryMedicineRepo,
    notification_attempt::InMemoryNotificationAttemptRepo,
    occurrence::{replace_future_locked, InMemoryOccurrenceRepo, ReplaceFutureResult},
    reminder::InMemoryReminderRepo,
};
use carecall_domain::{
    AttemptStatus, DispatchOutcome, NotificationAttempt, OccurrenceStatus, Reminder,
    ReminderOccurrence, ID,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Shares the collections of the other in-memory repos. Locks are always
/// taken in the order reminders, occurrences, attempts, medicines.
pub struct InMemoryDeliveryRepo {
    reminders: Arc<InMemoryReminderRepo>,
    occurrences: Arc<InMemoryOccurrenceRepo>,
    attempts: Arc<InMemoryNotificationAttemptRepo>,
    medicines: Arc<InMemoryMedicineRepo>,
}

impl InMemoryDeliveryRepo {
    pub fn new(
        reminders: Arc<InMemoryReminderRepo>,
        occurrences: Arc<InMemoryOccurrenceRepo>,
        attempts: Arc<InMemoryNotificationAttemptRepo>,
        medicines: Arc<InMemoryMedicineRepo>,
    ) -> Self {
        Self {
            reminders,
            occurrences,
            attempts,
            medicines,
        }
    }
}

#[async_trait::async_trait]
impl IDeliveryRepo for InMemoryDeliveryRepo {
    async fn begin_dispatch(&self, attempt: &NotificationAttempt) -> anyhow::Result<bool> {
        let occurrences = self.occurrences.occurrences.lock().unwrap();
        let mut attempts = self.attempts.attempts.lock().unwrap();

        let is_pending = occurrences
            .iter()
            .any(|o| o.id == attempt.occurrence_id && o.status == OccurrenceStatus::Pending);
        let is_claimed = attempts.iter().any(|a| {
            a.occurrence_id == attempt.occurrence_id && a.status == AttemptStatus::Pending
        });
        if !is_pending || is_claimed {
            return Ok(false);
        }

        attempts.push(attempt.clone());
        Ok(true)
    }

    async fn record_dispatch(
        &self,
        occurrence_id: &ID,
        attempt_id: &ID,
        outcome: &DispatchOutcome,
        at: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let mut occurrences = self.occurrences.occurrences.lock().unwrap();
        let mut attempts = self.attempts.attempts.lock().unwrap();

        if let Some(attempt) = attempts
            .iter_mut()
            .find(|a| a.id == *attempt_id && a.status == AttemptStatus::Pending)
        {
            match outcome {
                DispatchOutcome::Sent { .. } => {
                    attempt.status = AttemptStatus::Sent;
                    attempt.sent_at = Some(at);
                }
                DispatchOutcome::Failed { error } => {
                    attempt.status = AttemptStatus::Failed;
                    attempt.error_message = Some(error.clone());
                }
            }
        }

        let occurrence = match occurrences
            .iter_mut()
            .find(|o| o.id == *occurrence_id && o.status == OccurrenceStatus::Pending)
        {
            Some(occurrence) => occurrence,
            None => return Ok(false),
        };
        match outcome {
            DispatchOutcome::Sent {
                provider_message_id,
            } => {
                occurrence.status = OccurrenceStatus::Waiting;
                if provider_message_id.is_some() {
                    occurrence.provider_message_id = provider_message_id.clone();
                }
            }
            DispatchOutcome::Failed { .. } => {
                occurrence.status = OccurrenceStatus::Failure;
            }
        }
        occurrence.updated = at;
        Ok(true)
    }

    async fn expire_stale_claims(
        &self,
        claimed_before: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ExpiredClaim>> {
        let mut occurrences = self.occurrences.occurrences.lock().unwrap();
        let mut attempts = self.attempts.attempts.lock().unwrap();

        let mut expired = Vec::new();
        for attempt in attempts
            .iter_mut()
            .filter(|a| a.status == AttemptStatus::Pending && a.created < claimed_before)
        {
            attempt.status = AttemptStatus::Failed;
            attempt.error_message = Some(INTERRUPTED_DISPATCH.into());

            if let Some(occurrence) = occurrences.iter_mut().find(|o| {
                o.id == attempt.occurrence_id && o.status == OccurrenceStatus::Pending
            }) {
                occurrence.status = OccurrenceStatus::Failure;
                occurrence.updated = at;
                expired.push(ExpiredClaim {
                    occurrence_id: occurrence.id.clone(),
                    reminder_id: occurrence.reminder_id.clone(),
                });
            }
        }

        Ok(expired)
    }

    async fn resolve_response(
        &self,
        resolution: &ResponseResolution,
    ) -> anyhow::Result<ResolutionOutcome> {
        let mut occurrences = self.occurrences.occurrences.lock().unwrap();
        let mut attempts = self.attempts.attempts.lock().unwrap();
        let mut medicines = self.medicines.medicines.lock().unwrap();

        let occurrence = match occurrences
            .iter_mut()
            .find(|o| o.id == resolution.occurrence_id)
        {
            Some(occurrence) => occurrence,
            None => return Ok(ResolutionOutcome::OccurrenceNotFound),
        };
        if occurrence.status != OccurrenceStatus::Waiting {
            return Ok(ResolutionOutcome::AlreadyResolved(occurrence.status));
        }

        occurrence.status = resolution.resolved_status;
        if resolution.resolved_status == OccurrenceStatus::Success {
            occurrence.taken_at = Some(resolution.at);
        }
        occurrence.updated = resolution.at;

        if let Some(attempt_id) = &resolution.attempt_id {
            if let Some(attempt) = attempts.iter_mut().find(|a| {
                a.id == *attempt_id
                    && matches!(a.status, AttemptStatus::Pending | AttemptStatus::Sent)
            }) {
                attempt.status = resolution.attempt_status;
                attempt.response = Some(resolution.response.clone());
                attempt.delivered_at = Some(resolution.at);
            }
        }

        let mut tablets_left = None;
        if let Some(stock) = &resolution.stock {
            if let Some(medicine) = medicines.iter_mut().find(|m| m.id == stock.medicine_id) {
                if let Some(left) = medicine.tablets_left.filter(|left| *left > 0) {
                    let left = (left - stock.tablets).max(0);
                    medicine.tablets_left = Some(left);
                    medicine.updated = resolution.at;
                    tablets_left = Some(left);
                }
            }
        }

        Ok(ResolutionOutcome::Applied { tablets_left })
    }

    async fn reschedule(
        &self,
        reminder: &Reminder,
        after: DateTime<Utc>,
        occurrences: &[ReminderOccurrence],
    ) -> anyhow::Result<ReplaceFutureResult> {
        let mut reminders = self.reminders.reminders.lock().unwrap();
        let mut collection = self.occurrences.occurrences.lock().unwrap();

        let stored = match reminders.iter_mut().find(|r| r.id == reminder.id) {
            Some(stored) => stored,
            None => anyhow::bail!("Reminder {} does not exist", reminder.id),
        };
        *stored = reminder.clone();

        Ok(replace_future_locked(
            &mut collection,
            &reminder.id,
            after,
            occurrences,
        ))
    }
}
