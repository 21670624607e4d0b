mod inmemory;
mod postgres;

pub use inmemory::InMemoryDeliveryRepo;
pub use postgres::PostgresDeliveryRepo;

use super::occurrence::ReplaceFutureResult;
use carecall_domain::{
    AttemptStatus, DispatchOutcome, NotificationAttempt, OccurrenceStatus, Reminder,
    ReminderOccurrence, ID,
};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct StockDecrement {
    pub medicine_id: ID,
    pub tablets: i32,
}

/// Everything a classified response writes, applied as one unit
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseResolution {
    pub occurrence_id: ID,
    pub attempt_id: Option<ID>,
    pub resolved_status: OccurrenceStatus,
    pub attempt_status: AttemptStatus,
    pub response: String,
    pub at: DateTime<Utc>,
    pub stock: Option<StockDecrement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionOutcome {
    Applied {
        /// Stock after the decrement, when one happened
        tablets_left: Option<i32>,
    },
    /// The occurrence had already left `waiting`. Nothing was written.
    AlreadyResolved(OccurrenceStatus),
    OccurrenceNotFound,
}

/// An occurrence whose dispatch claim was never settled and that was
/// moved to `failure`
#[derive(Debug, Clone, PartialEq)]
pub struct ExpiredClaim {
    pub occurrence_id: ID,
    pub reminder_id: ID,
}

pub const INTERRUPTED_DISPATCH: &str = "The dispatch was interrupted before its outcome was recorded";

/// Multi-record writes of the delivery pipeline. Every method is atomic
/// and guards the occurrence transition with its expected current status.
#[async_trait::async_trait]
pub trait IDeliveryRepo: Send + Sync {
    /// Persists a `pending` attempt as a claim on the occurrence. Fails to
    /// claim (returns false) unless the occurrence is `pending` and has no
    /// other `pending` attempt.
    async fn begin_dispatch(&self, attempt: &NotificationAttempt) -> anyhow::Result<bool>;
    /// Settles the attempt and moves the occurrence out of `pending`.
    /// Returns whether the occurrence transitioned.
    async fn record_dispatch(
        &self,
        occurrence_id: &ID,
        attempt_id: &ID,
        outcome: &DispatchOutcome,
        at: DateTime<Utc>,
    ) -> anyhow::Result<bool>;
    /// Fails every `pending` attempt created before `claimed_before` and
    /// moves its occurrence from `pending` to `failure`.
    async fn expire_stale_claims(
        &self,
        claimed_before: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ExpiredClaim>>;
    async fn resolve_response(
        &self,
        resolution: &ResponseResolution,
    ) -> anyhow::Result<ResolutionOutcome>;
    /// Saves the reminder and swaps its `pending` occurrences after `after`
    /// for `occurrences`, as one unit.
    async fn reschedule(
        &self,
        reminder: &Reminder,
        after: DateTime<Utc>,
        occurrences: &[ReminderOccurrence],
    ) -> anyhow::Result<ReplaceFutureResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CarecallContext;
    use carecall_domain::{Channel, Medicine, ReminderOccurrence};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    async fn pending_occurrence(ctx: &CarecallContext) -> ReminderOccurrence {
        let occurrence = ReminderOccurrence::new(ID::new(), now(), 3, now());
        ctx.repos.occurrences.insert_if_absent(&occurrence).await.unwrap();
        occurrence
    }

    async fn sent_attempt(ctx: &CarecallContext, occurrence: &ReminderOccurrence) -> NotificationAttempt {
        let attempt =
            NotificationAttempt::pending(occurrence.id.clone(), Channel::WhatsApp, "+56911".into(), now());
        assert!(ctx.repos.deliveries.begin_dispatch(&attempt).await.unwrap());
        let outcome = DispatchOutcome::Sent {
            provider_message_id: Some("wamid.1".into()),
        };
        assert!(ctx
            .repos
            .deliveries
            .record_dispatch(&occurrence.id, &attempt.id, &outcome, now())
            .await
            .unwrap());
        attempt
    }

    #[tokio::test]
    async fn claims_only_pending_occurrences_once() {
        let ctx = CarecallContext::create_inmemory();
        let occurrence = pending_occurrence(&ctx).await;

        let first =
            NotificationAttempt::pending(occurrence.id.clone(), Channel::WhatsApp, "+56911".into(), now());
        let second =
            NotificationAttempt::pending(occurrence.id.clone(), Channel::Voice, "+56911".into(), now());
        assert!(ctx.repos.deliveries.begin_dispatch(&first).await.unwrap());
        assert!(!ctx.repos.deliveries.begin_dispatch(&second).await.unwrap());

        let unknown = NotificationAttempt::pending(ID::new(), Channel::Voice, "+56911".into(), now());
        assert!(!ctx.repos.deliveries.begin_dispatch(&unknown).await.unwrap());
    }

    #[tokio::test]
    async fn records_successful_dispatch() {
        let ctx = CarecallContext::create_inmemory();
        let occurrence = pending_occurrence(&ctx).await;
        let attempt = sent_attempt(&ctx, &occurrence).await;

        let occurrence = ctx.repos.occurrences.find(&occurrence.id).await.unwrap().unwrap();
        assert_eq!(occurrence.status, OccurrenceStatus::Waiting);
        assert_eq!(occurrence.provider_message_id.as_deref(), Some("wamid.1"));
        let attempt = ctx.repos.attempts.find(&attempt.id).await.unwrap().unwrap();
        assert_eq!(attempt.status, AttemptStatus::Sent);
        assert_eq!(attempt.sent_at, Some(now()));
    }

    #[tokio::test]
    async fn records_failed_dispatch() {
        let ctx = CarecallContext::create_inmemory();
        let occurrence = pending_occurrence(&ctx).await;
        let attempt =
            NotificationAttempt::pending(occurrence.id.clone(), Channel::WhatsApp, "+56911".into(), now());
        ctx.repos.deliveries.begin_dispatch(&attempt).await.unwrap();

        let outcome = DispatchOutcome::Failed {
            error: "provider down".into(),
        };
        let transitioned = ctx
            .repos
            .deliveries
            .record_dispatch(&occurrence.id, &attempt.id, &outcome, now())
            .await
            .unwrap();
        assert!(transitioned);

        let occurrence = ctx.repos.occurrences.find(&occurrence.id).await.unwrap().unwrap();
        assert_eq!(occurrence.status, OccurrenceStatus::Failure);
        let attempt = ctx.repos.attempts.find(&attempt.id).await.unwrap().unwrap();
        assert_eq!(attempt.status, AttemptStatus::Failed);
        assert_eq!(attempt.error_message.as_deref(), Some("provider down"));
    }

    #[tokio::test]
    async fn resolves_once_and_floors_stock() {
        let ctx = CarecallContext::create_inmemory();
        let occurrence = pending_occurrence(&ctx).await;
        let attempt = sent_attempt(&ctx, &occurrence).await;

        let mut medicine = Medicine::new(ID::new(), "Paracetamol".into(), now());
        medicine.tablets_left = Some(1);
        ctx.repos.medicines.insert(&medicine).await.unwrap();

        let resolution = ResponseResolution {
            occurrence_id: occurrence.id.clone(),
            attempt_id: Some(attempt.id.clone()),
            resolved_status: OccurrenceStatus::Success,
            attempt_status: AttemptStatus::Delivered,
            response: "taken: Ya lo tomé".into(),
            at: now(),
            stock: Some(StockDecrement {
                medicine_id: medicine.id.clone(),
                tablets: 2,
            }),
        };
        let outcome = ctx.repos.deliveries.resolve_response(&resolution).await.unwrap();
        assert_eq!(
            outcome,
            ResolutionOutcome::Applied {
                tablets_left: Some(0)
            }
        );

        let again = ctx.repos.deliveries.resolve_response(&resolution).await.unwrap();
        assert_eq!(
            again,
            ResolutionOutcome::AlreadyResolved(OccurrenceStatus::Success)
        );

        let medicine = ctx.repos.medicines.find(&medicine.id).await.unwrap().unwrap();
        assert_eq!(medicine.tablets_left, Some(0));
        let occurrence = ctx.repos.occurrences.find(&occurrence.id).await.unwrap().unwrap();
        assert_eq!(occurrence.taken_at, Some(now()));
        let attempt = ctx.repos.attempts.find(&attempt.id).await.unwrap().unwrap();
        assert_eq!(attempt.status, AttemptStatus::Delivered);
        assert_eq!(attempt.response.as_deref(), Some("taken: Ya lo tomé"));
    }

    #[tokio::test]
    async fn expires_only_stale_claims() {
        let ctx = CarecallContext::create_inmemory();
        let stale_occurrence = pending_occurrence(&ctx).await;
        let stale =
            NotificationAttempt::pending(stale_occurrence.id.clone(), Channel::Voice, "+56911".into(), now());
        assert!(ctx.repos.deliveries.begin_dispatch(&stale).await.unwrap());

        let later = now() + chrono::Duration::hours(1);
        let fresh_occurrence = ReminderOccurrence::new(ID::new(), now(), 3, now());
        ctx.repos.occurrences.insert_if_absent(&fresh_occurrence).await.unwrap();
        let fresh = NotificationAttempt::pending(
            fresh_occurrence.id.clone(),
            Channel::Voice,
            "+56922".into(),
            later - chrono::Duration::seconds(10),
        );
        assert!(ctx.repos.deliveries.begin_dispatch(&fresh).await.unwrap());

        let expired = ctx
            .repos
            .deliveries
            .expire_stale_claims(later - chrono::Duration::seconds(30), later)
            .await
            .unwrap();
        assert_eq!(
            expired,
            vec![ExpiredClaim {
                occurrence_id: stale_occurrence.id.clone(),
                reminder_id: stale_occurrence.reminder_id.clone(),
            }]
        );

        let occurrence = ctx.repos.occurrences.find(&stale_occurrence.id).await.unwrap().unwrap();
        assert_eq!(occurrence.status, OccurrenceStatus::Failure);
        assert_eq!(occurrence.updated, later);
        let attempt = ctx.repos.attempts.find(&stale.id).await.unwrap().unwrap();
        assert_eq!(attempt.status, AttemptStatus::Failed);
        assert_eq!(attempt.error_message.as_deref(), Some(INTERRUPTED_DISPATCH));

        let occurrence = ctx.repos.occurrences.find(&fresh_occurrence.id).await.unwrap().unwrap();
        assert_eq!(occurrence.status, OccurrenceStatus::Pending);
        let attempt = ctx.repos.attempts.find(&fresh.id).await.unwrap().unwrap();
        assert_eq!(attempt.status, AttemptStatus::Pending);

        // A late outcome of the expired dispatch changes nothing
        let outcome = DispatchOutcome::Sent {
            provider_message_id: Some("CA1".into()),
        };
        assert!(!ctx
            .repos
            .deliveries
            .record_dispatch(&stale_occurrence.id, &stale.id, &outcome, later)
            .await
            .unwrap());
        let occurrence = ctx.repos.occurrences.find(&stale_occurrence.id).await.unwrap().unwrap();
        assert_eq!(occurrence.status, OccurrenceStatus::Failure);
    }

    #[tokio::test]
    async fn reschedule_saves_the_reminder_with_its_occurrences() {
        let ctx = CarecallContext::create_inmemory();
        let mut reminder = Reminder::new(carecall_domain::ReminderType::Other, now(), now());
        reminder.periodicity = Some(60);
        ctx.repos.reminders.insert(&reminder).await.unwrap();

        let old = ReminderOccurrence::new(reminder.id.clone(), now() + chrono::Duration::hours(1), 3, now());
        ctx.repos.occurrences.insert_if_absent(&old).await.unwrap();

        reminder.periodicity = Some(120);
        let new = ReminderOccurrence::new(reminder.id.clone(), now() + chrono::Duration::hours(2), 3, now());
        let res = ctx
            .repos
            .deliveries
            .reschedule(&reminder, now(), &[new.clone()])
            .await
            .unwrap();
        assert_eq!(res.deleted, 1);
        assert_eq!(res.inserted, 1);

        let stored = ctx.repos.reminders.find(&reminder.id).await.unwrap().unwrap();
        assert_eq!(stored.periodicity, Some(120));
        let occurrences = ctx.repos.occurrences.find_by_reminder(&reminder.id).await.unwrap();
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].id, new.id);
    }

    #[tokio::test]
    async fn reschedule_of_unknown_reminder_writes_nothing() {
        let ctx = CarecallContext::create_inmemory();
        let reminder = Reminder::new(carecall_domain::ReminderType::Other, now(), now());
        let occurrence = ReminderOccurrence::new(reminder.id.clone(), now() + chrono::Duration::hours(1), 3, now());

        assert!(ctx
            .repos
            .deliveries
            .reschedule(&reminder, now(), &[occurrence])
            .await
            .is_err());
        assert!(ctx
            .repos
            .occurrences
            .find_by_reminder(&reminder.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn unknown_occurrence_is_reported() {
        let ctx = CarecallContext::create_inmemory();
        let resolution = ResponseResolution {
            occurrence_id: ID::new(),
            attempt_id: None,
            resolved_status: OccurrenceStatus::Rejected,
            attempt_status: AttemptStatus::Delivered,
            response: "skip: Omitir".into(),
            at: now(),
            stock: None,
        };
        let outcome = ctx.repos.deliveries.resolve_response(&resolution).await.unwrap();
        assert_eq!(outcome, ResolutionOutcome::OccurrenceNotFound);
    }
}
