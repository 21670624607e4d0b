mod inmemory;
mod postgres;

pub use inmemory::InMemoryOccurrenceRepo;
pub use postgres::PostgresOccurrenceRepo;
pub(crate) use inmemory::replace_future_locked;
pub(crate) use postgres::replace_future_in;

use carecall_domain::{ReminderOccurrence, ID};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaceFutureResult {
    pub deleted: u64,
    pub inserted: u64,
}

#[async_trait::async_trait]
pub trait IOccurrenceRepo: Send + Sync {
    /// Inserts the occurrence unless one already exists for the same
    /// reminder and scheduled instant. Returns whether it was inserted.
    async fn insert_if_absent(&self, occurrence: &ReminderOccurrence) -> anyhow::Result<bool>;
    async fn find(&self, occurrence_id: &ID) -> anyhow::Result<Option<ReminderOccurrence>>;
    async fn find_by_reminder_and_time(
        &self,
        reminder_id: &ID,
        scheduled_datetime: DateTime<Utc>,
    ) -> anyhow::Result<Option<ReminderOccurrence>>;
    /// The occurrence of the reminder with the latest scheduled instant
    async fn find_latest(&self, reminder_id: &ID) -> anyhow::Result<Option<ReminderOccurrence>>;
    async fn find_by_reminder(&self, reminder_id: &ID) -> anyhow::Result<Vec<ReminderOccurrence>>;
    /// `pending` occurrences scheduled at or before `now`, oldest first
    async fn find_pending_due(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<ReminderOccurrence>>;
    async fn find_by_provider_message_id(
        &self,
        provider_message_id: &str,
    ) -> anyhow::Result<Option<ReminderOccurrence>>;
    /// Atomically drops the `pending` occurrences of the reminder scheduled
    /// after `after` and inserts `occurrences`, skipping instants that still
    /// have an occurrence.
    async fn replace_future(
        &self,
        reminder_id: &ID,
        after: DateTime<Utc>,
        occurrences: &[ReminderOccurrence],
    ) -> anyhow::Result<ReplaceFutureResult>;
    /// Moves a `failure` occurrence back to `pending` and bumps its retry
    /// count, unless it has used up its retries. Returns the updated
    /// occurrence when the reset happened.
    async fn reset_for_retry(
        &self,
        occurrence_id: &ID,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<ReminderOccurrence>>;
}
