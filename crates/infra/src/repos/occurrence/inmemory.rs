use super::{IOccurrenceRepo, ReplaceFutureResult};
use crate::repos::shared::inmemory_repo::*;
use carecall_domain::{OccurrenceStatus, ReminderOccurrence, ID};
use chrono::{DateTime, Utc};
use std::sync::Mutex;

pub struct InMemoryOccurrenceRepo {
    pub(crate) occurrences: Mutex<Vec<ReminderOccurrence>>,
}

impl InMemoryOccurrenceRepo {
    pub fn new() -> Self {
        Self {
            occurrences: Mutex::new(Vec::new()),
        }
    }
}

fn is_same_slot(
    occurrence: &ReminderOccurrence,
    reminder_id: &ID,
    scheduled_datetime: DateTime<Utc>,
) -> bool {
    occurrence.reminder_id == *reminder_id && occurrence.scheduled_datetime == scheduled_datetime
}

pub(crate) fn replace_future_locked(
    collection: &mut Vec<ReminderOccurrence>,
    reminder_id: &ID,
    after: DateTime<Utc>,
    occurrences: &[ReminderOccurrence],
) -> ReplaceFutureResult {
    let deleted = find_and_delete_by(collection, |o| {
        o.reminder_id == *reminder_id
            && o.scheduled_datetime > after
            && o.status == OccurrenceStatus::Pending
    });

    let mut inserted = 0;
    for occurrence in occurrences {
        if collection
            .iter()
            .any(|o| is_same_slot(o, &occurrence.reminder_id, occurrence.scheduled_datetime))
        {
            continue;
        }
        collection.push(occurrence.clone());
        inserted += 1;
    }

    ReplaceFutureResult {
        deleted: deleted.len() as u64,
        inserted,
    }
}

#[async_trait::async_trait]
impl IOccurrenceRepo for InMemoryOccurrenceRepo {
    async fn insert_if_absent(&self, occurrence: &ReminderOccurrence) -> anyhow::Result<bool> {
        let mut occurrences = self.occurrences.lock().unwrap();
        if occurrences.iter().any(|o| {
            is_same_slot(o, &occurrence.reminder_id, occurrence.scheduled_datetime)
        }) {
            return Ok(false);
        }
        occurrences.push(occurrence.clone());
        Ok(true)
    }

    async fn find(&self, occurrence_id: &ID) -> anyhow::Result<Option<ReminderOccurrence>> {
        Ok(find(occurrence_id, &self.occurrences))
    }

    async fn find_by_reminder_and_time(
        &self,
        reminder_id: &ID,
        scheduled_datetime: DateTime<Utc>,
    ) -> anyhow::Result<Option<ReminderOccurrence>> {
        Ok(find_by(&self.occurrences, |o| {
            is_same_slot(o, reminder_id, scheduled_datetime)
        })
        .into_iter()
        .next())
    }

    async fn find_latest(&self, reminder_id: &ID) -> anyhow::Result<Option<ReminderOccurrence>> {
        Ok(find_by(&self.occurrences, |o| o.reminder_id == *reminder_id)
            .into_iter()
            .max_by_key(|o| o.scheduled_datetime))
    }

    async fn find_by_reminder(&self, reminder_id: &ID) -> anyhow::Result<Vec<ReminderOccurrence>> {
        let mut occurrences = find_by(&self.occurrences, |o| o.reminder_id == *reminder_id);
        occurrences.sort_by_key(|o| o.scheduled_datetime);
        Ok(occurrences)
    }

    async fn find_pending_due(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<ReminderOccurrence>> {
        let mut occurrences = find_by(&self.occurrences, |o| {
            o.status == OccurrenceStatus::Pending && o.scheduled_datetime <= now
        });
        occurrences.sort_by_key(|o| o.scheduled_datetime);
        Ok(occurrences)
    }

    async fn find_by_provider_message_id(
        &self,
        provider_message_id: &str,
    ) -> anyhow::Result<Option<ReminderOccurrence>> {
        Ok(find_by(&self.occurrences, |o| {
            o.provider_message_id.as_deref() == Some(provider_message_id)
        })
        .into_iter()
        .max_by_key(|o| o.updated))
    }

    async fn replace_future(
        &self,
        reminder_id: &ID,
        after: DateTime<Utc>,
        occurrences: &[ReminderOccurrence],
    ) -> anyhow::Result<ReplaceFutureResult> {
        let mut collection = self.occurrences.lock().unwrap();
        Ok(replace_future_locked(
            &mut collection,
            reminder_id,
            after,
            occurrences,
        ))
    }

    async fn reset_for_retry(
        &self,
        occurrence_id: &ID,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<ReminderOccurrence>> {
        let mut collection = self.occurrences.lock().unwrap();
        let occurrence = match collection.iter_mut().find(|o| o.id == *occurrence_id) {
            Some(occurrence) if occurrence.can_be_reset() => occurrence,
            _ => return Ok(None),
        };
        occurrence.status = OccurrenceStatus::Pending;
        occurrence.retry_count += 1;
        occurrence.provider_message_id = None;
        if notes.is_some() {
            occurrence.notes = notes;
        }
        occurrence.updated = now;
        Ok(Some(occurrence.clone()))
    }
}
