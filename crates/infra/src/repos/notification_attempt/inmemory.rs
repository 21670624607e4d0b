use super::INotificationAttemptRepo;
use crate::repos::shared::inmemory_repo::*;
use carecall_domain::{AttemptStatus, Channel, NotificationAttempt, ID};
use std::sync::Mutex;

pub struct InMemoryNotificationAttemptRepo {
    pub(crate) attempts: Mutex<Vec<NotificationAttempt>>,
}

impl InMemoryNotificationAttemptRepo {
    pub fn new() -> Self {
        Self {
            attempts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl INotificationAttemptRepo for InMemoryNotificationAttemptRepo {
    async fn find(&self, attempt_id: &ID) -> anyhow::Result<Option<NotificationAttempt>> {
        Ok(find(attempt_id, &self.attempts))
    }

    async fn find_by_occurrence(
        &self,
        occurrence_id: &ID,
    ) -> anyhow::Result<Vec<NotificationAttempt>> {
        // Insertion order is creation order
        Ok(find_by(&self.attempts, |a| a.occurrence_id == *occurrence_id))
    }

    async fn find_latest_sent_for_occurrence(
        &self,
        occurrence_id: &ID,
    ) -> anyhow::Result<Option<NotificationAttempt>> {
        Ok(find_by(&self.attempts, |a| {
            a.occurrence_id == *occurrence_id && a.status == AttemptStatus::Sent
        })
        .pop())
    }

    async fn find_sent_for_recipient(
        &self,
        channel: Channel,
        recipient: &str,
    ) -> anyhow::Result<Vec<NotificationAttempt>> {
        let mut attempts = find_by(&self.attempts, |a| {
            a.channel == channel && a.recipient == recipient && a.status == AttemptStatus::Sent
        });
        attempts.reverse();
        Ok(attempts)
    }
}
