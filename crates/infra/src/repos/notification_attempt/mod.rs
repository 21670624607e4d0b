mod inmemory;
mod postgres;

pub use inmemory::InMemoryNotificationAttemptRepo;
pub use postgres::PostgresNotificationAttemptRepo;

use carecall_domain::{Channel, NotificationAttempt, ID};

#[async_trait::async_trait]
pub trait INotificationAttemptRepo: Send + Sync {
    async fn find(&self, attempt_id: &ID) -> anyhow::Result<Option<NotificationAttempt>>;
    /// Oldest first
    async fn find_by_occurrence(&self, occurrence_id: &ID)
        -> anyhow::Result<Vec<NotificationAttempt>>;
    async fn find_latest_sent_for_occurrence(
        &self,
        occurrence_id: &ID,
    ) -> anyhow::Result<Option<NotificationAttempt>>;
    /// `sent` attempts addressed to `recipient` over `channel`, newest first
    async fn find_sent_for_recipient(
        &self,
        channel: Channel,
        recipient: &str,
    ) -> anyhow::Result<Vec<NotificationAttempt>>;
}
