use super::IReminderRepo;
use crate::repos::shared::inmemory_repo::*;
use carecall_domain::{Reminder, ID};
use chrono::{DateTime, Utc};
use std::sync::Mutex;

pub struct InMemoryReminderRepo {
    pub(crate) reminders: Mutex<Vec<Reminder>>,
}

impl InMemoryReminderRepo {
    pub fn new() -> Self {
        Self {
            reminders: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IReminderRepo for InMemoryReminderRepo {
    async fn insert(&self, reminder: &Reminder) -> anyhow::Result<()> {
        insert(reminder, &self.reminders);
        Ok(())
    }

    async fn save(&self, reminder: &Reminder) -> anyhow::Result<()> {
        if !save(reminder, &self.reminders) {
            anyhow::bail!("Reminder {} does not exist", reminder.id);
        }
        Ok(())
    }

    async fn find(&self, reminder_id: &ID) -> anyhow::Result<Option<Reminder>> {
        Ok(find(reminder_id, &self.reminders))
    }

    async fn find_active_started(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<Reminder>> {
        let mut reminders = find_by(&self.reminders, |r| r.is_active && r.start_date <= now);
        reminders.sort_by_key(|r| r.start_date);
        Ok(reminders)
    }

    async fn delete(&self, reminder_id: &ID) -> anyhow::Result<Option<Reminder>> {
        Ok(delete(reminder_id, &self.reminders))
    }
}
