use crate::shared::entity::{Entity, ID};
use chrono::{DateTime, Utc};

/// The person reminders are addressed to
#[derive(Debug, Clone, PartialEq)]
pub struct ElderlyProfile {
    pub id: ID,
    pub full_name: String,
    pub phone: Option<String>,
    pub emergency_contact: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub created: DateTime<Utc>,
}

impl ElderlyProfile {
    pub fn new(full_name: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Default::default(),
            full_name,
            phone: None,
            emergency_contact: None,
            telegram_chat_id: None,
            created: now,
        }
    }

    /// First name, used to address the person in messages
    pub fn first_name(&self) -> Option<&str> {
        self.full_name.split_whitespace().next()
    }
}

impl Entity for ElderlyProfile {
    fn id(&self) -> &ID {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Appointment {
    pub id: ID,
    pub elderly_id: ID,
    pub scheduled_datetime: DateTime<Utc>,
    pub doctor_name: Option<String>,
    pub specialty: Option<String>,
    pub address: Option<String>,
    pub created: DateTime<Utc>,
}

impl Appointment {
    pub fn new(elderly_id: ID, scheduled_datetime: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            id: Default::default(),
            elderly_id,
            scheduled_datetime,
            doctor_name: None,
            specialty: None,
            address: None,
            created: now,
        }
    }
}

impl Entity for Appointment {
    fn id(&self) -> &ID {
        &self.id
    }
}
