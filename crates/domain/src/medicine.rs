use crate::shared::entity::{Entity, ID};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Medicine {
    pub id: ID,
    pub elderly_id: ID,
    pub name: String,
    pub dosage: Option<String>,
    pub total_tablets: Option<i32>,
    /// Stock still available. Never goes below zero.
    pub tablets_left: Option<i32>,
    pub tablets_per_dose: Option<i32>,
    pub notes: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Medicine {
    pub fn new(elderly_id: ID, name: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Default::default(),
            elderly_id,
            name,
            dosage: None,
            total_tablets: None,
            tablets_left: None,
            tablets_per_dose: None,
            notes: None,
            created: now,
            updated: now,
        }
    }

    /// Tablets consumed by one confirmed dose
    pub fn dose(&self) -> i32 {
        self.tablets_per_dose.filter(|n| *n > 0).unwrap_or(1)
    }
}

impl Entity for Medicine {
    fn id(&self) -> &ID {
        &self.id
    }
}
