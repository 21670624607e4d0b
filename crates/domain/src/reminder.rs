use crate::{
    recurrence::Recurrence,
    shared::entity::{Entity, ID},
};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

/// One of the buttons (or spoken answers) offered to the recipient of a reminder.
/// The `id` is what providers echo back when the button is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionChoice {
    pub id: &'static str,
    pub title: &'static str,
}

pub const CHOICE_TAKEN: ActionChoice = ActionChoice {
    id: "taken",
    title: "Ya lo tomé",
};
pub const CHOICE_SKIP: ActionChoice = ActionChoice {
    id: "skip",
    title: "Omitir",
};
pub const CHOICE_CONFIRM: ActionChoice = ActionChoice {
    id: "confirm",
    title: "Confirmar",
};
pub const CHOICE_CANCEL: ActionChoice = ActionChoice {
    id: "cancel",
    title: "Cancelar",
};
pub const CHOICE_DISMISS: ActionChoice = ActionChoice {
    id: "dismiss",
    title: "Descartar",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderType {
    Medicine,
    Appointment,
    Other,
}

impl ReminderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medicine => "medicine",
            Self::Appointment => "appointment",
            Self::Other => "other",
        }
    }

    /// The positive choice first, the negative one second.
    pub fn choices(&self) -> [ActionChoice; 2] {
        match self {
            Self::Medicine => [CHOICE_TAKEN, CHOICE_SKIP],
            Self::Appointment => [CHOICE_CONFIRM, CHOICE_CANCEL],
            Self::Other => [CHOICE_CONFIRM, CHOICE_DISMISS],
        }
    }
}

impl Display for ReminderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("Reminder type: {0} is not one of medicine, appointment or other")]
pub struct InvalidReminderTypeError(String);

impl FromStr for ReminderType {
    type Err = InvalidReminderTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "medicine" => Ok(Self::Medicine),
            "appointment" => Ok(Self::Appointment),
            "other" => Ok(Self::Other),
            _ => Err(InvalidReminderTypeError(s.to_string())),
        }
    }
}

/// A `Reminder` is the recurrence rule that occurrences are generated from.
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub id: ID,
    pub reminder_type: ReminderType,
    pub start_date: DateTime<Utc>,
    /// Minutes between two occurrences. `None` or a non-positive value
    /// makes this a one-shot reminder.
    pub periodicity: Option<i64>,
    /// Last calendar day (in the configured timezone) on which the
    /// reminder may fire.
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub medicine_id: Option<ID>,
    pub appointment_id: Option<ID>,
    pub elderly_profile_id: Option<ID>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Reminder {
    pub fn new(reminder_type: ReminderType, start_date: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            id: Default::default(),
            reminder_type,
            start_date,
            periodicity: None,
            end_date: None,
            is_active: true,
            medicine_id: None,
            appointment_id: None,
            elderly_profile_id: None,
            created: now,
            updated: now,
        }
    }

    pub fn recurrence(&self, tz: &Tz) -> Recurrence {
        Recurrence::from_reminder(self, tz)
    }

    /// Whether `other` would generate a different series of occurrences than `self`.
    pub fn schedule_differs(&self, other: &Reminder) -> bool {
        self.start_date != other.start_date
            || self.effective_periodicity() != other.effective_periodicity()
            || self.end_date != other.end_date
            || self.is_active != other.is_active
    }

    pub fn effective_periodicity(&self) -> Option<i64> {
        self.periodicity.filter(|minutes| *minutes > 0)
    }
}

impl Entity for Reminder {
    fn id(&self) -> &ID {
        &self.id
    }
}
