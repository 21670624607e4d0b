mod medicine;
mod notification;
mod occurrence;
mod profile;
mod recurrence;
mod reminder;
mod response;
mod shared;

pub use chrono_tz::Tz;
pub use medicine::Medicine;
pub use notification::{
    AttemptStatus, Channel, DispatchOutcome, InvalidAttemptStatusError, InvalidChannelError,
    NotificationAttempt,
};
pub use occurrence::{InvalidOccurrenceStatusError, OccurrenceStatus, ReminderOccurrence};
pub use profile::{Appointment, ElderlyProfile};
pub use recurrence::Recurrence;
pub use reminder::{
    ActionChoice, InvalidReminderTypeError, Reminder, ReminderType, CHOICE_CANCEL,
    CHOICE_CONFIRM, CHOICE_DISMISS, CHOICE_SKIP, CHOICE_TAKEN,
};
pub use response::{classify_response, ResponseKind};
pub use shared::entity::{Entity, InvalidIDError, ID};
