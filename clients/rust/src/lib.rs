mod base;
mod occurrence;
mod reminder;
mod status;
mod webhook;

pub(crate) use base::BaseClient;
pub use base::{APIError, APIErrorVariant, APIResponse};
pub use carecall_api_structs::dtos::*;
pub use carecall_api_structs::receive_webhook::WebhookStatus;
pub use carecall_domain::{AttemptStatus, Channel, OccurrenceStatus, ReminderType, ID};
use occurrence::OccurrenceClient;
use reminder::ReminderClient;
pub use reminder::{CreateReminderInput, UpdateReminderScheduleInput};
use status::StatusClient;
use std::sync::Arc;
use webhook::WebhookClient;

// Domain
pub use carecall_api_structs::dtos::NotificationAttemptDTO as NotificationAttempt;
pub use carecall_api_structs::dtos::OccurrenceDTO as Occurrence;
pub use carecall_api_structs::dtos::ReminderDTO as Reminder;
pub use carecall_api_structs::dtos::RunSummaryDTO as RunSummary;

/// Carecall SDK
///
/// The SDK contains methods for interacting with the Carecall server
/// API.
#[derive(Clone)]
pub struct CarecallSDK {
    pub occurrence: OccurrenceClient,
    pub reminder: ReminderClient,
    pub status: StatusClient,
    pub webhook: WebhookClient,
}

impl CarecallSDK {
    pub fn new(address: String) -> Self {
        let base = Arc::new(BaseClient::new(address));
        let occurrence = OccurrenceClient::new(base.clone());
        let reminder = ReminderClient::new(base.clone());
        let status = StatusClient::new(base.clone());
        let webhook = WebhookClient::new(base);

        Self {
            occurrence,
            reminder,
            status,
            webhook,
        }
    }
}
