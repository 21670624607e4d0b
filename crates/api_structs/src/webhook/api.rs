use carecall_domain::{OccurrenceStatus, ID};
use serde::{Deserialize, Serialize};

pub mod receive_webhook {
    use super::*;

    #[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
    #[serde(rename_all = "lowercase")]
    pub enum WebhookStatus {
        /// The answer resolved an occurrence
        Success,
        /// Nothing to do, e.g. a duplicate delivery or a status callback
        Ignored,
        /// The payload could not be handled. Providers are still acknowledged.
        Error,
    }

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub status: WebhookStatus,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        pub occurrence_id: Option<ID>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        pub resolved_status: Option<OccurrenceStatus>,
        pub message: String,
    }
}
