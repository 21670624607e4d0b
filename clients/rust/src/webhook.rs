use crate::{APIResponse, BaseClient};
use carecall_api_structs::receive_webhook;
use reqwest::StatusCode;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};

/// Posts provider callbacks, for tests and for replaying lost callbacks
#[derive(Clone)]
pub struct WebhookClient {
    base: Arc<BaseClient>,
}

impl WebhookClient {
    pub(crate) fn new(base: Arc<BaseClient>) -> Self {
        Self { base }
    }

    pub async fn whatsapp(&self, payload: Value) -> APIResponse<receive_webhook::APIResponse> {
        self.base
            .post(payload, "webhooks/whatsapp".into(), StatusCode::OK)
            .await
    }

    pub async fn telegram(&self, payload: Value) -> APIResponse<receive_webhook::APIResponse> {
        self.base
            .post(payload, "webhooks/telegram".into(), StatusCode::OK)
            .await
    }

    pub async fn voice(
        &self,
        form: HashMap<String, String>,
    ) -> APIResponse<receive_webhook::APIResponse> {
        self.base
            .post_form(form, "webhooks/voice".into(), StatusCode::OK)
            .await
    }
}
