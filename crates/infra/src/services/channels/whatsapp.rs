use super::{ensure_success, network_error, INotificationChannel, OutboundMessage};
use crate::config::KapsoConfig;
use carecall_domain::Channel;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::error;

const PROVIDER: &str = "Kapso";

/// WhatsApp interactive button messages through the Kapso Meta proxy
pub struct KapsoWhatsAppChannel {
    client: Client,
    config: KapsoConfig,
}

impl KapsoWhatsAppChannel {
    pub fn new(config: KapsoConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[derive(Debug, Serialize)]
struct ReplyButton<'a> {
    id: &'a str,
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct Button<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    reply: ReplyButton<'a>,
}

#[derive(Debug, Serialize)]
struct InteractiveBody<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct InteractiveAction<'a> {
    buttons: Vec<Button<'a>>,
}

#[derive(Debug, Serialize)]
struct Interactive<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    body: InteractiveBody<'a>,
    action: InteractiveAction<'a>,
}

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    interactive: Interactive<'a>,
}

#[derive(Debug, Deserialize)]
struct MessageId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    messages: Vec<MessageId>,
}

#[async_trait::async_trait]
impl INotificationChannel for KapsoWhatsAppChannel {
    fn channel(&self) -> Channel {
        Channel::WhatsApp
    }

    async fn send(&self, message: &OutboundMessage) -> anyhow::Result<Option<String>> {
        let body = MessageRequest {
            messaging_product: "whatsapp",
            to: &message.recipient,
            kind: "interactive",
            interactive: Interactive {
                kind: "button",
                body: InteractiveBody {
                    text: &message.text,
                },
                action: InteractiveAction {
                    buttons: message
                        .choices
                        .iter()
                        .map(|choice| Button {
                            kind: "reply",
                            reply: ReplyButton {
                                id: choice.id,
                                title: choice.title,
                            },
                        })
                        .collect(),
                },
            },
        };

        let url = format!(
            "{}/v21.0/{}/messages",
            self.config.base_url.trim_end_matches('/'),
            self.config.phone_number_id
        );
        let res = self
            .client
            .post(&url)
            .header("X-API-Key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;
        let res = ensure_success(PROVIDER, res).await?;

        let res = res.json::<MessageResponse>().await.map_err(|e| {
            error!(
                "[Unexpected Response] Kapso API POST error. Error message: {:?}",
                e
            );
            anyhow::Error::new(e)
        })?;

        Ok(res.messages.into_iter().next().map(|m| m.id))
    }
}
