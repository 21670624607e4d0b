use super::{ensure_success, network_error, INotificationChannel, OutboundMessage};
use crate::config::TelegramConfig;
use carecall_domain::Channel;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::error;

const PROVIDER: &str = "Telegram";

/// Bot API messages with an inline keyboard holding the reminder choices
pub struct TelegramChannel {
    client: Client,
    config: TelegramConfig,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[derive(Debug, Serialize)]
struct InlineKeyboardButton<'a> {
    text: &'a str,
    callback_data: &'a str,
}

#[derive(Debug, Serialize)]
struct ReplyMarkup<'a> {
    inline_keyboard: Vec<Vec<InlineKeyboardButton<'a>>>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    reply_markup: ReplyMarkup<'a>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
    chat: Chat,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    result: Option<SentMessage>,
    description: Option<String>,
}

/// Provider message id of a Telegram message, as echoed back in callback queries
pub fn telegram_message_id(chat_id: i64, message_id: i64) -> String {
    format!("{}:{}", chat_id, message_id)
}

#[async_trait::async_trait]
impl INotificationChannel for TelegramChannel {
    fn channel(&self) -> Channel {
        Channel::Telegram
    }

    async fn send(&self, message: &OutboundMessage) -> anyhow::Result<Option<String>> {
        let body = SendMessageRequest {
            chat_id: &message.recipient,
            text: &message.text,
            reply_markup: ReplyMarkup {
                inline_keyboard: vec![message
                    .choices
                    .iter()
                    .map(|choice| InlineKeyboardButton {
                        text: choice.title,
                        callback_data: choice.id,
                    })
                    .collect()],
            },
        };

        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.base_url.trim_end_matches('/'),
            self.config.bot_token
        );
        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;
        let res = ensure_success(PROVIDER, res).await?;

        let res = res.json::<SendMessageResponse>().await.map_err(|e| {
            error!(
                "[Unexpected Response] Telegram API POST error. Error message: {:?}",
                e
            );
            anyhow::Error::new(e)
        })?;

        match res.result {
            Some(sent) if res.ok => Ok(Some(telegram_message_id(sent.chat.id, sent.message_id))),
            _ => anyhow::bail!(
                "Telegram API rejected the message: {}",
                res.description.unwrap_or_default()
            ),
        }
    }
}
