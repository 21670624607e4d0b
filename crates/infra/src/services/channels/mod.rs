mod inmemory;
mod telegram;
mod voice;
mod whatsapp;

use crate::config::Config;
use carecall_domain::{ActionChoice, Channel, ID};
use reqwest::Response;
use std::sync::Arc;
use tracing::error;

pub use inmemory::InMemoryChannel;
pub use telegram::{telegram_message_id, TelegramChannel};
pub use voice::TwilioVoiceChannel;
pub use whatsapp::KapsoWhatsAppChannel;

/// A rendered reminder, ready to be handed to a provider
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub occurrence_id: ID,
    /// Phone number or chat id, depending on the channel
    pub recipient: String,
    pub text: String,
    pub choices: Vec<ActionChoice>,
}

#[async_trait::async_trait]
pub trait INotificationChannel: Send + Sync {
    fn channel(&self) -> Channel;
    /// Hands the message to the provider. Returns the id the provider
    /// assigned to it, which later correlates the recipient's answer.
    async fn send(&self, message: &OutboundMessage) -> anyhow::Result<Option<String>>;
}

/// Stands in for a provider whose credentials are missing
pub struct UnconfiguredChannel {
    channel: Channel,
    missing: &'static str,
}

impl UnconfiguredChannel {
    pub fn new(channel: Channel, missing: &'static str) -> Self {
        Self { channel, missing }
    }
}

#[async_trait::async_trait]
impl INotificationChannel for UnconfiguredChannel {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(&self, _message: &OutboundMessage) -> anyhow::Result<Option<String>> {
        anyhow::bail!(
            "The {} channel is not configured. Set {}.",
            self.channel,
            self.missing
        )
    }
}

#[derive(Clone)]
pub struct Channels {
    pub whatsapp: Arc<dyn INotificationChannel>,
    pub telegram: Arc<dyn INotificationChannel>,
    pub voice: Arc<dyn INotificationChannel>,
}

impl Channels {
    pub fn from_config(config: &Config) -> Self {
        let whatsapp: Arc<dyn INotificationChannel> = match &config.kapso {
            Some(kapso) => Arc::new(KapsoWhatsAppChannel::new(kapso.clone())),
            None => Arc::new(UnconfiguredChannel::new(
                Channel::WhatsApp,
                "KAPSO_API_KEY and KAPSO_PHONE_NUMBER_ID",
            )),
        };
        let telegram: Arc<dyn INotificationChannel> = match &config.telegram {
            Some(telegram) => Arc::new(TelegramChannel::new(telegram.clone())),
            None => Arc::new(UnconfiguredChannel::new(
                Channel::Telegram,
                "TELEGRAM_BOT_TOKEN",
            )),
        };
        let voice: Arc<dyn INotificationChannel> = match &config.twilio {
            Some(twilio) => Arc::new(TwilioVoiceChannel::new(twilio.clone())),
            None => Arc::new(UnconfiguredChannel::new(
                Channel::Voice,
                "TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN and TWILIO_FROM_NUMBER",
            )),
        };

        Self {
            whatsapp,
            telegram,
            voice,
        }
    }

    pub fn get(&self, channel: Channel) -> Arc<dyn INotificationChannel> {
        match channel {
            Channel::WhatsApp => self.whatsapp.clone(),
            Channel::Telegram => self.telegram.clone(),
            Channel::Voice => self.voice.clone(),
        }
    }
}

/// Turns a non-2xx provider response into an error carrying the body
pub(crate) async fn ensure_success(provider: &str, res: Response) -> anyhow::Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    error!(
        "[Unexpected Response] {} API returned status {}. Body: {}",
        provider, status, body
    );
    anyhow::bail!("{} API returned status {}: {}", provider, status, body)
}

pub(crate) fn network_error(provider: &str, e: reqwest::Error) -> anyhow::Error {
    error!(
        "[Network Error] {} API error. Error message: {:?}",
        provider, e
    );
    anyhow::Error::new(e)
}
