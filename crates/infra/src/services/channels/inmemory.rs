use super::{INotificationChannel, OutboundMessage};
use carecall_domain::{Channel, ID};
use std::{sync::Mutex, time::Duration};

/// Keeps outbound messages in memory instead of handing them to a provider.
/// Used when running the service without provider credentials and in tests.
pub struct InMemoryChannel {
    channel: Channel,
    failure: Option<String>,
    delay: Option<Duration>,
    sent: Mutex<Vec<OutboundMessage>>,
}

impl InMemoryChannel {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            failure: None,
            delay: None,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Every send is rejected with `error`
    pub fn failing(channel: Channel, error: &str) -> Self {
        Self {
            failure: Some(error.to_string()),
            ..Self::new(channel)
        }
    }

    /// Every send takes `delay` before it is accepted
    pub fn delayed(channel: Channel, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(channel)
        }
    }

    /// Messages handed to this channel, oldest first. Rejected sends included.
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl INotificationChannel for InMemoryChannel {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(&self, message: &OutboundMessage) -> anyhow::Result<Option<String>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.sent.lock().unwrap().push(message.clone());

        match &self.failure {
            Some(error) => anyhow::bail!("{}", error),
            None => Ok(Some(format!("{}-{}", self.channel, ID::default()))),
        }
    }
}
