use super::{ensure_success, network_error, INotificationChannel, OutboundMessage};
use crate::config::TwilioConfig;
use carecall_domain::Channel;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, warn};

const PROVIDER: &str = "Twilio";

/// Outbound calls that read the reminder and gather a spoken or keypad answer
pub struct TwilioVoiceChannel {
    client: Client,
    config: TwilioConfig,
}

impl TwilioVoiceChannel {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn twiml(&self, message: &OutboundMessage) -> String {
        let action = match &self.config.webhook_url {
            Some(url) => format!(r#" action="{}" method="POST""#, escape_xml(url)),
            None => String::new(),
        };
        let prompt = match message.choices.as_slice() {
            [positive, negative, ..] => format!(
                "Di {} o presiona 1. Di {} o presiona 2.",
                positive.title, negative.title
            ),
            _ => "Presiona 1 para confirmar o 2 para omitir.".to_string(),
        };
        format!(
            r#"<Response><Say voice="alice" language="es-ES">{}</Say><Gather input="speech dtmf" numDigits="1" language="es-ES"{}><Say voice="alice" language="es-ES">{}</Say></Gather></Response>"#,
            escape_xml(&message.text),
            action,
            escape_xml(&prompt)
        )
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[derive(Debug, Deserialize)]
struct CallResponse {
    sid: String,
}

#[async_trait::async_trait]
impl INotificationChannel for TwilioVoiceChannel {
    fn channel(&self) -> Channel {
        Channel::Voice
    }

    async fn send(&self, message: &OutboundMessage) -> anyhow::Result<Option<String>> {
        let twiml = self.twiml(message);
        let mut form = vec![
            ("To", message.recipient.as_str()),
            ("From", self.config.from_number.as_str()),
            ("Twiml", twiml.as_str()),
        ];
        match &self.config.webhook_url {
            Some(url) => {
                form.push(("StatusCallback", url.as_str()));
                form.push(("StatusCallbackEvent", "completed"));
            }
            None => warn!("TWILIO_WEBHOOK_URL is not set. Answers to this call will not be received."),
        }

        let url = format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.config.base_url.trim_end_matches('/'),
            self.config.account_sid
        );
        let res = self
            .client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;
        let res = ensure_success(PROVIDER, res).await?;

        let call = res.json::<CallResponse>().await.map_err(|e| {
            error!(
                "[Unexpected Response] Twilio API POST error. Error message: {:?}",
                e
            );
            anyhow::Error::new(e)
        })?;

        Ok(Some(call.sid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carecall_domain::{CHOICE_SKIP, CHOICE_TAKEN, ID};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn channel(server: &MockServer) -> TwilioVoiceChannel {
        TwilioVoiceChannel::new(TwilioConfig {
            account_sid: "AC123".into(),
            auth_token: "secret".into(),
            from_number: "+15550000".into(),
            webhook_url: Some("https://carecall.example/api/v1/webhooks/voice".into()),
            base_url: server.uri(),
        })
    }

    fn message() -> OutboundMessage {
        OutboundMessage {
            occurrence_id: ID::new(),
            recipient: "+56912345678".into(),
            text: "Hola Rosa, recuerda tomar Losartán & agua.".into(),
            choices: vec![CHOICE_TAKEN, CHOICE_SKIP],
        }
    }

    #[test]
    fn twiml_is_escaped_and_gathers_an_answer() {
        let channel = TwilioVoiceChannel::new(TwilioConfig {
            account_sid: "AC123".into(),
            auth_token: "secret".into(),
            from_number: "+15550000".into(),
            webhook_url: Some("https://carecall.example/hook?a=1&b=2".into()),
            base_url: "http://localhost".into(),
        });
        let twiml = channel.twiml(&message());
        assert!(twiml.contains("Losartán &amp; agua."));
        assert!(twiml.contains(r#"action="https://carecall.example/hook?a=1&amp;b=2""#));
        assert!(twiml.contains("Di Ya lo tomé o presiona 1. Di Omitir o presiona 2."));
    }

    #[tokio::test]
    async fn starts_a_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Calls.json"))
            .and(header_exists("authorization"))
            .and(body_string_contains("StatusCallbackEvent=completed"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sid": "CA999" })))
            .expect(1)
            .mount(&server)
            .await;

        let provider_id = channel(&server).send(&message()).await.unwrap();
        assert_eq!(provider_id.as_deref(), Some("CA999"));
    }

    #[tokio::test]
    async fn provider_errors_are_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "message": "Invalid To number" })),
            )
            .mount(&server)
            .await;

        let err = channel(&server).send(&message()).await.unwrap_err();
        assert!(err.to_string().contains("Invalid To number"));
    }
}
