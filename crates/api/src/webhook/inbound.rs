use carecall_domain::{
    Channel, CHOICE_CANCEL, CHOICE_CONFIRM, CHOICE_DISMISS, CHOICE_SKIP, CHOICE_TAKEN,
};
use carecall_infra::telegram_message_id;
use serde::Deserialize;
use serde_json::Value;

/// What a provider callback says about a reminder
#[derive(Debug, Clone, PartialEq)]
pub struct InboundResponse {
    /// Id of the message or call the callback refers to, when echoed
    pub provider_message_id: Option<String>,
    /// Phone number or chat id the callback came from
    pub recipient: Option<String>,
    pub answer: InboundAnswer,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundAnswer {
    /// The recipient answered. `candidates` are classified in order and the
    /// first one understood wins. `response` is what gets recorded.
    Reply {
        candidates: Vec<String>,
        response: String,
    },
    /// The call ended without the recipient picking up
    Unreachable { call_status: String },
    /// Nothing to resolve, e.g. a delivery receipt
    Empty { reason: String },
}

/// Call statuses Twilio reports for calls nobody answered
const UNREACHABLE_CALL_STATUSES: [&str; 4] = ["busy", "no-answer", "failed", "canceled"];

pub fn extract(channel: Channel, payload: &Value) -> Result<InboundResponse, String> {
    match channel {
        Channel::WhatsApp => parse::<WhatsAppPayload>(payload).map(WhatsAppPayload::into_response),
        Channel::Telegram => parse::<TelegramUpdate>(payload).map(TelegramUpdate::into_response),
        Channel::Voice => parse::<TwilioCallback>(payload).map(TwilioCallback::into_response),
    }
}

fn parse<T: for<'de> Deserialize<'de>>(payload: &Value) -> Result<T, String> {
    serde_json::from_value(payload.clone()).map_err(|e| format!("Malformed payload: {}", e))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// "{id}: {title}" for a known choice id, the id itself otherwise
fn describe_choice(id: &str) -> String {
    [
        CHOICE_TAKEN,
        CHOICE_SKIP,
        CHOICE_CONFIRM,
        CHOICE_CANCEL,
        CHOICE_DISMISS,
    ]
    .iter()
    .find(|choice| choice.id == id)
    .map(|choice| format!("{}: {}", choice.id, choice.title))
    .unwrap_or_else(|| id.to_string())
}

#[derive(Debug, Deserialize)]
struct WhatsAppPayload {
    message: Option<WhatsAppMessage>,
    conversation: Option<WhatsAppConversation>,
}

#[derive(Debug, Deserialize)]
struct WhatsAppMessage {
    from: Option<String>,
    interactive: Option<WhatsAppInteractive>,
    text: Option<WhatsAppText>,
    context: Option<WhatsAppContext>,
}

#[derive(Debug, Deserialize)]
struct WhatsAppInteractive {
    button_reply: Option<WhatsAppButtonReply>,
}

#[derive(Debug, Deserialize)]
struct WhatsAppButtonReply {
    id: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhatsAppText {
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhatsAppContext {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhatsAppConversation {
    phone_number: Option<String>,
}

impl WhatsAppPayload {
    fn into_response(self) -> InboundResponse {
        let conversation_phone = self.conversation.and_then(|c| non_empty(c.phone_number));
        let message = match self.message {
            Some(message) => message,
            None => {
                return InboundResponse {
                    provider_message_id: None,
                    recipient: conversation_phone,
                    answer: InboundAnswer::Empty {
                        reason: "The payload carries no message".into(),
                    },
                }
            }
        };

        let recipient = non_empty(message.from).or(conversation_phone);
        let provider_message_id = message.context.and_then(|c| non_empty(c.id));
        let button = message.interactive.and_then(|i| i.button_reply);
        let text = message.text.and_then(|t| non_empty(t.body));

        let answer = match (button, text) {
            (Some(button), _) if button.id.is_some() || button.title.is_some() => {
                let id = non_empty(button.id);
                let title = non_empty(button.title);
                let response = match (&id, &title) {
                    (Some(id), Some(title)) => format!("{}: {}", id, title),
                    (Some(value), None) | (None, Some(value)) => value.clone(),
                    (None, None) => String::new(),
                };
                InboundAnswer::Reply {
                    candidates: id.into_iter().chain(title).collect(),
                    response,
                }
            }
            (_, Some(text)) => InboundAnswer::Reply {
                candidates: vec![text.clone()],
                response: text,
            },
            _ => InboundAnswer::Empty {
                reason: "The message has neither a button reply nor a text".into(),
            },
        };

        InboundResponse {
            provider_message_id,
            recipient,
            answer,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    callback_query: Option<TelegramCallbackQuery>,
    message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
struct TelegramCallbackQuery {
    data: Option<String>,
    message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    message_id: i64,
    chat: TelegramChat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
}

impl TelegramUpdate {
    fn into_response(self) -> InboundResponse {
        if let Some(query) = self.callback_query {
            let (provider_message_id, recipient) = match &query.message {
                Some(message) => (
                    Some(telegram_message_id(message.chat.id, message.message_id)),
                    Some(message.chat.id.to_string()),
                ),
                None => (None, None),
            };
            let answer = match non_empty(query.data) {
                Some(data) => InboundAnswer::Reply {
                    response: describe_choice(&data),
                    candidates: vec![data],
                },
                None => InboundAnswer::Empty {
                    reason: "The callback query carries no data".into(),
                },
            };
            return InboundResponse {
                provider_message_id,
                recipient,
                answer,
            };
        }

        // A typed reply instead of a button press
        match self.message {
            Some(message) => {
                let answer = match non_empty(message.text) {
                    Some(text) => InboundAnswer::Reply {
                        candidates: vec![text.clone()],
                        response: text,
                    },
                    None => InboundAnswer::Empty {
                        reason: "The message carries no text".into(),
                    },
                };
                InboundResponse {
                    provider_message_id: None,
                    recipient: Some(message.chat.id.to_string()),
                    answer,
                }
            }
            None => InboundResponse {
                provider_message_id: None,
                recipient: None,
                answer: InboundAnswer::Empty {
                    reason: "The update is neither a callback query nor a message".into(),
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TwilioCallback {
    call_sid: Option<String>,
    to: Option<String>,
    speech_result: Option<String>,
    digits: Option<String>,
    call_status: Option<String>,
}

impl TwilioCallback {
    fn into_response(self) -> InboundResponse {
        let speech = non_empty(self.speech_result);
        let digits = non_empty(self.digits);

        let answer = match (speech, digits) {
            (None, None) => match non_empty(self.call_status) {
                Some(status) if UNREACHABLE_CALL_STATUSES.contains(&status.as_str()) => {
                    InboundAnswer::Unreachable {
                        call_status: status,
                    }
                }
                Some(status) => InboundAnswer::Empty {
                    reason: format!("Call status {} carries no answer", status),
                },
                None => InboundAnswer::Empty {
                    reason: "The callback carries neither an answer nor a call status".into(),
                },
            },
            (speech, digits) => {
                let response = match (&speech, &digits) {
                    (Some(speech), _) => speech.clone(),
                    (None, Some(digits)) => format!("Digits: {}", digits),
                    (None, None) => String::new(),
                };
                InboundAnswer::Reply {
                    candidates: speech.into_iter().chain(digits).collect(),
                    response,
                }
            }
        };

        InboundResponse {
            provider_message_id: non_empty(self.call_sid),
            recipient: non_empty(self.to),
            answer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn whatsapp_button_reply() {
        let payload = json!({
            "message": {
                "from": "56979745451",
                "context": { "id": "wamid.123" },
                "interactive": {
                    "type": "button_reply",
                    "button_reply": { "id": "taken", "title": "Ya lo tomé" }
                }
            },
            "conversation": { "phone_number": "56900000000" }
        });
        assert_eq!(
            extract(Channel::WhatsApp, &payload).unwrap(),
            InboundResponse {
                provider_message_id: Some("wamid.123".into()),
                recipient: Some("56979745451".into()),
                answer: InboundAnswer::Reply {
                    candidates: vec!["taken".into(), "Ya lo tomé".into()],
                    response: "taken: Ya lo tomé".into(),
                },
            }
        );
    }

    #[test]
    fn whatsapp_text_falls_back_to_conversation_phone() {
        let payload = json!({
            "message": { "text": { "body": "sí, ya lo tomé" } },
            "conversation": { "phone_number": "56979745451" }
        });
        let inbound = extract(Channel::WhatsApp, &payload).unwrap();
        assert_eq!(inbound.recipient, Some("56979745451".into()));
        assert_eq!(inbound.provider_message_id, None);
        assert_eq!(
            inbound.answer,
            InboundAnswer::Reply {
                candidates: vec!["sí, ya lo tomé".into()],
                response: "sí, ya lo tomé".into(),
            }
        );
    }

    #[test]
    fn telegram_callback_query() {
        let payload = json!({
            "update_id": 1,
            "callback_query": {
                "id": "abc",
                "data": "skip",
                "message": { "message_id": 77, "chat": { "id": 4242 } }
            }
        });
        let inbound = extract(Channel::Telegram, &payload).unwrap();
        assert_eq!(inbound.provider_message_id, Some("4242:77".into()));
        assert_eq!(inbound.recipient, Some("4242".into()));
        assert_eq!(
            inbound.answer,
            InboundAnswer::Reply {
                candidates: vec!["skip".into()],
                response: "skip: Omitir".into(),
            }
        );
    }

    #[test]
    fn twilio_callbacks() {
        let digits = json!({ "CallSid": "CA1", "To": "+56911111111", "Digits": "1", "CallStatus": "in-progress" });
        let inbound = extract(Channel::Voice, &digits).unwrap();
        assert_eq!(inbound.provider_message_id, Some("CA1".into()));
        assert_eq!(
            inbound.answer,
            InboundAnswer::Reply {
                candidates: vec!["1".into()],
                response: "Digits: 1".into(),
            }
        );

        let busy = json!({ "CallSid": "CA1", "CallStatus": "no-answer" });
        assert_eq!(
            extract(Channel::Voice, &busy).unwrap().answer,
            InboundAnswer::Unreachable {
                call_status: "no-answer".into()
            }
        );

        let completed = json!({ "CallSid": "CA1", "CallStatus": "completed" });
        assert!(matches!(
            extract(Channel::Voice, &completed).unwrap().answer,
            InboundAnswer::Empty { .. }
        ));
    }

    #[test]
    fn malformed_payloads() {
        assert!(extract(Channel::Telegram, &json!({ "callback_query": "nope" })).is_err());
        assert!(extract(Channel::WhatsApp, &json!([1, 2])).is_err());
    }
}
