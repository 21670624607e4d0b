use carecall_domain::{Channel, Tz};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the application to run on
    pub port: usize,
    /// Whether the scheduler pass and the voice sweep run on timers.
    /// Tests turn this off and drive the passes through the http api.
    pub job_schedulers_enabled: bool,
    /// Seconds between two scheduler passes
    pub reminder_check_interval: Duration,
    /// Seconds between two sweeps of pending occurrences over voice
    pub voice_call_interval: Duration,
    /// Chat channel used by the scheduler pass
    pub chat_channel: Channel,
    /// Timezone end dates of reminders are interpreted in
    pub timezone: Tz,
    /// Upper bound on a single provider or text generation call
    pub provider_timeout: Duration,
    /// How many operator resets an occurrence in `failure` allows
    pub occurrence_max_retries: i32,
    /// How many future occurrences a schedule change materialises
    pub regeneration_horizon: usize,
    pub kapso: Option<KapsoConfig>,
    pub telegram: Option<TelegramConfig>,
    pub twilio: Option<TwilioConfig>,
    pub gemini: Option<GeminiConfig>,
}

#[derive(Debug, Clone)]
pub struct KapsoConfig {
    pub api_key: String,
    pub phone_number_id: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    /// Where Twilio posts gathered answers and call status changes
    pub webhook_url: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl Config {
    pub fn new() -> Self {
        let port = parse_env("PORT", 5000usize);
        let reminder_check_interval =
            Duration::from_secs(parse_env("REMINDER_CHECK_INTERVAL_SECS", 60u64).max(1));
        let voice_call_interval =
            Duration::from_secs(parse_env("VOICE_CALL_INTERVAL_SECS", 20u64).max(1));
        let provider_timeout =
            Duration::from_secs(parse_env("PROVIDER_TIMEOUT_SECS", 10u64).max(1));
        let occurrence_max_retries = parse_env("OCCURRENCE_MAX_RETRIES", 3i32).max(0);

        let chat_channel = match std::env::var("REMINDER_CHAT_CHANNEL") {
            Ok(channel) => match channel.parse::<Channel>() {
                Ok(Channel::Voice) | Err(_) => {
                    warn!(
                        "The given REMINDER_CHAT_CHANNEL: {} is not a chat channel, falling back to whatsapp.",
                        channel
                    );
                    Channel::WhatsApp
                }
                Ok(channel) => channel,
            },
            Err(_) => Channel::WhatsApp,
        };

        let timezone = match std::env::var("REMINDER_TIMEZONE") {
            Ok(tz) => match tz.parse::<Tz>() {
                Ok(tz) => tz,
                Err(_) => {
                    warn!(
                        "The given REMINDER_TIMEZONE: {} is not valid, falling back to UTC.",
                        tz
                    );
                    Tz::UTC
                }
            },
            Err(_) => Tz::UTC,
        };

        let kapso = match (env("KAPSO_API_KEY"), env("KAPSO_PHONE_NUMBER_ID")) {
            (Some(api_key), Some(phone_number_id)) => Some(KapsoConfig {
                api_key,
                phone_number_id,
                base_url: env("KAPSO_BASE_URL")
                    .unwrap_or_else(|| "https://api.kapso.ai/meta/whatsapp".into()),
            }),
            _ => {
                info!("Kapso credentials not found. WhatsApp messages will fail to send.");
                None
            }
        };

        let telegram = match env("TELEGRAM_BOT_TOKEN") {
            Some(bot_token) => Some(TelegramConfig {
                bot_token,
                base_url: env("TELEGRAM_BASE_URL")
                    .unwrap_or_else(|| "https://api.telegram.org".into()),
            }),
            None => {
                info!("TELEGRAM_BOT_TOKEN not found. Telegram messages will fail to send.");
                None
            }
        };

        let twilio = match (
            env("TWILIO_ACCOUNT_SID"),
            env("TWILIO_AUTH_TOKEN"),
            env("TWILIO_FROM_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                from_number,
                webhook_url: env("TWILIO_WEBHOOK_URL"),
                base_url: env("TWILIO_BASE_URL")
                    .unwrap_or_else(|| "https://api.twilio.com".into()),
            }),
            _ => {
                info!("Twilio credentials not found. Voice calls will fail to start.");
                None
            }
        };

        let gemini = env("GEMINI_API_KEY").map(|api_key| GeminiConfig {
            api_key,
            model: env("GEMINI_MODEL").unwrap_or_else(|| "gemini-2.5-flash-lite".into()),
            base_url: env("GEMINI_BASE_URL")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com".into()),
        });

        Self {
            port,
            job_schedulers_enabled: true,
            reminder_check_interval,
            voice_call_interval,
            chat_channel,
            timezone,
            provider_timeout,
            occurrence_max_retries,
            regeneration_horizon: 30,
            kapso,
            telegram,
            twilio,
            gemini,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|val| !val.trim().is_empty())
}

fn parse_env<T: std::str::FromStr + std::fmt::Display + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(val) => match val.parse::<T>() {
            Ok(val) => val,
            Err(_) => {
                warn!(
                    "The given {}: {} is not valid, falling back to the default: {}.",
                    key, val, default
                );
                default
            }
        },
        Err(_) => default,
    }
}
