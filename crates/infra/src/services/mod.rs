mod channels;
mod recipient;
mod text_generation;

pub use channels::{
    telegram_message_id, Channels, INotificationChannel, InMemoryChannel, KapsoWhatsAppChannel,
    OutboundMessage, TelegramChannel, TwilioVoiceChannel, UnconfiguredChannel,
};
pub use recipient::{IRecipientResolver, ProfileRecipientResolver, Recipient, RecipientError};
pub use text_generation::{GeminiTextGenerator, ITextGenerator};
