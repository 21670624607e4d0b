mod config;
mod repos;
mod services;
mod system;

pub use config::{Config, GeminiConfig, KapsoConfig, TelegramConfig, TwilioConfig};
pub use repos::*;
pub use services::*;
pub use system::{ISys, RealSys, StaticTimeSys};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct CarecallContext {
    pub repos: Repos,
    pub config: Config,
    pub sys: Arc<dyn ISys>,
    pub channels: Channels,
    /// Personalises medicine reminders when configured
    pub text_generator: Option<Arc<dyn ITextGenerator>>,
    pub recipients: Arc<dyn IRecipientResolver>,
}

struct ContextParams {
    pub postgres_connection_string: String,
}

impl CarecallContext {
    fn from_repos(repos: Repos, config: Config) -> Self {
        let channels = Channels::from_config(&config);
        let text_generator = config
            .gemini
            .clone()
            .map(|gemini| Arc::new(GeminiTextGenerator::new(gemini)) as Arc<dyn ITextGenerator>);
        let recipients = Arc::new(ProfileRecipientResolver::new(
            repos.profiles.clone(),
            repos.medicines.clone(),
        ));

        Self {
            repos,
            config,
            sys: Arc::new(RealSys {}),
            channels,
            text_generator,
            recipients,
        }
    }

    async fn create(params: ContextParams) -> Self {
        let repos = Repos::create_postgres(&params.postgres_connection_string)
            .await
            .expect("Postgres credentials must be set and valid");
        Self::from_repos(repos, Config::new())
    }

    pub fn create_inmemory() -> Self {
        Self::from_repos(Repos::create_inmemory(), Config::new())
    }
}

/// Will setup the infrastructure context given the environment
pub async fn setup_context() -> CarecallContext {
    const PSQL_CONNECTION_STRING: &str = "DATABASE_URL";

    match std::env::var(PSQL_CONNECTION_STRING) {
        Ok(postgres_connection_string) => {
            CarecallContext::create(ContextParams {
                postgres_connection_string,
            })
            .await
        }
        Err(_) => {
            warn!(
                "{} env var was not found. Going to use in-memory storage, nothing will be persisted.",
                PSQL_CONNECTION_STRING
            );
            CarecallContext::create_inmemory()
        }
    }
}
