mod delivery;
mod medicine;
mod notification_attempt;
mod occurrence;
mod profile;
mod reminder;
mod shared;

use delivery::{InMemoryDeliveryRepo, PostgresDeliveryRepo};
use medicine::{InMemoryMedicineRepo, PostgresMedicineRepo};
use notification_attempt::{InMemoryNotificationAttemptRepo, PostgresNotificationAttemptRepo};
use occurrence::{InMemoryOccurrenceRepo, PostgresOccurrenceRepo};
use profile::{InMemoryProfileRepo, PostgresProfileRepo};
use reminder::{InMemoryReminderRepo, PostgresReminderRepo};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;

pub use delivery::{
    ExpiredClaim, IDeliveryRepo, ResolutionOutcome, ResponseResolution, StockDecrement,
    INTERRUPTED_DISPATCH,
};
pub use medicine::IMedicineRepo;
pub use notification_attempt::INotificationAttemptRepo;
pub use occurrence::{IOccurrenceRepo, ReplaceFutureResult};
pub use profile::IProfileRepo;
pub use reminder::IReminderRepo;

#[derive(Clone)]
pub struct Repos {
    pub reminders: Arc<dyn IReminderRepo>,
    pub occurrences: Arc<dyn IOccurrenceRepo>,
    pub attempts: Arc<dyn INotificationAttemptRepo>,
    pub medicines: Arc<dyn IMedicineRepo>,
    pub profiles: Arc<dyn IProfileRepo>,
    pub deliveries: Arc<dyn IDeliveryRepo>,
}

impl Repos {
    pub async fn create_postgres(connection_string: &str) -> anyhow::Result<Self> {
        info!("DB CHECKING CONNECTION ...");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(connection_string)
            .await?;
        info!("DB CHECKING CONNECTION ... [done]");

        info!("DB EXECUTING MIGRATION ...");
        sqlx::migrate!().run(&pool).await?;
        info!("DB EXECUTING MIGRATION ... [done]");

        Ok(Self {
            reminders: Arc::new(PostgresReminderRepo::new(pool.clone())),
            occurrences: Arc::new(PostgresOccurrenceRepo::new(pool.clone())),
            attempts: Arc::new(PostgresNotificationAttemptRepo::new(pool.clone())),
            medicines: Arc::new(PostgresMedicineRepo::new(pool.clone())),
            profiles: Arc::new(PostgresProfileRepo::new(pool.clone())),
            deliveries: Arc::new(PostgresDeliveryRepo::new(pool)),
        })
    }

    pub fn create_inmemory() -> Self {
        let reminders = Arc::new(InMemoryReminderRepo::new());
        let occurrences = Arc::new(InMemoryOccurrenceRepo::new());
        let attempts = Arc::new(InMemoryNotificationAttemptRepo::new());
        let medicines = Arc::new(InMemoryMedicineRepo::new());
        let deliveries = Arc::new(InMemoryDeliveryRepo::new(
            reminders.clone(),
            occurrences.clone(),
            attempts.clone(),
            medicines.clone(),
        ));

        Self {
            reminders,
            occurrences,
            attempts,
            medicines,
            profiles: Arc::new(InMemoryProfileRepo::new()),
            deliveries,
        }
    }
}
