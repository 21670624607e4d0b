mod inmemory;
mod postgres;

pub use inmemory::InMemoryProfileRepo;
pub use postgres::PostgresProfileRepo;

use carecall_domain::{Appointment, ElderlyProfile, ID};

/// Elderly profiles and the appointments booked for them
#[async_trait::async_trait]
pub trait IProfileRepo: Send + Sync {
    async fn insert_profile(&self, profile: &ElderlyProfile) -> anyhow::Result<()>;
    async fn find_profile(&self, profile_id: &ID) -> anyhow::Result<Option<ElderlyProfile>>;
    async fn insert_appointment(&self, appointment: &Appointment) -> anyhow::Result<()>;
    async fn find_appointment(&self, appointment_id: &ID) -> anyhow::Result<Option<Appointment>>;
}
