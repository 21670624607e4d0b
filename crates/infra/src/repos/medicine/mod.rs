mod inmemory;
mod postgres;

pub use inmemory::InMemoryMedicineRepo;
pub use postgres::PostgresMedicineRepo;

use carecall_domain::{Medicine, ID};

#[async_trait::async_trait]
pub trait IMedicineRepo: Send + Sync {
    async fn insert(&self, medicine: &Medicine) -> anyhow::Result<()>;
    async fn save(&self, medicine: &Medicine) -> anyhow::Result<()>;
    async fn find(&self, medicine_id: &ID) -> anyhow::Result<Option<Medicine>>;
}
