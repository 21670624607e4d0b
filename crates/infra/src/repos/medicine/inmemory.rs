use super::IMedicineRepo;
use crate::repos::shared::inmemory_repo::*;
use carecall_domain::{Medicine, ID};
use std::sync::Mutex;

pub struct InMemoryMedicineRepo {
    pub(crate) medicines: Mutex<Vec<Medicine>>,
}

impl InMemoryMedicineRepo {
    pub fn new() -> Self {
        Self {
            medicines: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IMedicineRepo for InMemoryMedicineRepo {
    async fn insert(&self, medicine: &Medicine) -> anyhow::Result<()> {
        insert(medicine, &self.medicines);
        Ok(())
    }

    async fn save(&self, medicine: &Medicine) -> anyhow::Result<()> {
        if !save(medicine, &self.medicines) {
            anyhow::bail!("Medicine {} does not exist", medicine.id);
        }
        Ok(())
    }

    async fn find(&self, medicine_id: &ID) -> anyhow::Result<Option<Medicine>> {
        Ok(find(medicine_id, &self.medicines))
    }
}
