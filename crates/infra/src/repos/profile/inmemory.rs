use super::IProfileRepo;
use crate::repos::shared::inmemory_repo::*;
use carecall_domain::{Appointment, ElderlyProfile, ID};
use std::sync::Mutex;

pub struct InMemoryProfileRepo {
    profiles: Mutex<Vec<ElderlyProfile>>,
    appointments: Mutex<Vec<Appointment>>,
}

impl InMemoryProfileRepo {
    pub fn new() -> Self {
        Self {
            profiles: Mutex::new(Vec::new()),
            appointments: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IProfileRepo for InMemoryProfileRepo {
    async fn insert_profile(&self, profile: &ElderlyProfile) -> anyhow::Result<()> {
        insert(profile, &self.profiles);
        Ok(())
    }

    async fn find_profile(&self, profile_id: &ID) -> anyhow::Result<Option<ElderlyProfile>> {
        Ok(find(profile_id, &self.profiles))
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> anyhow::Result<()> {
        insert(appointment, &self.appointments);
        Ok(())
    }

    async fn find_appointment(&self, appointment_id: &ID) -> anyhow::Result<Option<Appointment>> {
        Ok(find(appointment_id, &self.appointments))
    }
}
