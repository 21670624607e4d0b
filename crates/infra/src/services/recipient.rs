use crate::repos::{IMedicineRepo, IProfileRepo};
use carecall_domain::{Channel, ElderlyProfile, Reminder, ID};
use std::sync::Arc;
use thiserror::Error;

/// Where a reminder is delivered, and to whom
#[derive(Debug, Clone, PartialEq)]
pub struct Recipient {
    pub address: String,
    pub profile: ElderlyProfile,
}

#[derive(Debug, Error)]
pub enum RecipientError {
    #[error("Reminder {0} is not linked to an elderly profile, an appointment or a medicine")]
    NotLinked(ID),
    #[error("Elderly profile {0} was not found")]
    ProfileNotFound(ID),
    #[error("Appointment {0} was not found")]
    AppointmentNotFound(ID),
    #[error("Medicine {0} was not found")]
    MedicineNotFound(ID),
    #[error("Elderly profile {profile_id} has no contact usable for {channel}")]
    NoContact { profile_id: ID, channel: Channel },
    #[error("Unable to load the recipient: {0}")]
    Storage(String),
}

#[async_trait::async_trait]
pub trait IRecipientResolver: Send + Sync {
    async fn resolve(
        &self,
        reminder: &Reminder,
        channel: Channel,
    ) -> Result<Recipient, RecipientError>;
}

/// Follows the reminder's links to its elderly profile: the direct link
/// first, then the appointment's owner, then the medicine's owner.
pub struct ProfileRecipientResolver {
    profiles: Arc<dyn IProfileRepo>,
    medicines: Arc<dyn IMedicineRepo>,
}

impl ProfileRecipientResolver {
    pub fn new(profiles: Arc<dyn IProfileRepo>, medicines: Arc<dyn IMedicineRepo>) -> Self {
        Self {
            profiles,
            medicines,
        }
    }

    async fn profile_id(&self, reminder: &Reminder) -> Result<ID, RecipientError> {
        if let Some(profile_id) = &reminder.elderly_profile_id {
            return Ok(profile_id.clone());
        }
        if let Some(appointment_id) = &reminder.appointment_id {
            return self
                .profiles
                .find_appointment(appointment_id)
                .await
                .map_err(|e| RecipientError::Storage(e.to_string()))?
                .map(|appointment| appointment.elderly_id)
                .ok_or_else(|| RecipientError::AppointmentNotFound(appointment_id.clone()));
        }
        if let Some(medicine_id) = &reminder.medicine_id {
            return self
                .medicines
                .find(medicine_id)
                .await
                .map_err(|e| RecipientError::Storage(e.to_string()))?
                .map(|medicine| medicine.elderly_id)
                .ok_or_else(|| RecipientError::MedicineNotFound(medicine_id.clone()));
        }
        Err(RecipientError::NotLinked(reminder.id.clone()))
    }
}

fn contact_for(profile: &ElderlyProfile, channel: Channel) -> Option<String> {
    let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.trim().is_empty());
    match channel {
        Channel::Telegram => non_empty(&profile.telegram_chat_id),
        Channel::Voice | Channel::WhatsApp => {
            non_empty(&profile.phone).or_else(|| non_empty(&profile.emergency_contact))
        }
    }
}

#[async_trait::async_trait]
impl IRecipientResolver for ProfileRecipientResolver {
    async fn resolve(
        &self,
        reminder: &Reminder,
        channel: Channel,
    ) -> Result<Recipient, RecipientError> {
        let profile_id = self.profile_id(reminder).await?;
        let profile = self
            .profiles
            .find_profile(&profile_id)
            .await
            .map_err(|e| RecipientError::Storage(e.to_string()))?
            .ok_or_else(|| RecipientError::ProfileNotFound(profile_id.clone()))?;

        match contact_for(&profile, channel) {
            Some(address) => Ok(Recipient { address, profile }),
            None => Err(RecipientError::NoContact {
                profile_id,
                channel,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CarecallContext;
    use carecall_domain::{Appointment, Medicine, ReminderType};
    use chrono::Utc;

    #[tokio::test]
    async fn resolves_through_each_link() {
        let ctx = CarecallContext::create_inmemory();
        let now = Utc::now();
        let mut profile = ElderlyProfile::new("Rosa Pérez".into(), now);
        profile.phone = Some("+56911111111".into());
        profile.telegram_chat_id = Some("777".into());
        ctx.repos.profiles.insert_profile(&profile).await.unwrap();

        let appointment = Appointment::new(profile.id.clone(), now, now);
        ctx.repos.profiles.insert_appointment(&appointment).await.unwrap();
        let medicine = Medicine::new(profile.id.clone(), "Losartán".into(), now);
        ctx.repos.medicines.insert(&medicine).await.unwrap();

        let mut direct = Reminder::new(ReminderType::Other, now, now);
        direct.elderly_profile_id = Some(profile.id.clone());
        let mut via_appointment = Reminder::new(ReminderType::Appointment, now, now);
        via_appointment.appointment_id = Some(appointment.id.clone());
        let mut via_medicine = Reminder::new(ReminderType::Medicine, now, now);
        via_medicine.medicine_id = Some(medicine.id.clone());

        for reminder in [&direct, &via_appointment, &via_medicine] {
            let recipient = ctx
                .recipients
                .resolve(reminder, Channel::WhatsApp)
                .await
                .unwrap();
            assert_eq!(recipient.address, "+56911111111");
            assert_eq!(recipient.profile.id, profile.id);
        }

        let recipient = ctx
            .recipients
            .resolve(&direct, Channel::Telegram)
            .await
            .unwrap();
        assert_eq!(recipient.address, "777");
    }

    #[tokio::test]
    async fn falls_back_to_emergency_contact() {
        let ctx = CarecallContext::create_inmemory();
        let now = Utc::now();
        let mut profile = ElderlyProfile::new("Rosa".into(), now);
        profile.emergency_contact = Some("+56922222222".into());
        ctx.repos.profiles.insert_profile(&profile).await.unwrap();

        let mut reminder = Reminder::new(ReminderType::Other, now, now);
        reminder.elderly_profile_id = Some(profile.id.clone());

        let recipient = ctx.recipients.resolve(&reminder, Channel::Voice).await.unwrap();
        assert_eq!(recipient.address, "+56922222222");

        let err = ctx
            .recipients
            .resolve(&reminder, Channel::Telegram)
            .await
            .unwrap_err();
        assert!(matches!(err, RecipientError::NoContact { .. }));
    }

    #[tokio::test]
    async fn reports_broken_links() {
        let ctx = CarecallContext::create_inmemory();
        let now = Utc::now();

        let unlinked = Reminder::new(ReminderType::Other, now, now);
        assert!(matches!(
            ctx.recipients.resolve(&unlinked, Channel::WhatsApp).await,
            Err(RecipientError::NotLinked(_))
        ));

        let mut dangling = Reminder::new(ReminderType::Medicine, now, now);
        dangling.medicine_id = Some(ID::new());
        assert!(matches!(
            ctx.recipients.resolve(&dangling, Channel::WhatsApp).await,
            Err(RecipientError::MedicineNotFound(_))
        ));
    }
}
