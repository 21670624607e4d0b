use carecall_domain::{
    Appointment, Channel, DispatchOutcome, ElderlyProfile, Medicine, NotificationAttempt,
    Reminder, ReminderOccurrence, ReminderType, Tz, ID,
};
use carecall_infra::{
    CarecallContext, Channels, ExpiredClaim, IDeliveryRepo, ITextGenerator, InMemoryChannel,
    ReplaceFutureResult, ResolutionOutcome, ResponseResolution, StaticTimeSys,
};
use chrono::{DateTime, TimeZone, Utc};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub struct TestContext {
    pub ctx: CarecallContext,
    pub whatsapp: Arc<InMemoryChannel>,
    pub telegram: Arc<InMemoryChannel>,
    pub voice: Arc<InMemoryChannel>,
}

impl TestContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_channels(
            now,
            InMemoryChannel::new(Channel::WhatsApp),
            InMemoryChannel::new(Channel::Telegram),
            InMemoryChannel::new(Channel::Voice),
        )
    }

    pub fn with_channels(
        now: DateTime<Utc>,
        whatsapp: InMemoryChannel,
        telegram: InMemoryChannel,
        voice: InMemoryChannel,
    ) -> Self {
        let whatsapp = Arc::new(whatsapp);
        let telegram = Arc::new(telegram);
        let voice = Arc::new(voice);

        let mut ctx = CarecallContext::create_inmemory();
        ctx.sys = Arc::new(StaticTimeSys(now));
        ctx.channels = Channels {
            whatsapp: whatsapp.clone(),
            telegram: telegram.clone(),
            voice: voice.clone(),
        };
        ctx.text_generator = None;
        ctx.config.chat_channel = Channel::WhatsApp;
        ctx.config.timezone = Tz::UTC;
        ctx.config.provider_timeout = Duration::from_millis(200);
        ctx.config.occurrence_max_retries = 3;
        ctx.config.regeneration_horizon = 30;

        Self {
            ctx,
            whatsapp,
            telegram,
            voice,
        }
    }

    pub fn set_now(&mut self, now: DateTime<Utc>) {
        self.ctx.sys = Arc::new(StaticTimeSys(now));
    }

    pub fn with_unreliable_deliveries(&mut self, record_failures: usize, fail_reschedule: bool) {
        self.ctx.repos.deliveries = Arc::new(UnreliableDeliveries {
            inner: self.ctx.repos.deliveries.clone(),
            record_failures: AtomicUsize::new(record_failures),
            fail_reschedule,
        });
    }
}

/// Fails the first `record_failures` attempts to record a dispatch outcome,
/// and every reschedule when `fail_reschedule` is set
pub struct UnreliableDeliveries {
    inner: Arc<dyn IDeliveryRepo>,
    record_failures: AtomicUsize,
    fail_reschedule: bool,
}

#[async_trait::async_trait]
impl IDeliveryRepo for UnreliableDeliveries {
    async fn begin_dispatch(&self, attempt: &NotificationAttempt) -> anyhow::Result<bool> {
        self.inner.begin_dispatch(attempt).await
    }

    async fn record_dispatch(
        &self,
        occurrence_id: &ID,
        attempt_id: &ID,
        outcome: &DispatchOutcome,
        at: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let left = self.record_failures.load(Ordering::SeqCst);
        if left > 0 {
            self.record_failures.store(left - 1, Ordering::SeqCst);
            anyhow::bail!("connection reset");
        }
        self.inner
            .record_dispatch(occurrence_id, attempt_id, outcome, at)
            .await
    }

    async fn expire_stale_claims(
        &self,
        claimed_before: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ExpiredClaim>> {
        self.inner.expire_stale_claims(claimed_before, at).await
    }

    async fn resolve_response(
        &self,
        resolution: &ResponseResolution,
    ) -> anyhow::Result<ResolutionOutcome> {
        self.inner.resolve_response(resolution).await
    }

    async fn reschedule(
        &self,
        reminder: &Reminder,
        after: DateTime<Utc>,
        occurrences: &[ReminderOccurrence],
    ) -> anyhow::Result<ReplaceFutureResult> {
        if self.fail_reschedule {
            anyhow::bail!("connection reset");
        }
        self.inner.reschedule(reminder, after, occurrences).await
    }
}

pub struct MedicineFixture {
    pub profile: ElderlyProfile,
    pub medicine: Medicine,
    pub reminder: Reminder,
}

/// A profile reachable over every channel, a medicine with 5 tablets left
/// and a reminder linked to the medicine only.
pub async fn insert_medicine_reminder(
    ctx: &CarecallContext,
    start: DateTime<Utc>,
    periodicity: Option<i64>,
) -> MedicineFixture {
    let now = ctx.sys.get_datetime();
    let mut profile = ElderlyProfile::new("Rosa Martínez".into(), now);
    profile.phone = Some("+56911111111".into());
    profile.telegram_chat_id = Some("4242".into());
    ctx.repos.profiles.insert_profile(&profile).await.unwrap();

    let mut medicine = Medicine::new(profile.id.clone(), "Losartán".into(), now);
    medicine.dosage = Some("50mg".into());
    medicine.tablets_left = Some(5);
    medicine.total_tablets = Some(30);
    ctx.repos.medicines.insert(&medicine).await.unwrap();

    let mut reminder = Reminder::new(ReminderType::Medicine, start, now);
    reminder.periodicity = periodicity;
    reminder.medicine_id = Some(medicine.id.clone());
    ctx.repos.reminders.insert(&reminder).await.unwrap();

    MedicineFixture {
        profile,
        medicine,
        reminder,
    }
}

pub async fn insert_appointment_reminder(
    ctx: &CarecallContext,
    start: DateTime<Utc>,
) -> (ElderlyProfile, Appointment, Reminder) {
    let now = ctx.sys.get_datetime();
    let mut profile = ElderlyProfile::new("Jorge Soto".into(), now);
    profile.phone = Some("+56922222222".into());
    ctx.repos.profiles.insert_profile(&profile).await.unwrap();

    let mut appointment = Appointment::new(profile.id.clone(), at(2024, 1, 5, 15, 30), now);
    appointment.doctor_name = Some("Dra. Pérez".into());
    ctx.repos.profiles.insert_appointment(&appointment).await.unwrap();

    let mut reminder = Reminder::new(ReminderType::Appointment, start, now);
    reminder.appointment_id = Some(appointment.id.clone());
    ctx.repos.reminders.insert(&reminder).await.unwrap();

    (profile, appointment, reminder)
}

/// Text generator answering with a fixed text, or failing
pub struct StaticTextGenerator {
    pub answer: Result<String, String>,
    pub delay: Option<Duration>,
}

#[async_trait::async_trait]
impl ITextGenerator for StaticTextGenerator {
    async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.answer {
            Ok(text) => Ok(text.clone()),
            Err(e) => anyhow::bail!("{}", e),
        }
    }
}
