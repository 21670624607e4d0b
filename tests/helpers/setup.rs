use carecall_api::Application;
use carecall_domain::{Channel, ElderlyProfile, Medicine, ReminderType};
use carecall_infra::{CarecallContext, Channels, InMemoryChannel};
use carecall_sdk::{CarecallSDK, CreateReminderInput, Reminder};
use chrono::Duration;
use std::sync::Arc;

pub struct TestApp {
    pub ctx: CarecallContext,
    pub whatsapp: Arc<InMemoryChannel>,
    pub voice: Arc<InMemoryChannel>,
}

// Launch the application as a background task
pub async fn spawn_app() -> (TestApp, CarecallSDK, String) {
    let whatsapp = Arc::new(InMemoryChannel::new(Channel::WhatsApp));
    let voice = Arc::new(InMemoryChannel::new(Channel::Voice));

    let mut ctx = CarecallContext::create_inmemory();
    ctx.config.port = 0; // Random port
    ctx.config.job_schedulers_enabled = false;
    ctx.config.chat_channel = Channel::WhatsApp;
    ctx.text_generator = None;
    ctx.channels = Channels {
        whatsapp: whatsapp.clone(),
        telegram: Arc::new(InMemoryChannel::new(Channel::Telegram)),
        voice: voice.clone(),
    };

    let application = Application::new(ctx.clone())
        .await
        .expect("Failed to build application.");

    let address = format!("http://localhost:{}/api/v1", application.port());
    let _ = actix_web::rt::spawn(async move {
        application
            .start()
            .await
            .expect("Expected application to start");
    });

    let app = TestApp {
        ctx,
        whatsapp,
        voice,
    };
    let sdk = CarecallSDK::new(address.clone());
    (app, sdk, address)
}

pub struct MedicineSetup {
    pub medicine: Medicine,
    pub reminder: Reminder,
}

/// A daily medicine reminder which became due a minute ago, for a profile
/// reachable on +56911111111 with 10 tablets left.
pub async fn create_medicine_reminder(app: &TestApp, sdk: &CarecallSDK) -> MedicineSetup {
    let now = app.ctx.sys.get_datetime();
    let mut profile = ElderlyProfile::new("Rosa Martínez".into(), now);
    profile.phone = Some("+56911111111".into());
    app.ctx
        .repos
        .profiles
        .insert_profile(&profile)
        .await
        .expect("Expected to insert profile");

    let mut medicine = Medicine::new(profile.id.clone(), "Losartán".into(), now);
    medicine.dosage = Some("50mg".into());
    medicine.tablets_left = Some(10);
    app.ctx
        .repos
        .medicines
        .insert(&medicine)
        .await
        .expect("Expected to insert medicine");

    let reminder = sdk
        .reminder
        .create(CreateReminderInput {
            reminder_type: ReminderType::Medicine,
            start_date: now - Duration::minutes(1),
            periodicity: Some(24 * 60),
            end_date: None,
            medicine_id: Some(medicine.id.clone()),
            appointment_id: None,
            elderly_profile_id: None,
        })
        .await
        .expect("Expected to create reminder")
        .reminder;

    MedicineSetup { medicine, reminder }
}
