use carecall_domain::{
    Appointment, Channel, ElderlyProfile, Medicine, Reminder, ReminderType, Tz,
};
use carecall_infra::CarecallContext;
use tracing::{info, warn};

/// Records a reminder points at, loaded once per dispatch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReminderDetails {
    pub medicine: Option<Medicine>,
    pub appointment: Option<Appointment>,
}

impl ReminderDetails {
    /// Missing or unreadable records leave their slot empty. The message
    /// then falls back to its generic wording.
    pub async fn load(reminder: &Reminder, ctx: &CarecallContext) -> Self {
        let medicine = match &reminder.medicine_id {
            Some(medicine_id) => match ctx.repos.medicines.find(medicine_id).await {
                Ok(medicine) => medicine,
                Err(e) => {
                    warn!("Unable to load medicine {}: {:?}", medicine_id, e);
                    None
                }
            },
            None => None,
        };
        let appointment = match &reminder.appointment_id {
            Some(appointment_id) => match ctx.repos.profiles.find_appointment(appointment_id).await
            {
                Ok(appointment) => appointment,
                Err(e) => {
                    warn!("Unable to load appointment {}: {:?}", appointment_id, e);
                    None
                }
            },
            None => None,
        };

        Self {
            medicine,
            appointment,
        }
    }
}

/// The deterministic text of a reminder on `channel`
pub fn template_text(
    reminder_type: ReminderType,
    details: &ReminderDetails,
    profile: &ElderlyProfile,
    channel: Channel,
    tz: &Tz,
) -> String {
    match (reminder_type, channel) {
        (ReminderType::Medicine, Channel::Voice) => {
            spoken_medicine_text(details.medicine.as_ref(), profile)
        }
        (ReminderType::Medicine, _) => medicine_text(details.medicine.as_ref()),
        (ReminderType::Appointment, _) => appointment_text(details.appointment.as_ref(), tz),
        (ReminderType::Other, _) => "Tienes un recordatorio pendiente. Por favor confirma.".into(),
    }
}

fn medicine_text(medicine: Option<&Medicine>) -> String {
    let subject = match medicine {
        Some(medicine) => match &medicine.dosage {
            Some(dosage) => format!(" {} ({})", medicine.name, dosage),
            None => format!(" {}", medicine.name),
        },
        None => String::new(),
    };
    format!(
        "Recordatorio: Es hora de tomar tu medicamento{}. Por favor confirma cuando lo hayas tomado.",
        subject
    )
}

fn spoken_medicine_text(medicine: Option<&Medicine>, profile: &ElderlyProfile) -> String {
    let greeting = match profile.first_name() {
        Some(name) => format!("Querido/a {}, ", name),
        None => "Hola, ".to_string(),
    };
    let subject = match medicine {
        Some(medicine) => {
            let dose = match medicine.tablets_per_dose.filter(|n| *n > 0) {
                Some(1) => "1 tableta".to_string(),
                Some(n) => format!("{} tabletas", n),
                None => "la dosis indicada".to_string(),
            };
            format!("{} ({})", medicine.name, dose)
        }
        None => "tu medicamento".to_string(),
    };
    format!("{}recuerda tomar {}. ¿Ya lo tomaste?", greeting, subject)
}

fn appointment_text(appointment: Option<&Appointment>, tz: &Tz) -> String {
    let mut text = "Recordatorio: Tienes una cita médica próximamente".to_string();
    if let Some(appointment) = appointment {
        if let Some(doctor) = &appointment.doctor_name {
            text.push_str(&format!(" con {}", doctor));
        }
        let local = appointment.scheduled_datetime.with_timezone(tz);
        text.push_str(&format!(" el {}", local.format("%d/%m/%Y a las %H:%M")));
    }
    text.push_str(". Por favor confirma tu asistencia.");
    text
}

fn enhancement_prompt(medicine: &Medicine, profile: &ElderlyProfile, channel: Channel) -> String {
    let dose = medicine
        .dosage
        .clone()
        .unwrap_or_else(|| "la dosis indicada".to_string());
    let name = profile.first_name().unwrap_or("la persona");
    let medium = match channel {
        Channel::Voice => "que será leído en voz alta en una llamada",
        _ => "que será enviado por chat",
    };
    format!(
        "Escribe un mensaje cálido y breve, de 2 a 3 oraciones, en español, {} para recordarle a {} \
        que tome su medicamento {} ({}). Termina pidiéndole que confirme si ya lo tomó. \
        No uses emojis ni comillas. Responde solo con el mensaje.",
        medium, name, medicine.name, dose
    )
}

/// Text to deliver for `reminder`. Medicine reminders are handed to the
/// text generator when one is configured; its answer replaces the
/// template unless it fails, times out or comes back empty.
pub async fn compose_text(
    reminder: &Reminder,
    details: &ReminderDetails,
    profile: &ElderlyProfile,
    channel: Channel,
    ctx: &CarecallContext,
) -> String {
    let template = template_text(
        reminder.reminder_type,
        details,
        profile,
        channel,
        &ctx.config.timezone,
    );

    let (generator, medicine) = match (&ctx.text_generator, &details.medicine) {
        (Some(generator), Some(medicine)) if reminder.reminder_type == ReminderType::Medicine => {
            (generator, medicine)
        }
        _ => return template,
    };

    let prompt = enhancement_prompt(medicine, profile, channel);
    match tokio::time::timeout(ctx.config.provider_timeout, generator.generate(&prompt)).await {
        Ok(Ok(text)) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(Ok(_)) => {
            info!("Text generation returned nothing, using the template");
            template
        }
        Ok(Err(e)) => {
            warn!("Text generation failed, using the template: {:?}", e);
            template
        }
        Err(_) => {
            warn!(
                "Text generation did not answer within {:?}, using the template",
                ctx.config.provider_timeout
            );
            template
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::*;
    use std::{sync::Arc, time::Duration};

    fn profile() -> ElderlyProfile {
        ElderlyProfile::new("Rosa Martínez".into(), at(2024, 1, 1, 0, 0))
    }

    fn losartan() -> Medicine {
        let mut medicine = Medicine::new(Default::default(), "Losartán".into(), at(2024, 1, 1, 0, 0));
        medicine.dosage = Some("50mg".into());
        medicine
    }

    #[test]
    fn chat_templates() {
        let details = ReminderDetails {
            medicine: Some(losartan()),
            appointment: None,
        };
        assert_eq!(
            template_text(ReminderType::Medicine, &details, &profile(), Channel::WhatsApp, &Tz::UTC),
            "Recordatorio: Es hora de tomar tu medicamento Losartán (50mg). Por favor confirma cuando lo hayas tomado."
        );
        assert_eq!(
            template_text(
                ReminderType::Medicine,
                &ReminderDetails::default(),
                &profile(),
                Channel::Telegram,
                &Tz::UTC
            ),
            "Recordatorio: Es hora de tomar tu medicamento. Por favor confirma cuando lo hayas tomado."
        );
        assert_eq!(
            template_text(
                ReminderType::Other,
                &ReminderDetails::default(),
                &profile(),
                Channel::WhatsApp,
                &Tz::UTC
            ),
            "Tienes un recordatorio pendiente. Por favor confirma."
        );
    }

    #[test]
    fn appointment_date_is_local() {
        let mut appointment =
            Appointment::new(Default::default(), at(2024, 1, 5, 15, 30), at(2024, 1, 1, 0, 0));
        appointment.doctor_name = Some("Dra. Pérez".into());
        let details = ReminderDetails {
            medicine: None,
            appointment: Some(appointment),
        };
        let tz: Tz = "America/Santiago".parse().unwrap();
        assert_eq!(
            template_text(ReminderType::Appointment, &details, &profile(), Channel::Voice, &tz),
            "Recordatorio: Tienes una cita médica próximamente con Dra. Pérez el 05/01/2024 a las 12:30. Por favor confirma tu asistencia."
        );
    }

    #[test]
    fn spoken_medicine_template() {
        let mut medicine = losartan();
        medicine.tablets_per_dose = Some(2);
        let details = ReminderDetails {
            medicine: Some(medicine),
            appointment: None,
        };
        assert_eq!(
            template_text(ReminderType::Medicine, &details, &profile(), Channel::Voice, &Tz::UTC),
            "Querido/a Rosa, recuerda tomar Losartán (2 tabletas). ¿Ya lo tomaste?"
        );

        let nameless = ElderlyProfile::new(" ".into(), at(2024, 1, 1, 0, 0));
        let details = ReminderDetails {
            medicine: Some(losartan()),
            appointment: None,
        };
        assert_eq!(
            template_text(ReminderType::Medicine, &details, &nameless, Channel::Voice, &Tz::UTC),
            "Hola, recuerda tomar Losartán (la dosis indicada). ¿Ya lo tomaste?"
        );
    }

    async fn compose_with(generator: StaticTextGenerator) -> String {
        let mut test = TestContext::new(at(2024, 1, 1, 9, 0));
        test.ctx.text_generator = Some(Arc::new(generator));
        let fixture = insert_medicine_reminder(&test.ctx, at(2024, 1, 1, 9, 0), None).await;
        let details = ReminderDetails::load(&fixture.reminder, &test.ctx).await;
        compose_text(
            &fixture.reminder,
            &details,
            &fixture.profile,
            Channel::WhatsApp,
            &test.ctx,
        )
        .await
    }

    #[actix_web::main]
    #[test]
    async fn generated_text_replaces_the_template() {
        let text = compose_with(StaticTextGenerator {
            answer: Ok("  Hola Rosa, es hora de tu Losartán.  ".into()),
            delay: None,
        })
        .await;
        assert_eq!(text, "Hola Rosa, es hora de tu Losartán.");
    }

    #[actix_web::main]
    #[test]
    async fn generation_failures_fall_back_to_the_template() {
        let template = "Recordatorio: Es hora de tomar tu medicamento Losartán (50mg). Por favor confirma cuando lo hayas tomado.";
        let failed = compose_with(StaticTextGenerator {
            answer: Err("quota exceeded".into()),
            delay: None,
        })
        .await;
        assert_eq!(failed, template);

        let empty = compose_with(StaticTextGenerator {
            answer: Ok("   ".into()),
            delay: None,
        })
        .await;
        assert_eq!(empty, template);

        let slow = compose_with(StaticTextGenerator {
            answer: Ok("Demasiado tarde".into()),
            delay: Some(Duration::from_secs(2)),
        })
        .await;
        assert_eq!(slow, template);
    }
}
