use super::IProfileRepo;
use carecall_domain::{Appointment, ElderlyProfile, ID};
use chrono::{DateTime, Utc};
use sqlx::{types::Uuid, FromRow, PgPool};

pub struct PostgresProfileRepo {
    pool: PgPool,
}

impl PostgresProfileRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ElderlyProfileRaw {
    elderly_uid: Uuid,
    full_name: String,
    phone: Option<String>,
    emergency_contact: Option<String>,
    telegram_chat_id: Option<String>,
    created: DateTime<Utc>,
}

impl From<ElderlyProfileRaw> for ElderlyProfile {
    fn from(raw: ElderlyProfileRaw) -> Self {
        Self {
            id: raw.elderly_uid.into(),
            full_name: raw.full_name,
            phone: raw.phone,
            emergency_contact: raw.emergency_contact,
            telegram_chat_id: raw.telegram_chat_id,
            created: raw.created,
        }
    }
}

#[derive(Debug, FromRow)]
struct AppointmentRaw {
    appointment_uid: Uuid,
    elderly_uid: Uuid,
    scheduled_datetime: DateTime<Utc>,
    doctor_name: Option<String>,
    specialty: Option<String>,
    address: Option<String>,
    created: DateTime<Utc>,
}

impl From<AppointmentRaw> for Appointment {
    fn from(raw: AppointmentRaw) -> Self {
        Self {
            id: raw.appointment_uid.into(),
            elderly_id: raw.elderly_uid.into(),
            scheduled_datetime: raw.scheduled_datetime,
            doctor_name: raw.doctor_name,
            specialty: raw.specialty,
            address: raw.address,
            created: raw.created,
        }
    }
}

#[async_trait::async_trait]
impl IProfileRepo for PostgresProfileRepo {
    async fn insert_profile(&self, profile: &ElderlyProfile) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO elderly_profiles
            (elderly_uid, full_name, phone, emergency_contact, telegram_chat_id, created)
            VALUES($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(profile.id.inner_ref())
        .bind(&profile.full_name)
        .bind(profile.phone.as_deref())
        .bind(profile.emergency_contact.as_deref())
        .bind(profile.telegram_chat_id.as_deref())
        .bind(profile.created)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_profile(&self, profile_id: &ID) -> anyhow::Result<Option<ElderlyProfile>> {
        let raw: Option<ElderlyProfileRaw> = sqlx::query_as(
            r#"
            SELECT * FROM elderly_profiles AS p
            WHERE p.elderly_uid = $1
            "#,
        )
        .bind(profile_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(raw.map(ElderlyProfile::from))
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO appointments
            (appointment_uid, elderly_uid, scheduled_datetime, doctor_name, specialty, address, created)
            VALUES($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(appointment.id.inner_ref())
        .bind(appointment.elderly_id.inner_ref())
        .bind(appointment.scheduled_datetime)
        .bind(appointment.doctor_name.as_deref())
        .bind(appointment.specialty.as_deref())
        .bind(appointment.address.as_deref())
        .bind(appointment.created)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_appointment(&self, appointment_id: &ID) -> anyhow::Result<Option<Appointment>> {
        let raw: Option<AppointmentRaw> = sqlx::query_as(
            r#"
            SELECT * FROM appointments AS a
            WHERE a.appointment_uid = $1
            "#,
        )
        .bind(appointment_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(raw.map(Appointment::from))
    }
}
