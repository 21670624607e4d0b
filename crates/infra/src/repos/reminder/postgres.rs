use super::IReminderRepo;
use carecall_domain::{Reminder, ID};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{types::Uuid, Executor, FromRow, PgPool, Postgres};
use tracing::error;

pub struct PostgresReminderRepo {
    pool: PgPool,
}

impl PostgresReminderRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ReminderRaw {
    reminder_uid: Uuid,
    reminder_type: String,
    start_date: DateTime<Utc>,
    periodicity: Option<i64>,
    end_date: Option<NaiveDate>,
    is_active: bool,
    medicine_uid: Option<Uuid>,
    appointment_uid: Option<Uuid>,
    elderly_uid: Option<Uuid>,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl TryFrom<ReminderRaw> for Reminder {
    type Error = anyhow::Error;

    fn try_from(raw: ReminderRaw) -> Result<Self, Self::Error> {
        Ok(Self {
            id: raw.reminder_uid.into(),
            reminder_type: raw.reminder_type.parse()?,
            start_date: raw.start_date,
            periodicity: raw.periodicity,
            end_date: raw.end_date,
            is_active: raw.is_active,
            medicine_id: raw.medicine_uid.map(ID::from),
            appointment_id: raw.appointment_uid.map(ID::from),
            elderly_profile_id: raw.elderly_uid.map(ID::from),
            created: raw.created,
            updated: raw.updated,
        })
    }
}

pub(crate) async fn save_in<'c, E>(executor: E, reminder: &Reminder) -> anyhow::Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        r#"
        UPDATE reminders
        SET reminder_type = $2,
        start_date = $3,
        periodicity = $4,
        end_date = $5,
        is_active = $6,
        medicine_uid = $7,
        appointment_uid = $8,
        elderly_uid = $9,
        updated = $10
        WHERE reminder_uid = $1
        "#,
    )
    .bind(reminder.id.inner_ref())
    .bind(reminder.reminder_type.as_str())
    .bind(reminder.start_date)
    .bind(reminder.periodicity)
    .bind(reminder.end_date)
    .bind(reminder.is_active)
    .bind(reminder.medicine_id.as_ref().map(|id| *id.inner_ref()))
    .bind(reminder.appointment_id.as_ref().map(|id| *id.inner_ref()))
    .bind(reminder.elderly_profile_id.as_ref().map(|id| *id.inner_ref()))
    .bind(reminder.updated)
    .execute(executor)
    .await
    .map_err(|e| {
        error!(
            "Unable to save reminder: {:?}. DB returned error: {:?}",
            reminder, e
        );
        e
    })?;
    Ok(())
}

#[async_trait::async_trait]
impl IReminderRepo for PostgresReminderRepo {
    async fn insert(&self, reminder: &Reminder) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reminders
            (reminder_uid, reminder_type, start_date, periodicity, end_date, is_active,
             medicine_uid, appointment_uid, elderly_uid, created, updated)
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(reminder.id.inner_ref())
        .bind(reminder.reminder_type.as_str())
        .bind(reminder.start_date)
        .bind(reminder.periodicity)
        .bind(reminder.end_date)
        .bind(reminder.is_active)
        .bind(reminder.medicine_id.as_ref().map(|id| *id.inner_ref()))
        .bind(reminder.appointment_id.as_ref().map(|id| *id.inner_ref()))
        .bind(reminder.elderly_profile_id.as_ref().map(|id| *id.inner_ref()))
        .bind(reminder.created)
        .bind(reminder.updated)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Unable to insert reminder: {:?}. DB returned error: {:?}",
                reminder, e
            );
            e
        })?;
        Ok(())
    }

    async fn save(&self, reminder: &Reminder) -> anyhow::Result<()> {
        save_in(&self.pool, reminder).await
    }

    async fn find(&self, reminder_id: &ID) -> anyhow::Result<Option<Reminder>> {
        let raw: Option<ReminderRaw> = sqlx::query_as(
            r#"
            SELECT * FROM reminders AS r
            WHERE r.reminder_uid = $1
            "#,
        )
        .bind(reminder_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?;

        raw.map(Reminder::try_from).transpose()
    }

    async fn find_active_started(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<Reminder>> {
        let raws: Vec<ReminderRaw> = sqlx::query_as(
            r#"
            SELECT * FROM reminders AS r
            WHERE r.is_active AND r.start_date <= $1
            ORDER BY r.start_date
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        // A single malformed row must not hide every other reminder from the scheduler
        Ok(raws
            .into_iter()
            .filter_map(|raw| {
                let reminder_uid = raw.reminder_uid;
                Reminder::try_from(raw)
                    .map_err(|e| error!("Skipping malformed reminder {}: {:?}", reminder_uid, e))
                    .ok()
            })
            .collect())
    }

    async fn delete(&self, reminder_id: &ID) -> anyhow::Result<Option<Reminder>> {
        let raw: Option<ReminderRaw> = sqlx::query_as(
            r#"
            DELETE FROM reminders AS r
            WHERE r.reminder_uid = $1
            RETURNING *
            "#,
        )
        .bind(reminder_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?;

        raw.map(Reminder::try_from).transpose()
    }
}
