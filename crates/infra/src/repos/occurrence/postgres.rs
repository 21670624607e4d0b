use super::{IOccurrenceRepo, ReplaceFutureResult};
use carecall_domain::{ReminderOccurrence, ID};
use chrono::{DateTime, Utc};
use sqlx::{types::Uuid, FromRow, PgConnection, PgPool};
use tracing::error;

pub struct PostgresOccurrenceRepo {
    pool: PgPool,
}

impl PostgresOccurrenceRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct OccurrenceRaw {
    occurrence_uid: Uuid,
    reminder_uid: Uuid,
    scheduled_datetime: DateTime<Utc>,
    status: String,
    taken_at: Option<DateTime<Utc>>,
    retry_count: i32,
    max_retries: i32,
    provider_message_id: Option<String>,
    notes: Option<String>,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl TryFrom<OccurrenceRaw> for ReminderOccurrence {
    type Error = anyhow::Error;

    fn try_from(raw: OccurrenceRaw) -> Result<Self, Self::Error> {
        Ok(Self {
            id: raw.occurrence_uid.into(),
            reminder_id: raw.reminder_uid.into(),
            scheduled_datetime: raw.scheduled_datetime,
            status: raw.status.parse()?,
            taken_at: raw.taken_at,
            retry_count: raw.retry_count,
            max_retries: raw.max_retries,
            provider_message_id: raw.provider_message_id,
            notes: raw.notes,
            created: raw.created,
            updated: raw.updated,
        })
    }
}

fn into_occurrences(raws: Vec<OccurrenceRaw>) -> anyhow::Result<Vec<ReminderOccurrence>> {
    raws.into_iter().map(ReminderOccurrence::try_from).collect()
}

const INSERT_IF_ABSENT: &str = r#"
    INSERT INTO reminder_occurrences
    (occurrence_uid, reminder_uid, scheduled_datetime, status, taken_at, retry_count,
     max_retries, provider_message_id, notes, created, updated)
    VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
    ON CONFLICT (reminder_uid, scheduled_datetime) DO NOTHING
"#;

fn bind_occurrence<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    occurrence: &'q ReminderOccurrence,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(occurrence.id.inner_ref())
        .bind(occurrence.reminder_id.inner_ref())
        .bind(occurrence.scheduled_datetime)
        .bind(occurrence.status.as_str())
        .bind(occurrence.taken_at)
        .bind(occurrence.retry_count)
        .bind(occurrence.max_retries)
        .bind(occurrence.provider_message_id.as_deref())
        .bind(occurrence.notes.as_deref())
        .bind(occurrence.created)
        .bind(occurrence.updated)
}

/// Drops the future `pending` occurrences of the reminder and inserts the new
/// ones on an open connection. The caller owns the transaction.
pub(crate) async fn replace_future_in(
    conn: &mut PgConnection,
    reminder_id: &ID,
    after: DateTime<Utc>,
    occurrences: &[ReminderOccurrence],
) -> anyhow::Result<ReplaceFutureResult> {
    let deleted = sqlx::query(
        r#"
        DELETE FROM reminder_occurrences AS o
        WHERE o.reminder_uid = $1 AND o.scheduled_datetime > $2 AND o.status = 'pending'
        "#,
    )
    .bind(reminder_id.inner_ref())
    .bind(after)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    let mut inserted = 0;
    for occurrence in occurrences {
        inserted += bind_occurrence(sqlx::query(INSERT_IF_ABSENT), occurrence)
            .execute(&mut *conn)
            .await?
            .rows_affected();
    }

    Ok(ReplaceFutureResult { deleted, inserted })
}

#[async_trait::async_trait]
impl IOccurrenceRepo for PostgresOccurrenceRepo {
    async fn insert_if_absent(&self, occurrence: &ReminderOccurrence) -> anyhow::Result<bool> {
        let res = bind_occurrence(sqlx::query(INSERT_IF_ABSENT), occurrence)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(
                    "Unable to insert occurrence: {:?}. DB returned error: {:?}",
                    occurrence, e
                );
                e
            })?;
        Ok(res.rows_affected() == 1)
    }

    async fn find(&self, occurrence_id: &ID) -> anyhow::Result<Option<ReminderOccurrence>> {
        let raw: Option<OccurrenceRaw> = sqlx::query_as(
            r#"
            SELECT * FROM reminder_occurrences AS o
            WHERE o.occurrence_uid = $1
            "#,
        )
        .bind(occurrence_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?;

        raw.map(ReminderOccurrence::try_from).transpose()
    }

    async fn find_by_reminder_and_time(
        &self,
        reminder_id: &ID,
        scheduled_datetime: DateTime<Utc>,
    ) -> anyhow::Result<Option<ReminderOccurrence>> {
        let raw: Option<OccurrenceRaw> = sqlx::query_as(
            r#"
            SELECT * FROM reminder_occurrences AS o
            WHERE o.reminder_uid = $1 AND o.scheduled_datetime = $2
            "#,
        )
        .bind(reminder_id.inner_ref())
        .bind(scheduled_datetime)
        .fetch_optional(&self.pool)
        .await?;

        raw.map(ReminderOccurrence::try_from).transpose()
    }

    async fn find_latest(&self, reminder_id: &ID) -> anyhow::Result<Option<ReminderOccurrence>> {
        let raw: Option<OccurrenceRaw> = sqlx::query_as(
            r#"
            SELECT * FROM reminder_occurrences AS o
            WHERE o.reminder_uid = $1
            ORDER BY o.scheduled_datetime DESC
            LIMIT 1
            "#,
        )
        .bind(reminder_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?;

        raw.map(ReminderOccurrence::try_from).transpose()
    }

    async fn find_by_reminder(&self, reminder_id: &ID) -> anyhow::Result<Vec<ReminderOccurrence>> {
        let raws: Vec<OccurrenceRaw> = sqlx::query_as(
            r#"
            SELECT * FROM reminder_occurrences AS o
            WHERE o.reminder_uid = $1
            ORDER BY o.scheduled_datetime
            "#,
        )
        .bind(reminder_id.inner_ref())
        .fetch_all(&self.pool)
        .await?;

        into_occurrences(raws)
    }

    async fn find_pending_due(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<ReminderOccurrence>> {
        let raws: Vec<OccurrenceRaw> = sqlx::query_as(
            r#"
            SELECT * FROM reminder_occurrences AS o
            WHERE o.status = 'pending' AND o.scheduled_datetime <= $1
            ORDER BY o.scheduled_datetime
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        into_occurrences(raws)
    }

    async fn find_by_provider_message_id(
        &self,
        provider_message_id: &str,
    ) -> anyhow::Result<Option<ReminderOccurrence>> {
        let raw: Option<OccurrenceRaw> = sqlx::query_as(
            r#"
            SELECT * FROM reminder_occurrences AS o
            WHERE o.provider_message_id = $1
            ORDER BY o.updated DESC
            LIMIT 1
            "#,
        )
        .bind(provider_message_id)
        .fetch_optional(&self.pool)
        .await?;

        raw.map(ReminderOccurrence::try_from).transpose()
    }

    async fn replace_future(
        &self,
        reminder_id: &ID,
        after: DateTime<Utc>,
        occurrences: &[ReminderOccurrence],
    ) -> anyhow::Result<ReplaceFutureResult> {
        let mut tx = self.pool.begin().await?;

        // Serialises concurrent regenerations of the same reminder
        sqlx::query("SELECT reminder_uid FROM reminders WHERE reminder_uid = $1 FOR UPDATE")
            .bind(reminder_id.inner_ref())
            .fetch_optional(&mut *tx)
            .await?;
        let res = replace_future_in(&mut *tx, reminder_id, after, occurrences).await?;

        tx.commit().await?;

        Ok(res)
    }

    async fn reset_for_retry(
        &self,
        occurrence_id: &ID,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<ReminderOccurrence>> {
        let raw: Option<OccurrenceRaw> = sqlx::query_as(
            r#"
            UPDATE reminder_occurrences
            SET status = 'pending',
            retry_count = retry_count + 1,
            provider_message_id = NULL,
            notes = COALESCE($2, notes),
            updated = $3
            WHERE occurrence_uid = $1 AND status = 'failure' AND retry_count < max_retries
            RETURNING *
            "#,
        )
        .bind(occurrence_id.inner_ref())
        .bind(notes)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        raw.map(ReminderOccurrence::try_from).transpose()
    }
}
