use super::{
    ExpiredClaim, IDeliveryRepo, ResolutionOutcome, ResponseResolution, INTERRUPTED_DISPATCH,
};
use crate::repos::{
    occurrence::{replace_future_in, ReplaceFutureResult},
    reminder::save_in,
};
use carecall_domain::{
    DispatchOutcome, NotificationAttempt, OccurrenceStatus, Reminder, ReminderOccurrence, ID,
};
use chrono::{DateTime, Utc};
use sqlx::{types::Uuid, PgPool};
use tracing::error;

pub struct PostgresDeliveryRepo {
    pool: PgPool,
}

impl PostgresDeliveryRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl IDeliveryRepo for PostgresDeliveryRepo {
    async fn begin_dispatch(&self, attempt: &NotificationAttempt) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            INSERT INTO notification_attempts
            (attempt_uid, occurrence_uid, channel, recipient, status, created)
            SELECT $1, $2, $3, $4, 'pending', $5
            WHERE EXISTS (
                SELECT 1 FROM reminder_occurrences AS o
                WHERE o.occurrence_uid = $2 AND o.status = 'pending'
            )
            ON CONFLICT (occurrence_uid) WHERE status = 'pending' DO NOTHING
            "#,
        )
        .bind(attempt.id.inner_ref())
        .bind(attempt.occurrence_id.inner_ref())
        .bind(attempt.channel.as_str())
        .bind(&attempt.recipient)
        .bind(attempt.created)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Unable to insert notification attempt: {:?}. DB returned error: {:?}",
                attempt, e
            );
            e
        })?;

        Ok(res.rows_affected() == 1)
    }

    async fn record_dispatch(
        &self,
        occurrence_id: &ID,
        attempt_id: &ID,
        outcome: &DispatchOutcome,
        at: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        let (attempt_status, sent_at, error_message, occurrence_status, provider_message_id) =
            match outcome {
                DispatchOutcome::Sent {
                    provider_message_id,
                } => (
                    "sent",
                    Some(at),
                    None,
                    OccurrenceStatus::Waiting,
                    provider_message_id.as_deref(),
                ),
                DispatchOutcome::Failed { error } => (
                    "failed",
                    None,
                    Some(error.as_str()),
                    OccurrenceStatus::Failure,
                    None,
                ),
            };

        sqlx::query(
            r#"
            UPDATE notification_attempts
            SET status = $2,
            sent_at = $3,
            error_message = $4
            WHERE attempt_uid = $1 AND status = 'pending'
            "#,
        )
        .bind(attempt_id.inner_ref())
        .bind(attempt_status)
        .bind(sent_at)
        .bind(error_message)
        .execute(&mut *tx)
        .await?;

        let transitioned = sqlx::query(
            r#"
            UPDATE reminder_occurrences
            SET status = $2,
            provider_message_id = COALESCE($3, provider_message_id),
            updated = $4
            WHERE occurrence_uid = $1 AND status = 'pending'
            "#,
        )
        .bind(occurrence_id.inner_ref())
        .bind(occurrence_status.as_str())
        .bind(provider_message_id)
        .bind(at)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        tx.commit().await?;

        Ok(transitioned)
    }

    async fn expire_stale_claims(
        &self,
        claimed_before: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ExpiredClaim>> {
        let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
            r#"
            WITH stale AS (
                UPDATE notification_attempts
                SET status = 'failed',
                error_message = $3
                WHERE status = 'pending' AND created < $1
                RETURNING occurrence_uid
            )
            UPDATE reminder_occurrences AS o
            SET status = 'failure',
            updated = $2
            FROM stale
            WHERE o.occurrence_uid = stale.occurrence_uid AND o.status = 'pending'
            RETURNING o.occurrence_uid, o.reminder_uid
            "#,
        )
        .bind(claimed_before)
        .bind(at)
        .bind(INTERRUPTED_DISPATCH)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(occurrence_uid, reminder_uid)| ExpiredClaim {
                occurrence_id: occurrence_uid.into(),
                reminder_id: reminder_uid.into(),
            })
            .collect())
    }

    async fn resolve_response(
        &self,
        resolution: &ResponseResolution,
    ) -> anyhow::Result<ResolutionOutcome> {
        let mut tx = self.pool.begin().await?;

        let taken_at = match resolution.resolved_status {
            OccurrenceStatus::Success => Some(resolution.at),
            _ => None,
        };
        let transitioned = sqlx::query(
            r#"
            UPDATE reminder_occurrences
            SET status = $2,
            taken_at = COALESCE($3, taken_at),
            updated = $4
            WHERE occurrence_uid = $1 AND status = 'waiting'
            "#,
        )
        .bind(resolution.occurrence_id.inner_ref())
        .bind(resolution.resolved_status.as_str())
        .bind(taken_at)
        .bind(resolution.at)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if !transitioned {
            tx.rollback().await?;
            let status: Option<String> = sqlx::query_scalar(
                "SELECT status FROM reminder_occurrences WHERE occurrence_uid = $1",
            )
            .bind(resolution.occurrence_id.inner_ref())
            .fetch_optional(&self.pool)
            .await?;
            return Ok(match status {
                Some(status) => ResolutionOutcome::AlreadyResolved(status.parse()?),
                None => ResolutionOutcome::OccurrenceNotFound,
            });
        }

        if let Some(attempt_id) = &resolution.attempt_id {
            sqlx::query(
                r#"
                UPDATE notification_attempts
                SET status = $2,
                response = $3,
                delivered_at = $4
                WHERE attempt_uid = $1 AND status IN ('pending', 'sent')
                "#,
            )
            .bind(attempt_id.inner_ref())
            .bind(resolution.attempt_status.as_str())
            .bind(&resolution.response)
            .bind(resolution.at)
            .execute(&mut *tx)
            .await?;
        }

        let mut tablets_left = None;
        if let Some(stock) = &resolution.stock {
            let left: Option<Option<i32>> = sqlx::query_scalar(
                r#"
                UPDATE medicines
                SET tablets_left = GREATEST(tablets_left - $2, 0),
                updated = $3
                WHERE medicine_uid = $1 AND tablets_left > 0
                RETURNING tablets_left
                "#,
            )
            .bind(stock.medicine_id.inner_ref())
            .bind(stock.tablets)
            .bind(resolution.at)
            .fetch_optional(&mut *tx)
            .await?;
            tablets_left = left.flatten();
        }

        tx.commit().await?;

        Ok(ResolutionOutcome::Applied { tablets_left })
    }

    async fn reschedule(
        &self,
        reminder: &Reminder,
        after: DateTime<Utc>,
        occurrences: &[ReminderOccurrence],
    ) -> anyhow::Result<ReplaceFutureResult> {
        let mut tx = self.pool.begin().await?;

        let found =
            sqlx::query("SELECT reminder_uid FROM reminders WHERE reminder_uid = $1 FOR UPDATE")
                .bind(reminder.id.inner_ref())
                .fetch_optional(&mut *tx)
                .await?;
        if found.is_none() {
            anyhow::bail!("Reminder {} does not exist", reminder.id);
        }
        save_in(&mut *tx, reminder).await?;
        let res = replace_future_in(&mut *tx, &reminder.id, after, occurrences).await?;

        tx.commit().await?;

        Ok(res)
    }
}
