use super::INotificationAttemptRepo;
use carecall_domain::{Channel, NotificationAttempt, ID};
use chrono::{DateTime, Utc};
use sqlx::{types::Uuid, FromRow, PgPool};

pub struct PostgresNotificationAttemptRepo {
    pool: PgPool,
}

impl PostgresNotificationAttemptRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct NotificationAttemptRaw {
    attempt_uid: Uuid,
    occurrence_uid: Uuid,
    channel: String,
    recipient: String,
    status: String,
    sent_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    response: Option<String>,
    error_message: Option<String>,
    created: DateTime<Utc>,
}

impl TryFrom<NotificationAttemptRaw> for NotificationAttempt {
    type Error = anyhow::Error;

    fn try_from(raw: NotificationAttemptRaw) -> Result<Self, Self::Error> {
        Ok(Self {
            id: raw.attempt_uid.into(),
            occurrence_id: raw.occurrence_uid.into(),
            channel: raw.channel.parse()?,
            recipient: raw.recipient,
            status: raw.status.parse()?,
            sent_at: raw.sent_at,
            delivered_at: raw.delivered_at,
            response: raw.response,
            error_message: raw.error_message,
            created: raw.created,
        })
    }
}

#[async_trait::async_trait]
impl INotificationAttemptRepo for PostgresNotificationAttemptRepo {
    async fn find(&self, attempt_id: &ID) -> anyhow::Result<Option<NotificationAttempt>> {
        let raw: Option<NotificationAttemptRaw> = sqlx::query_as(
            r#"
            SELECT * FROM notification_attempts AS a
            WHERE a.attempt_uid = $1
            "#,
        )
        .bind(attempt_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?;

        raw.map(NotificationAttempt::try_from).transpose()
    }

    async fn find_by_occurrence(
        &self,
        occurrence_id: &ID,
    ) -> anyhow::Result<Vec<NotificationAttempt>> {
        let raws: Vec<NotificationAttemptRaw> = sqlx::query_as(
            r#"
            SELECT * FROM notification_attempts AS a
            WHERE a.occurrence_uid = $1
            ORDER BY a.created
            "#,
        )
        .bind(occurrence_id.inner_ref())
        .fetch_all(&self.pool)
        .await?;

        raws.into_iter().map(NotificationAttempt::try_from).collect()
    }

    async fn find_latest_sent_for_occurrence(
        &self,
        occurrence_id: &ID,
    ) -> anyhow::Result<Option<NotificationAttempt>> {
        let raw: Option<NotificationAttemptRaw> = sqlx::query_as(
            r#"
            SELECT * FROM notification_attempts AS a
            WHERE a.occurrence_uid = $1 AND a.status = 'sent'
            ORDER BY a.created DESC
            LIMIT 1
            "#,
        )
        .bind(occurrence_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?;

        raw.map(NotificationAttempt::try_from).transpose()
    }

    async fn find_sent_for_recipient(
        &self,
        channel: Channel,
        recipient: &str,
    ) -> anyhow::Result<Vec<NotificationAttempt>> {
        let raws: Vec<NotificationAttemptRaw> = sqlx::query_as(
            r#"
            SELECT * FROM notification_attempts AS a
            WHERE a.channel = $1 AND a.recipient = $2 AND a.status = 'sent'
            ORDER BY a.created DESC
            "#,
        )
        .bind(channel.as_str())
        .bind(recipient)
        .fetch_all(&self.pool)
        .await?;

        raws.into_iter().map(NotificationAttempt::try_from).collect()
    }
}
