use super::IMedicineRepo;
use carecall_domain::{Medicine, ID};
use chrono::{DateTime, Utc};
use sqlx::{types::Uuid, FromRow, PgPool};
use tracing::error;

pub struct PostgresMedicineRepo {
    pool: PgPool,
}

impl PostgresMedicineRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct MedicineRaw {
    medicine_uid: Uuid,
    elderly_uid: Uuid,
    name: String,
    dosage: Option<String>,
    total_tablets: Option<i32>,
    tablets_left: Option<i32>,
    tablets_per_dose: Option<i32>,
    notes: Option<String>,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl From<MedicineRaw> for Medicine {
    fn from(raw: MedicineRaw) -> Self {
        Self {
            id: raw.medicine_uid.into(),
            elderly_id: raw.elderly_uid.into(),
            name: raw.name,
            dosage: raw.dosage,
            total_tablets: raw.total_tablets,
            tablets_left: raw.tablets_left,
            tablets_per_dose: raw.tablets_per_dose,
            notes: raw.notes,
            created: raw.created,
            updated: raw.updated,
        }
    }
}

#[async_trait::async_trait]
impl IMedicineRepo for PostgresMedicineRepo {
    async fn insert(&self, medicine: &Medicine) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO medicines
            (medicine_uid, elderly_uid, name, dosage, total_tablets, tablets_left,
             tablets_per_dose, notes, created, updated)
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(medicine.id.inner_ref())
        .bind(medicine.elderly_id.inner_ref())
        .bind(&medicine.name)
        .bind(medicine.dosage.as_deref())
        .bind(medicine.total_tablets)
        .bind(medicine.tablets_left)
        .bind(medicine.tablets_per_dose)
        .bind(medicine.notes.as_deref())
        .bind(medicine.created)
        .bind(medicine.updated)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Unable to insert medicine: {:?}. DB returned error: {:?}",
                medicine, e
            );
            e
        })?;
        Ok(())
    }

    async fn save(&self, medicine: &Medicine) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE medicines
            SET name = $2,
            dosage = $3,
            total_tablets = $4,
            tablets_left = $5,
            tablets_per_dose = $6,
            notes = $7,
            updated = $8
            WHERE medicine_uid = $1
            "#,
        )
        .bind(medicine.id.inner_ref())
        .bind(&medicine.name)
        .bind(medicine.dosage.as_deref())
        .bind(medicine.total_tablets)
        .bind(medicine.tablets_left)
        .bind(medicine.tablets_per_dose)
        .bind(medicine.notes.as_deref())
        .bind(medicine.updated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, medicine_id: &ID) -> anyhow::Result<Option<Medicine>> {
        let raw: Option<MedicineRaw> = sqlx::query_as(
            r#"
            SELECT * FROM medicines AS m
            WHERE m.medicine_uid = $1
            "#,
        )
        .bind(medicine_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(raw.map(Medicine::from))
    }
}
