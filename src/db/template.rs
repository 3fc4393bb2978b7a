//! PostgreSQL persistence for certificate templates

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::template::{TemplateRecord, TemplateStore};

/// Advisory lock key serializing writes that change which template is active.
const ACTIVE_TEMPLATE_LOCK: i64 = 0x7461_686669_647a;

const SELECT_COLUMNS: &str =
    "id, display_name, storage_key, width, height, is_active, uploaded_by, uploaded_at";

pub struct PgTemplateStore {
    pool: PgPool,
}

impl PgTemplateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin_exclusive(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(ACTIVE_TEMPLATE_LOCK)
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

#[async_trait]
impl TemplateStore for PgTemplateStore {
    async fn insert_active(&self, record: &TemplateRecord) -> Result<(), sqlx::Error> {
        let mut tx = self.begin_exclusive().await?;

        sqlx::query("UPDATE certificate_templates SET is_active = FALSE WHERE is_active")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO certificate_templates
                (id, display_name, storage_key, width, height, is_active, uploaded_by, uploaded_at)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(&record.display_name)
        .bind(&record.storage_key)
        .bind(record.width)
        .bind(record.height)
        .bind(&record.uploaded_by)
        .bind(record.uploaded_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }

    async fn activate_exclusive(&self, id: Uuid) -> Result<Option<TemplateRecord>, sqlx::Error> {
        let mut tx = self.begin_exclusive().await?;

        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM certificate_templates WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query(
            "UPDATE certificate_templates SET is_active = FALSE WHERE is_active AND id <> $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let record = sqlx::query_as::<_, TemplateRecord>(&format!(
            "UPDATE certificate_templates SET is_active = TRUE WHERE id = $1 RETURNING {}",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(record))
    }

    async fn deactivate_if_active(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE certificate_templates SET is_active = FALSE WHERE id = $1 AND is_active",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_if_inactive(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM certificate_templates WHERE id = $1 AND NOT is_active")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn find(&self, id: Uuid) -> Result<Option<TemplateRecord>, sqlx::Error> {
        sqlx::query_as::<_, TemplateRecord>(&format!(
            "SELECT {} FROM certificate_templates WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_active(&self) -> Result<Option<TemplateRecord>, sqlx::Error> {
        sqlx::query_as::<_, TemplateRecord>(&format!(
            "SELECT {} FROM certificate_templates WHERE is_active",
            SELECT_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await
    }

    async fn list(&self) -> Result<Vec<TemplateRecord>, sqlx::Error> {
        sqlx::query_as::<_, TemplateRecord>(&format!(
            "SELECT {} FROM certificate_templates ORDER BY uploaded_at DESC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
    }
}
