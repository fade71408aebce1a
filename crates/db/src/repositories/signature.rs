use sqlx::sqlite::SqliteExecutor;
use sqlx::Row;

use travo_core::{ActorId, OrderId, SignatureId, SignatureRecord};

use super::{decode_datetime, RepositoryError};
use crate::DbPool;

fn row_to_signature(row: &sqlx::sqlite::SqliteRow) -> Result<SignatureRecord, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let order_id: String =
        row.try_get("order_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let signed_by: String =
        row.try_get("signed_by").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let comment: Option<String> =
        row.try_get("comment").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let payload: String =
        row.try_get("payload").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let signed_at: String =
        row.try_get("signed_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(SignatureRecord {
        id: SignatureId(id),
        order_id: OrderId(order_id),
        signed_by: ActorId(signed_by),
        comment,
        payload,
        signed_at: decode_datetime(&signed_at)?,
    })
}

/// Append one decision record. There is deliberately no update or delete
/// statement for this table anywhere in the crate.
pub async fn append<'e, E>(executor: E, record: &SignatureRecord) -> Result<(), RepositoryError>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO signature_record (id, order_id, signed_by, comment, payload, signed_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&record.id.0)
    .bind(&record.order_id.0)
    .bind(&record.signed_by.0)
    .bind(&record.comment)
    .bind(&record.payload)
    .bind(record.signed_at.to_rfc3339())
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn list_for_order<'e, E>(
    executor: E,
    order_id: &OrderId,
) -> Result<Vec<SignatureRecord>, RepositoryError>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query(
        "SELECT id, order_id, signed_by, comment, payload, signed_at
         FROM signature_record WHERE order_id = ? ORDER BY signed_at ASC, id ASC",
    )
    .bind(&order_id.0)
    .fetch_all(executor)
    .await?;

    rows.iter().map(row_to_signature).collect()
}

pub struct SqlSignatureStore {
    pool: DbPool,
}

impl SqlSignatureStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<SignatureRecord>, RepositoryError> {
        list_for_order(&self.pool, order_id).await
    }
}
