use sqlx::sqlite::SqliteExecutor;
use sqlx::Row;

use travo_core::{ActorId, ApproverCandidate, UnitCode};

use super::{decode_datetime, RepositoryError};
use crate::DbPool;

fn row_to_candidate(row: &sqlx::sqlite::SqliteRow) -> Result<ApproverCandidate, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let full_name: String =
        row.try_get("full_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let unit_code: Option<String> =
        row.try_get("unit_code").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_unit_head: bool =
        row.try_get("is_unit_head").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_top_authority: bool =
        row.try_get("is_top_authority").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let active: bool =
        row.try_get("active").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(ApproverCandidate {
        id: ActorId(id),
        full_name,
        unit: unit_code.map(UnitCode),
        is_unit_head,
        is_top_authority,
        active,
        created_at: decode_datetime(&created_at)?,
        updated_at: decode_datetime(&updated_at)?,
    })
}

/// Active directory rows, in id order, ready for `DirectoryIndex::new`.
/// Callable inside a transition's transaction so the snapshot is consistent
/// with the rest of the read set.
pub async fn list_active<'e, E>(executor: E) -> Result<Vec<ApproverCandidate>, RepositoryError>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query(
        "SELECT id, full_name, unit_code, is_unit_head, is_top_authority, active,
                created_at, updated_at
         FROM approver_candidate WHERE active = 1 ORDER BY id ASC",
    )
    .fetch_all(executor)
    .await?;

    rows.iter().map(row_to_candidate).collect()
}

pub struct SqlDirectoryStore {
    pool: DbPool,
}

impl SqlDirectoryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(
        &self,
        id: &ActorId,
    ) -> Result<Option<ApproverCandidate>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, full_name, unit_code, is_unit_head, is_top_authority, active,
                    created_at, updated_at
             FROM approver_candidate WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref row) => Ok(Some(row_to_candidate(row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_active(&self) -> Result<Vec<ApproverCandidate>, RepositoryError> {
        list_active(&self.pool).await
    }

    /// Staffing probe used by readiness checks: routing falls back to the top
    /// authority, so zero here can deadlock every chain.
    pub async fn count_active_top_authorities(&self) -> Result<i64, RepositoryError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM approver_candidate
             WHERE is_top_authority = 1 AND active = 1",
        )
        .fetch_one(&self.pool)
        .await?;

        row.try_get("count").map_err(|e| RepositoryError::Decode(e.to_string()))
    }

    pub async fn save(&self, candidate: ApproverCandidate) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO approver_candidate
                 (id, full_name, unit_code, is_unit_head, is_top_authority, active,
                  created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 full_name = excluded.full_name,
                 unit_code = excluded.unit_code,
                 is_unit_head = excluded.is_unit_head,
                 is_top_authority = excluded.is_top_authority,
                 active = excluded.active,
                 updated_at = excluded.updated_at",
        )
        .bind(&candidate.id.0)
        .bind(&candidate.full_name)
        .bind(candidate.unit.as_ref().map(|unit| unit.0.clone()))
        .bind(candidate.is_unit_head)
        .bind(candidate.is_top_authority)
        .bind(candidate.active)
        .bind(candidate.created_at.to_rfc3339())
        .bind(candidate.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
