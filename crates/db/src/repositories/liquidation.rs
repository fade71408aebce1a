use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::sqlite::SqliteExecutor;
use sqlx::Row;

use travo_core::{
    ActorId, DocumentHandle, Liquidation, LiquidationId, LiquidationStatus, OrderId, ReviewField,
    ReviewOutcome,
};

use super::{decode_datetime, RepositoryError};
use crate::DbPool;

const SELECT_COLUMNS: &str = "id, order_id, owner_id, amount_claimed, receipts_handle,
       bookkeeper_outcome, bookkeeper_reviewer, bookkeeper_comment, bookkeeper_reviewed_at,
       accountant_outcome, accountant_reviewer, accountant_comment, accountant_reviewed_at,
       status, created_at, updated_at";

fn decode_review(
    outcome_raw: &str,
    reviewer: Option<String>,
    comment: Option<String>,
    reviewed_at: Option<String>,
) -> Result<ReviewField, RepositoryError> {
    let outcome = ReviewOutcome::parse_code(outcome_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown review outcome `{outcome_raw}`")))?;
    let reviewed_at = match reviewed_at {
        Some(raw) => Some(decode_datetime(&raw)?),
        None => None,
    };
    Ok(ReviewField { outcome, reviewer: reviewer.map(ActorId), comment, reviewed_at })
}

fn row_to_liquidation(row: &sqlx::sqlite::SqliteRow) -> Result<Liquidation, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let order_id: String =
        row.try_get("order_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let owner_id: String =
        row.try_get("owner_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let amount_raw: String =
        row.try_get("amount_claimed").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let receipts_handle: Option<String> =
        row.try_get("receipts_handle").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let bookkeeper_outcome: String =
        row.try_get("bookkeeper_outcome").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let bookkeeper_reviewer: Option<String> =
        row.try_get("bookkeeper_reviewer").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let bookkeeper_comment: Option<String> =
        row.try_get("bookkeeper_comment").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let bookkeeper_reviewed_at: Option<String> = row
        .try_get("bookkeeper_reviewed_at")
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let accountant_outcome: String =
        row.try_get("accountant_outcome").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let accountant_reviewer: Option<String> =
        row.try_get("accountant_reviewer").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let accountant_comment: Option<String> =
        row.try_get("accountant_comment").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let accountant_reviewed_at: Option<String> = row
        .try_get("accountant_reviewed_at")
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_raw: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let amount_claimed = Decimal::from_str(&amount_raw)
        .map_err(|error| RepositoryError::Decode(format!("bad amount `{amount_raw}`: {error}")))?;
    let status = LiquidationStatus::parse_code(&status_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown liquidation status `{status_raw}`"))
    })?;

    Ok(Liquidation {
        id: LiquidationId(id),
        order_id: OrderId(order_id),
        owner: ActorId(owner_id),
        amount_claimed,
        receipts: receipts_handle.map(DocumentHandle),
        bookkeeper: decode_review(
            &bookkeeper_outcome,
            bookkeeper_reviewer,
            bookkeeper_comment,
            bookkeeper_reviewed_at,
        )?,
        accountant: decode_review(
            &accountant_outcome,
            accountant_reviewer,
            accountant_comment,
            accountant_reviewed_at,
        )?,
        status,
        created_at: decode_datetime(&created_at)?,
        updated_at: decode_datetime(&updated_at)?,
    })
}

pub async fn fetch<'e, E>(
    executor: E,
    id: &LiquidationId,
) -> Result<Option<Liquidation>, RepositoryError>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM liquidation WHERE id = ?"))
        .bind(&id.0)
        .fetch_optional(executor)
        .await?;

    match row {
        Some(ref row) => Ok(Some(row_to_liquidation(row)?)),
        None => Ok(None),
    }
}

pub async fn fetch_by_order<'e, E>(
    executor: E,
    order_id: &OrderId,
) -> Result<Option<Liquidation>, RepositoryError>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM liquidation WHERE order_id = ?"))
        .bind(&order_id.0)
        .fetch_optional(executor)
        .await?;

    match row {
        Some(ref row) => Ok(Some(row_to_liquidation(row)?)),
        None => Ok(None),
    }
}

pub async fn insert<'e, E>(executor: E, liquidation: &Liquidation) -> Result<(), RepositoryError>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO liquidation
             (id, order_id, owner_id, amount_claimed, receipts_handle,
              bookkeeper_outcome, bookkeeper_reviewer, bookkeeper_comment, bookkeeper_reviewed_at,
              accountant_outcome, accountant_reviewer, accountant_comment, accountant_reviewed_at,
              status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&liquidation.id.0)
    .bind(&liquidation.order_id.0)
    .bind(&liquidation.owner.0)
    .bind(liquidation.amount_claimed.to_string())
    .bind(liquidation.receipts.as_ref().map(|handle| handle.0.clone()))
    .bind(liquidation.bookkeeper.outcome.as_code())
    .bind(liquidation.bookkeeper.reviewer.as_ref().map(|actor| actor.0.clone()))
    .bind(&liquidation.bookkeeper.comment)
    .bind(liquidation.bookkeeper.reviewed_at.map(|at| at.to_rfc3339()))
    .bind(liquidation.accountant.outcome.as_code())
    .bind(liquidation.accountant.reviewer.as_ref().map(|actor| actor.0.clone()))
    .bind(&liquidation.accountant.comment)
    .bind(liquidation.accountant.reviewed_at.map(|at| at.to_rfc3339()))
    .bind(liquidation.status.as_code())
    .bind(liquidation.created_at.to_rfc3339())
    .bind(liquidation.updated_at.to_rfc3339())
    .execute(executor)
    .await?;

    Ok(())
}

/// Optimistic write guarded on the status the review read; same backstop
/// role as the travel-order guard.
pub async fn update_guarded<'e, E>(
    executor: E,
    liquidation: &Liquidation,
    expected_status: &str,
) -> Result<(), RepositoryError>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE liquidation SET
             bookkeeper_outcome = ?, bookkeeper_reviewer = ?, bookkeeper_comment = ?,
             bookkeeper_reviewed_at = ?,
             accountant_outcome = ?, accountant_reviewer = ?, accountant_comment = ?,
             accountant_reviewed_at = ?,
             status = ?, updated_at = ?
         WHERE id = ? AND status = ?",
    )
    .bind(liquidation.bookkeeper.outcome.as_code())
    .bind(liquidation.bookkeeper.reviewer.as_ref().map(|actor| actor.0.clone()))
    .bind(&liquidation.bookkeeper.comment)
    .bind(liquidation.bookkeeper.reviewed_at.map(|at| at.to_rfc3339()))
    .bind(liquidation.accountant.outcome.as_code())
    .bind(liquidation.accountant.reviewer.as_ref().map(|actor| actor.0.clone()))
    .bind(&liquidation.accountant.comment)
    .bind(liquidation.accountant.reviewed_at.map(|at| at.to_rfc3339()))
    .bind(liquidation.status.as_code())
    .bind(liquidation.updated_at.to_rfc3339())
    .bind(&liquidation.id.0)
    .bind(expected_status)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::Conflict(liquidation.id.0.clone()));
    }
    Ok(())
}

pub struct SqlLiquidationStore {
    pool: DbPool,
}

impl SqlLiquidationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(
        &self,
        id: &LiquidationId,
    ) -> Result<Option<Liquidation>, RepositoryError> {
        fetch(&self.pool, id).await
    }

    pub async fn find_by_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<Liquidation>, RepositoryError> {
        fetch_by_order(&self.pool, order_id).await
    }

    pub async fn list(&self) -> Result<Vec<Liquidation>, RepositoryError> {
        let rows =
            sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM liquidation ORDER BY created_at DESC"))
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(row_to_liquidation).collect()
    }
}
