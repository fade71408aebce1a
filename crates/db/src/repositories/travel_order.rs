use sqlx::sqlite::SqliteExecutor;
use sqlx::Row;

use travo_core::{
    ActorId, DocumentHandle, OrderId, OrderStatus, Rejection, Requester, TravelOrder, UnitCode,
};

use super::{decode_date, decode_datetime, encode_date, RepositoryError};
use crate::DbPool;

const SELECT_COLUMNS: &str = "id, requester_id, requester_unit, requester_is_head,
       requester_is_top_authority, prepared_by, participants, destination, purpose,
       depart_on, return_on, evidence_handle, status, chain_position, current_approver,
       order_number, rejected_by, rejected_at, rejection_comment, is_resubmitted,
       submitted_at, updated_at";

fn row_to_order(row: &sqlx::sqlite::SqliteRow) -> Result<TravelOrder, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requester_id: String =
        row.try_get("requester_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requester_unit: String =
        row.try_get("requester_unit").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requester_is_head: bool =
        row.try_get("requester_is_head").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requester_is_top_authority: bool = row
        .try_get("requester_is_top_authority")
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let prepared_by: String =
        row.try_get("prepared_by").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let participants_raw: String =
        row.try_get("participants").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let destination: String =
        row.try_get("destination").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let purpose: String =
        row.try_get("purpose").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let depart_on: String =
        row.try_get("depart_on").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let return_on: String =
        row.try_get("return_on").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let evidence_handle: Option<String> =
        row.try_get("evidence_handle").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_raw: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let chain_position: i64 =
        row.try_get("chain_position").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let current_approver: Option<String> =
        row.try_get("current_approver").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let order_number: Option<String> =
        row.try_get("order_number").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let rejected_by: Option<String> =
        row.try_get("rejected_by").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let rejected_at: Option<String> =
        row.try_get("rejected_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let rejection_comment: Option<String> =
        row.try_get("rejection_comment").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_resubmitted: bool =
        row.try_get("is_resubmitted").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let submitted_at: String =
        row.try_get("submitted_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let participants: Vec<String> = serde_json::from_str(&participants_raw)
        .map_err(|error| RepositoryError::Decode(format!("bad participants list: {error}")))?;

    let status = OrderStatus::parse_code(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown order status `{status_raw}`")))?;

    let rejection = match (rejected_by, rejected_at, rejection_comment) {
        (Some(by), Some(at), Some(comment)) => {
            Some(Rejection { by: ActorId(by), at: decode_datetime(&at)?, comment })
        }
        _ => None,
    };

    Ok(TravelOrder {
        id: OrderId(id),
        requester: Requester {
            actor: ActorId(requester_id),
            unit: UnitCode(requester_unit),
            is_unit_head: requester_is_head,
            is_top_authority: requester_is_top_authority,
        },
        prepared_by: ActorId(prepared_by),
        participants: participants.into_iter().map(ActorId).collect(),
        destination,
        purpose,
        depart_on: decode_date(&depart_on)?,
        return_on: decode_date(&return_on)?,
        evidence: evidence_handle.map(DocumentHandle),
        status,
        chain_position: chain_position as usize,
        current_approver: current_approver.map(ActorId),
        order_number,
        rejection,
        is_resubmitted,
        submitted_at: decode_datetime(&submitted_at)?,
        updated_at: decode_datetime(&updated_at)?,
    })
}

fn participants_json(order: &TravelOrder) -> Result<String, RepositoryError> {
    let ids: Vec<&str> = order.participants.iter().map(|actor| actor.0.as_str()).collect();
    serde_json::to_string(&ids)
        .map_err(|error| RepositoryError::Decode(format!("bad participants list: {error}")))
}

pub async fn fetch<'e, E>(executor: E, id: &OrderId) -> Result<Option<TravelOrder>, RepositoryError>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM travel_order WHERE id = ?"))
        .bind(&id.0)
        .fetch_optional(executor)
        .await?;

    match row {
        Some(ref row) => Ok(Some(row_to_order(row)?)),
        None => Ok(None),
    }
}

pub async fn insert<'e, E>(executor: E, order: &TravelOrder) -> Result<(), RepositoryError>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO travel_order
             (id, requester_id, requester_unit, requester_is_head, requester_is_top_authority,
              prepared_by, participants, destination, purpose, depart_on, return_on,
              evidence_handle, status, chain_position, current_approver, order_number,
              rejected_by, rejected_at, rejection_comment, is_resubmitted,
              submitted_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&order.id.0)
    .bind(&order.requester.actor.0)
    .bind(&order.requester.unit.0)
    .bind(order.requester.is_unit_head)
    .bind(order.requester.is_top_authority)
    .bind(&order.prepared_by.0)
    .bind(participants_json(order)?)
    .bind(&order.destination)
    .bind(&order.purpose)
    .bind(encode_date(order.depart_on))
    .bind(encode_date(order.return_on))
    .bind(order.evidence.as_ref().map(|handle| handle.0.clone()))
    .bind(order.status.as_code())
    .bind(order.chain_position as i64)
    .bind(order.current_approver.as_ref().map(|actor| actor.0.clone()))
    .bind(&order.order_number)
    .bind(order.rejection.as_ref().map(|rejection| rejection.by.0.clone()))
    .bind(order.rejection.as_ref().map(|rejection| rejection.at.to_rfc3339()))
    .bind(order.rejection.as_ref().map(|rejection| rejection.comment.clone()))
    .bind(order.is_resubmitted)
    .bind(order.submitted_at.to_rfc3339())
    .bind(order.updated_at.to_rfc3339())
    .execute(executor)
    .await?;

    Ok(())
}

/// Optimistic write: the row must still carry the status and approver the
/// transition read. With every transition inside a `BEGIN IMMEDIATE`
/// transaction the guard cannot fire; it backstops the lock discipline.
pub async fn update_guarded<'e, E>(
    executor: E,
    order: &TravelOrder,
    expected_status: &str,
    expected_approver: Option<&str>,
) -> Result<(), RepositoryError>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE travel_order SET
             status = ?, chain_position = ?, current_approver = ?, order_number = ?,
             rejected_by = ?, rejected_at = ?, rejection_comment = ?, is_resubmitted = ?,
             updated_at = ?
         WHERE id = ? AND status = ? AND current_approver IS ?",
    )
    .bind(order.status.as_code())
    .bind(order.chain_position as i64)
    .bind(order.current_approver.as_ref().map(|actor| actor.0.clone()))
    .bind(&order.order_number)
    .bind(order.rejection.as_ref().map(|rejection| rejection.by.0.clone()))
    .bind(order.rejection.as_ref().map(|rejection| rejection.at.to_rfc3339()))
    .bind(order.rejection.as_ref().map(|rejection| rejection.comment.clone()))
    .bind(order.is_resubmitted)
    .bind(order.updated_at.to_rfc3339())
    .bind(&order.id.0)
    .bind(expected_status)
    .bind(expected_approver)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::Conflict(order.id.0.clone()));
    }
    Ok(())
}

pub struct SqlTravelOrderStore {
    pool: DbPool,
}

impl SqlTravelOrderStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: &OrderId) -> Result<Option<TravelOrder>, RepositoryError> {
        fetch(&self.pool, id).await
    }

    pub async fn list_prepared_by(
        &self,
        actor: &ActorId,
    ) -> Result<Vec<TravelOrder>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM travel_order
             WHERE prepared_by = ? ORDER BY submitted_at DESC",
        ))
        .bind(&actor.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_order).collect()
    }

    /// Orders currently waiting on the given approver's decision.
    pub async fn list_pending_for_approver(
        &self,
        actor: &ActorId,
    ) -> Result<Vec<TravelOrder>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM travel_order
             WHERE current_approver = ? ORDER BY submitted_at DESC",
        ))
        .bind(&actor.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_order).collect()
    }

    /// Finally-approved orders of this requester that have no liquidation
    /// filed yet.
    pub async fn list_awaiting_liquidation(
        &self,
        actor: &ActorId,
    ) -> Result<Vec<TravelOrder>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM travel_order
             WHERE requester_id = ?
               AND order_number IS NOT NULL
               AND id NOT IN (SELECT order_id FROM liquidation)
             ORDER BY return_on DESC",
        ))
        .bind(&actor.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_order).collect()
    }
}

/// Shared fixture for repository tests that need a parent order row.
#[cfg(test)]
pub(crate) fn sample_order(id: &str) -> TravelOrder {
    use chrono::{NaiveDate, Utc};

    let now = Utc::now();
    TravelOrder {
        id: OrderId::new(id),
        requester: Requester {
            actor: ActorId::new("u-clerk"),
            unit: UnitCode::new("bayfield_center"),
            is_unit_head: false,
            is_top_authority: false,
        },
        prepared_by: ActorId::new("u-clerk"),
        participants: vec![ActorId::new("u-clerk"), ActorId::new("u-colleague")],
        destination: "Capital City".to_string(),
        purpose: "Coordination meeting".to_string(),
        depart_on: NaiveDate::from_ymd_opt(2026, 8, 10).expect("valid date"),
        return_on: NaiveDate::from_ymd_opt(2026, 8, 12).expect("valid date"),
        evidence: None,
        status: OrderStatus::Placed,
        chain_position: 0,
        current_approver: Some(ActorId::new("u-bayfield")),
        order_number: None,
        rejection: None,
        is_resubmitted: false,
        submitted_at: now,
        updated_at: now,
    }
}
