use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use travo_core::{
    ActorId, DocumentHandle, Liquidation, LiquidationId, OrderId, WorkflowError,
};
use travo_db::repositories::{liquidation, travel_order, SqlLiquidationStore};
use travo_db::{begin_immediate, DbPool};

use crate::ServiceError;

#[derive(Clone, Debug)]
pub struct FileLiquidation {
    pub order_id: OrderId,
    pub owner: ActorId,
    pub amount_claimed: Decimal,
    pub receipts: Option<DocumentHandle>,
}

/// The two-stage liquidation review operations, with the same transaction
/// discipline as the travel-order service.
#[derive(Clone)]
pub struct LiquidationService {
    pool: DbPool,
}

impl LiquidationService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// File the liquidation for a finally-approved order. Only the requester
    /// may file, only once, and only after an order number exists.
    pub async fn file(&self, command: FileLiquidation) -> Result<Liquidation, ServiceError> {
        let now = Utc::now();
        let mut tx = begin_immediate(&self.pool).await?;

        let order = travel_order::fetch(&mut *tx, &command.order_id)
            .await?
            .ok_or_else(|| ServiceError::OrderNotFound(command.order_id.clone()))?;

        if order.order_number.is_none() {
            return Err(WorkflowError::invalid_state(order.status.as_code()).into());
        }
        if command.owner != order.requester.actor {
            return Err(WorkflowError::unauthorized(command.owner.0.clone()).into());
        }
        if liquidation::fetch_by_order(&mut *tx, &order.id).await?.is_some() {
            return Err(WorkflowError::Validation(
                "a liquidation has already been filed for this travel order".to_string(),
            )
            .into());
        }

        let filed = Liquidation::new(
            LiquidationId::new(Uuid::new_v4().to_string()),
            order.id.clone(),
            command.owner,
            command.amount_claimed,
            command.receipts,
            now,
        )?;

        liquidation::insert(&mut *tx, &filed).await?;
        tx.commit().await?;

        tracing::info!(liquidation_id = %filed.id, order_id = %filed.order_id, "liquidation filed");
        Ok(filed)
    }

    pub async fn review_bookkeeper(
        &self,
        id: &LiquidationId,
        reviewer: &ActorId,
        approve: bool,
        comment: Option<String>,
    ) -> Result<Liquidation, ServiceError> {
        self.review(id, reviewer, approve, comment, ReviewStage::Bookkeeper).await
    }

    pub async fn review_accountant(
        &self,
        id: &LiquidationId,
        reviewer: &ActorId,
        approve: bool,
        comment: Option<String>,
    ) -> Result<Liquidation, ServiceError> {
        self.review(id, reviewer, approve, comment, ReviewStage::Accountant).await
    }

    pub async fn resubmit(
        &self,
        id: &LiquidationId,
        actor: &ActorId,
    ) -> Result<Liquidation, ServiceError> {
        let now = Utc::now();
        let mut tx = begin_immediate(&self.pool).await?;

        let mut filed = liquidation::fetch(&mut *tx, id)
            .await?
            .ok_or_else(|| ServiceError::LiquidationNotFound(id.clone()))?;
        let prev_status = filed.status.as_code();

        filed.resubmit(actor, now)?;
        liquidation::update_guarded(&mut *tx, &filed, prev_status).await?;
        tx.commit().await?;

        tracing::info!(liquidation_id = %filed.id, "liquidation resubmitted");
        Ok(filed)
    }

    pub async fn get(&self, id: &LiquidationId) -> Result<Liquidation, ServiceError> {
        self.store()
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::LiquidationNotFound(id.clone()))
    }

    pub async fn find_by_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<Liquidation>, ServiceError> {
        Ok(self.store().find_by_order(order_id).await?)
    }

    pub async fn list(&self) -> Result<Vec<Liquidation>, ServiceError> {
        Ok(self.store().list().await?)
    }

    async fn review(
        &self,
        id: &LiquidationId,
        reviewer: &ActorId,
        approve: bool,
        comment: Option<String>,
        stage: ReviewStage,
    ) -> Result<Liquidation, ServiceError> {
        let now = Utc::now();
        let mut tx = begin_immediate(&self.pool).await?;

        let mut filed = liquidation::fetch(&mut *tx, id)
            .await?
            .ok_or_else(|| ServiceError::LiquidationNotFound(id.clone()))?;
        let prev_status = filed.status.as_code();

        match stage {
            ReviewStage::Bookkeeper => filed.review_bookkeeper(reviewer, approve, comment, now)?,
            ReviewStage::Accountant => filed.review_accountant(reviewer, approve, comment, now)?,
        }

        liquidation::update_guarded(&mut *tx, &filed, prev_status).await?;
        tx.commit().await?;

        tracing::info!(
            liquidation_id = %filed.id,
            status = %filed.status.as_code(),
            "liquidation reviewed",
        );
        Ok(filed)
    }

    fn store(&self) -> SqlLiquidationStore {
        SqlLiquidationStore::new(self.pool.clone())
    }
}

#[derive(Clone, Copy, Debug)]
enum ReviewStage {
    Bookkeeper,
    Accountant,
}
