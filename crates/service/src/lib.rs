pub mod liquidation;
pub mod travel;

use thiserror::Error;

use travo_core::{LiquidationId, OrderId, WorkflowError};
use travo_db::repositories::RepositoryError;

pub use liquidation::{FileLiquidation, LiquidationService};
pub use travel::{SubmitTravelOrder, TravelOrderService};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("travel order `{0}` was not found")]
    OrderNotFound(OrderId),
    #[error("liquidation `{0}` was not found")]
    LiquidationNotFound(LiquidationId),
    #[error("persistence failure: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(error: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(error))
    }
}
