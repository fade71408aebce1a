use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::directory::ActorId;
use crate::domain::order::{DocumentHandle, OrderId};
use crate::errors::WorkflowError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LiquidationId(pub String);

impl LiquidationId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

impl std::fmt::Display for LiquidationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tri-state outcome of one reviewer's pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewOutcome {
    #[default]
    Unset,
    Approved,
    Rejected,
}

impl ReviewOutcome {
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse_code(raw: &str) -> Option<Self> {
        match raw {
            "unset" => Some(Self::Unset),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidationStatus {
    Pending,
    UnderFinalAudit,
    ReadyForClaim,
    Rejected,
}

impl LiquidationStatus {
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::UnderFinalAudit => "under_final_audit",
            Self::ReadyForClaim => "ready_for_claim",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse_code(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "under_final_audit" => Some(Self::UnderFinalAudit),
            "ready_for_claim" => Some(Self::ReadyForClaim),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::UnderFinalAudit => "Under Final Audit",
            Self::ReadyForClaim => "Ready for Claim",
            Self::Rejected => "Rejected",
        }
    }
}

/// Derived status as a total function of the two tri-states. The stored
/// status must always equal this; it is recomputed after every review write
/// and never set independently.
pub fn derive_status(bookkeeper: ReviewOutcome, accountant: ReviewOutcome) -> LiquidationStatus {
    use ReviewOutcome::{Approved, Rejected};

    match (bookkeeper, accountant) {
        (Rejected, _) | (_, Rejected) => LiquidationStatus::Rejected,
        (Approved, Approved) => LiquidationStatus::ReadyForClaim,
        (Approved, _) => LiquidationStatus::UnderFinalAudit,
        _ => LiquidationStatus::Pending,
    }
}

/// One reviewer's slot: outcome plus who reviewed, when, and any comment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewField {
    pub outcome: ReviewOutcome,
    pub reviewer: Option<ActorId>,
    pub comment: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Post-travel financial reconciliation, one-to-one with a finally-approved
/// travel order. Created only by the requester once an order number exists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Liquidation {
    pub id: LiquidationId,
    pub order_id: OrderId,
    pub owner: ActorId,
    pub amount_claimed: Decimal,
    pub receipts: Option<DocumentHandle>,
    pub bookkeeper: ReviewField,
    pub accountant: ReviewField,
    pub status: LiquidationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Liquidation {
    pub fn new(
        id: LiquidationId,
        order_id: OrderId,
        owner: ActorId,
        amount_claimed: Decimal,
        receipts: Option<DocumentHandle>,
        now: DateTime<Utc>,
    ) -> Result<Self, WorkflowError> {
        if amount_claimed < Decimal::ZERO {
            return Err(WorkflowError::Validation(
                "claimed amount must not be negative".to_string(),
            ));
        }

        Ok(Self {
            id,
            order_id,
            owner,
            amount_claimed,
            receipts,
            bookkeeper: ReviewField::default(),
            accountant: ReviewField::default(),
            status: LiquidationStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// First-stage review. Allowed only while nothing has been decided yet.
    pub fn review_bookkeeper(
        &mut self,
        reviewer: &ActorId,
        approve: bool,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        if self.status != LiquidationStatus::Pending {
            return Err(WorkflowError::invalid_state(self.status.as_code()));
        }

        self.bookkeeper = ReviewField {
            outcome: if approve { ReviewOutcome::Approved } else { ReviewOutcome::Rejected },
            reviewer: Some(reviewer.clone()),
            comment,
            reviewed_at: Some(now),
        };
        self.recompute_status(now);
        Ok(())
    }

    /// Second-stage review, gated on the bookkeeper having approved.
    pub fn review_accountant(
        &mut self,
        reviewer: &ActorId,
        approve: bool,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        if self.status != LiquidationStatus::UnderFinalAudit {
            return Err(WorkflowError::invalid_state(self.status.as_code()));
        }

        self.accountant = ReviewField {
            outcome: if approve { ReviewOutcome::Approved } else { ReviewOutcome::Rejected },
            reviewer: Some(reviewer.clone()),
            comment,
            reviewed_at: Some(now),
        };
        self.recompute_status(now);
        Ok(())
    }

    /// Owner-only restart after a rejection: both tri-states return to unset
    /// and the review begins again from `Pending`.
    pub fn resubmit(&mut self, actor: &ActorId, now: DateTime<Utc>) -> Result<(), WorkflowError> {
        if self.status != LiquidationStatus::Rejected {
            return Err(WorkflowError::invalid_state(self.status.as_code()));
        }
        if *actor != self.owner {
            return Err(WorkflowError::unauthorized(actor.0.clone()));
        }

        self.bookkeeper = ReviewField::default();
        self.accountant = ReviewField::default();
        self.recompute_status(now);
        Ok(())
    }

    fn recompute_status(&mut self, now: DateTime<Utc>) {
        self.status = derive_status(self.bookkeeper.outcome, self.accountant.outcome);
        self.updated_at = now;
    }
}
