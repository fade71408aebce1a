use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::directory::ActorId;
use crate::taxonomy::{OrgTaxonomy, UnitCode};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference into the document store. The workflow never inspects the
/// underlying file; it only carries the handle around.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHandle(pub String);

/// The requester's organizational attributes, snapshotted at submission time.
/// A later change to the requester's own directory row does not retroactively
/// affect an in-flight chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub actor: ActorId,
    pub unit: UnitCode,
    pub is_unit_head: bool,
    pub is_top_authority: bool,
}

/// A chain role: either the active head of a unit, or the top-level
/// authority, which sits above every chain and never appears inside one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalRole {
    Unit(UnitCode),
    TopAuthority,
}

/// Machine status of a travel order. Persisted as a compact code
/// (`as_code`/`parse_code`); rendered for humans separately so display
/// strings never drive control flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Filed (or resubmitted, see `TravelOrder::is_resubmitted`) and waiting
    /// on the current approver.
    Placed,
    /// Approved by the given role. `Approved(TopAuthority)` is terminal.
    Approved(ApprovalRole),
    /// Rejected by the given role; `None` is the generic fallback for a
    /// stored chain position that no longer maps to any role.
    Rejected(Option<ApprovalRole>),
}

const TOP_AUTHORITY_CODE: &str = "top_authority";

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        self.is_finally_approved() || self.is_rejected()
    }

    pub fn is_finally_approved(&self) -> bool {
        matches!(self, Self::Approved(ApprovalRole::TopAuthority))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    pub fn as_code(&self) -> String {
        match self {
            Self::Placed => "placed".to_string(),
            Self::Approved(ApprovalRole::TopAuthority) => {
                format!("approved:{TOP_AUTHORITY_CODE}")
            }
            Self::Approved(ApprovalRole::Unit(unit)) => format!("approved:{unit}"),
            Self::Rejected(Some(ApprovalRole::TopAuthority)) => {
                format!("rejected:{TOP_AUTHORITY_CODE}")
            }
            Self::Rejected(Some(ApprovalRole::Unit(unit))) => format!("rejected:{unit}"),
            Self::Rejected(None) => "rejected".to_string(),
        }
    }

    pub fn parse_code(raw: &str) -> Option<Self> {
        match raw {
            "placed" => Some(Self::Placed),
            "rejected" => Some(Self::Rejected(None)),
            _ => {
                let (verb, role) = raw.split_once(':')?;
                let role = if role == TOP_AUTHORITY_CODE {
                    ApprovalRole::TopAuthority
                } else {
                    ApprovalRole::Unit(UnitCode::new(role))
                };
                match verb {
                    "approved" => Some(Self::Approved(role)),
                    "rejected" => Some(Self::Rejected(Some(role))),
                    _ => None,
                }
            }
        }
    }
}

/// Metadata recorded when the current approver rejects an order. Cleared on
/// resubmission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub by: ActorId,
    pub at: DateTime<Utc>,
    pub comment: String,
}

/// The aggregate under control. Mutated only through the workflow engine's
/// submit/approve/reject/resubmit transitions; never deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelOrder {
    pub id: OrderId,
    pub requester: Requester,
    pub prepared_by: ActorId,
    pub participants: Vec<ActorId>,
    pub destination: String,
    pub purpose: String,
    pub depart_on: NaiveDate,
    pub return_on: NaiveDate,
    pub evidence: Option<DocumentHandle>,
    pub status: OrderStatus,
    /// Index into the chain recomputed from the requester on every
    /// transition; the chain itself is never persisted.
    pub chain_position: usize,
    pub current_approver: Option<ActorId>,
    pub order_number: Option<String>,
    pub rejection: Option<Rejection>,
    pub is_resubmitted: bool,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TravelOrder {
    pub fn is_participant(&self, actor: &ActorId) -> bool {
        self.participants.contains(actor)
            || self.prepared_by == *actor
            || self.requester.actor == *actor
    }

    /// Human rendering of the current status, keyed off taxonomy titles.
    pub fn display_status(&self, taxonomy: &OrgTaxonomy) -> String {
        match &self.status {
            OrderStatus::Placed if self.is_resubmitted => {
                "Travel order resubmitted and awaiting review".to_string()
            }
            OrderStatus::Placed => "Travel order is placed".to_string(),
            OrderStatus::Approved(role) => {
                format!("The travel order has been approved by {}", role_title(role, taxonomy))
            }
            OrderStatus::Rejected(Some(role)) => {
                format!("The travel order has been rejected by {}", role_title(role, taxonomy))
            }
            OrderStatus::Rejected(None) => "Rejected".to_string(),
        }
    }
}

fn role_title(role: &ApprovalRole, taxonomy: &OrgTaxonomy) -> String {
    match role {
        ApprovalRole::TopAuthority => taxonomy.top_authority_title().to_string(),
        ApprovalRole::Unit(unit) => taxonomy
            .title_for(unit)
            .map(str::to_string)
            .unwrap_or_else(|| format!("the head of {unit}")),
    }
}

#[cfg(test)]
mod tests {
    use crate::taxonomy::{OrgTaxonomy, UnitCode};

    use super::{ApprovalRole, OrderStatus};

    #[test]
    fn status_codes_round_trip() {
        let statuses = [
            OrderStatus::Placed,
            OrderStatus::Approved(ApprovalRole::Unit(UnitCode::new("harbor_po"))),
            OrderStatus::Approved(ApprovalRole::TopAuthority),
            OrderStatus::Rejected(Some(ApprovalRole::Unit(UnitCode::new("summit_po")))),
            OrderStatus::Rejected(Some(ApprovalRole::TopAuthority)),
            OrderStatus::Rejected(None),
        ];

        for status in statuses {
            let parsed = OrderStatus::parse_code(&status.as_code()).expect("codes round trip");
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn malformed_codes_do_not_parse() {
        assert!(OrderStatus::parse_code("pending").is_none());
        assert!(OrderStatus::parse_code("escalated:harbor_po").is_none());
    }

    #[test]
    fn terminal_states_are_final_approval_and_all_rejections() {
        assert!(OrderStatus::Approved(ApprovalRole::TopAuthority).is_terminal());
        assert!(OrderStatus::Rejected(None).is_terminal());
        assert!(
            OrderStatus::Rejected(Some(ApprovalRole::Unit(UnitCode::new("harbor_po"))))
                .is_terminal()
        );
        assert!(!OrderStatus::Placed.is_terminal());
        assert!(!OrderStatus::Approved(ApprovalRole::Unit(UnitCode::new("harbor_po")))
            .is_terminal());
    }

    #[test]
    fn display_uses_taxonomy_titles() {
        let taxonomy = OrgTaxonomy::default_region();
        let status = OrderStatus::Approved(ApprovalRole::Unit(UnitCode::new("harbor_po")));
        let order = super::TravelOrder {
            id: super::OrderId::new("TO-1"),
            requester: super::Requester {
                actor: crate::domain::directory::ActorId::new("u-clerk"),
                unit: UnitCode::new("bayfield_center"),
                is_unit_head: false,
                is_top_authority: false,
            },
            prepared_by: crate::domain::directory::ActorId::new("u-clerk"),
            participants: vec![crate::domain::directory::ActorId::new("u-clerk")],
            destination: "Capital City".to_string(),
            purpose: "Coordination meeting".to_string(),
            depart_on: chrono::NaiveDate::from_ymd_opt(2026, 8, 10).expect("valid date"),
            return_on: chrono::NaiveDate::from_ymd_opt(2026, 8, 12).expect("valid date"),
            evidence: None,
            status,
            chain_position: 1,
            current_approver: Some(crate::domain::directory::ActorId::new("u-ops")),
            order_number: None,
            rejection: None,
            is_resubmitted: false,
            submitted_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        assert_eq!(
            order.display_status(&taxonomy),
            "The travel order has been approved by the Harborside Provincial Office head",
        );
    }
}
