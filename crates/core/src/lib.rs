pub mod config;
pub mod domain;
pub mod errors;
pub mod notify;
pub mod ordernum;
pub mod routing;
pub mod taxonomy;
pub mod workflow;

pub use domain::directory::{ActorId, Approver, ApproverCandidate, DirectoryIndex};
pub use domain::liquidation::{
    derive_status, Liquidation, LiquidationId, LiquidationStatus, ReviewField, ReviewOutcome,
};
pub use domain::order::{
    ApprovalRole, DocumentHandle, OrderId, OrderStatus, Rejection, Requester, TravelOrder,
};
pub use domain::signature::{SignatureId, SignatureRecord};
pub use errors::WorkflowError;
pub use notify::{
    InMemoryNotificationSink, Notification, NotificationId, NotificationKind, NotificationSink,
    SinkError,
};
pub use ordernum::OrderNumberFormat;
pub use routing::{ChainRouter, ResolvedApprover};
pub use taxonomy::{OrgTaxonomy, OrgUnit, UnitCode};
pub use workflow::{NewTravelOrder, TransitionOutcome, WorkflowAction, WorkflowEngine};
