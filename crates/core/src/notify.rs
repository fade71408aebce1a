use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::directory::ActorId;
use crate::domain::order::OrderId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    ApprovalRequested,
    Approved,
    FinallyApproved,
    Rejected,
    PriorApprovalInvalidated,
    Resubmitted,
}

impl NotificationKind {
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::ApprovalRequested => "approval_requested",
            Self::Approved => "approved",
            Self::FinallyApproved => "finally_approved",
            Self::Rejected => "rejected",
            Self::PriorApprovalInvalidated => "prior_approval_invalidated",
            Self::Resubmitted => "resubmitted",
        }
    }

    pub fn parse_code(raw: &str) -> Option<Self> {
        match raw {
            "approval_requested" => Some(Self::ApprovalRequested),
            "approved" => Some(Self::Approved),
            "finally_approved" => Some(Self::FinallyApproved),
            "rejected" => Some(Self::Rejected),
            "prior_approval_invalidated" => Some(Self::PriorApprovalInvalidated),
            "resubmitted" => Some(Self::Resubmitted),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: ActorId,
    pub order_id: Option<OrderId>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        recipient: ActorId,
        order_id: Option<OrderId>,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId(Uuid::new_v4().to_string()),
            recipient,
            order_id,
            kind,
            title: title.into(),
            message: message.into(),
            is_read: false,
            created_at: now,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("notification delivery failed: {0}")]
pub struct SinkError(pub String);

/// Fire-and-forget delivery target for workflow events. Callers never block a
/// transition on the sink: failures are logged and dropped.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: Notification) -> Result<(), SinkError>;
}

/// Test double capturing everything it is handed.
#[derive(Clone, Default)]
pub struct InMemoryNotificationSink {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl InMemoryNotificationSink {
    pub fn sent(&self) -> Vec<Notification> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl NotificationSink for InMemoryNotificationSink {
    async fn deliver(&self, notification: Notification) -> Result<(), SinkError> {
        match self.sent.lock() {
            Ok(mut sent) => sent.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
        Ok(())
    }
}
