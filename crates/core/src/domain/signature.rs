use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::directory::ActorId;
use crate::domain::order::OrderId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatureId(pub String);

impl SignatureId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

/// Append-only record of one approval decision. Never mutated or deleted; a
/// later rejection invalidates the approvals it follows but the records stay,
/// and they keep accumulating across resubmissions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub id: SignatureId,
    pub order_id: OrderId,
    pub signed_by: ActorId,
    pub comment: Option<String>,
    /// Opaque signature payload (typically base64 image data), carried
    /// through untouched.
    pub payload: String,
    pub signed_at: DateTime<Utc>,
}
