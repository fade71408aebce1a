use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use travo_core::{
    ActorId, DirectoryIndex, DocumentHandle, NewTravelOrder, Notification, NotificationKind,
    NotificationSink, OrderId, OrderNumberFormat, OrgTaxonomy, Requester, SignatureId,
    SignatureRecord, TravelOrder, WorkflowAction, WorkflowEngine,
};
use travo_db::repositories::{directory, sequence, signature, travel_order, SqlTravelOrderStore};
use travo_db::{begin_immediate, DbPool};

use crate::ServiceError;

#[derive(Clone, Debug)]
pub struct SubmitTravelOrder {
    pub requester: Requester,
    pub prepared_by: ActorId,
    pub participants: Vec<ActorId>,
    pub destination: String,
    pub purpose: String,
    pub depart_on: NaiveDate,
    pub return_on: NaiveDate,
    pub evidence: Option<DocumentHandle>,
}

/// The exposed travel-order operations. Every mutation runs inside a single
/// `BEGIN IMMEDIATE` transaction: read the aggregate, snapshot the directory,
/// run the pure workflow engine, reserve a number if the outcome demands it,
/// write guarded, commit. Notifications go out after commit, best-effort.
#[derive(Clone)]
pub struct TravelOrderService {
    pool: DbPool,
    taxonomy: Arc<OrgTaxonomy>,
    number_format: OrderNumberFormat,
    sink: Arc<dyn NotificationSink>,
}

impl TravelOrderService {
    pub fn new(
        pool: DbPool,
        taxonomy: Arc<OrgTaxonomy>,
        number_format: OrderNumberFormat,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self { pool, taxonomy, number_format, sink }
    }

    pub fn taxonomy(&self) -> &OrgTaxonomy {
        &self.taxonomy
    }

    /// Human rendering of an order's status against this deployment's
    /// taxonomy titles.
    pub fn render_status(&self, order: &TravelOrder) -> String {
        order.display_status(&self.taxonomy)
    }

    pub async fn submit(&self, command: SubmitTravelOrder) -> Result<TravelOrder, ServiceError> {
        let now = Utc::now();
        let mut tx = begin_immediate(&self.pool).await?;

        let candidates = directory::list_active(&mut *tx).await?;
        let index = DirectoryIndex::new(candidates);
        let engine = WorkflowEngine::new(&self.taxonomy, &index);

        let (mut order, outcome) = engine.submit(
            NewTravelOrder {
                id: OrderId::new(Uuid::new_v4().to_string()),
                requester: command.requester,
                prepared_by: command.prepared_by,
                participants: command.participants,
                destination: command.destination,
                purpose: command.purpose,
                depart_on: command.depart_on,
                return_on: command.return_on,
                evidence: command.evidence,
            },
            now,
        )?;

        if outcome.actions.contains(&WorkflowAction::AssignOrderNumber) {
            let number =
                sequence::next_order_number(&mut *tx, &self.number_format, now.date_naive())
                    .await?;
            order.order_number = Some(number);
        }

        travel_order::insert(&mut *tx, &order).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            status = %order.status.as_code(),
            "travel order submitted",
        );
        self.dispatch(&order, &outcome.actions, None, &[]).await;
        Ok(order)
    }

    pub async fn approve(
        &self,
        id: &OrderId,
        actor: &ActorId,
        comment: Option<String>,
        signature_payload: Option<String>,
    ) -> Result<TravelOrder, ServiceError> {
        let now = Utc::now();
        let mut tx = begin_immediate(&self.pool).await?;

        let mut order = travel_order::fetch(&mut *tx, id)
            .await?
            .ok_or_else(|| ServiceError::OrderNotFound(id.clone()))?;
        let prev_status = order.status.as_code();
        let prev_approver = order.current_approver.clone();

        let candidates = directory::list_active(&mut *tx).await?;
        let index = DirectoryIndex::new(candidates);
        let engine = WorkflowEngine::new(&self.taxonomy, &index);
        let outcome = engine.approve(&mut order, actor, now)?;

        if outcome.actions.contains(&WorkflowAction::AssignOrderNumber) {
            let number =
                sequence::next_order_number(&mut *tx, &self.number_format, now.date_naive())
                    .await?;
            order.order_number = Some(number);
        }

        signature::append(
            &mut *tx,
            &SignatureRecord {
                id: SignatureId::new(Uuid::new_v4().to_string()),
                order_id: order.id.clone(),
                signed_by: actor.clone(),
                comment,
                payload: signature_payload.unwrap_or_default(),
                signed_at: now,
            },
        )
        .await?;

        travel_order::update_guarded(
            &mut *tx,
            &order,
            &prev_status,
            prev_approver.as_ref().map(|approver| approver.0.as_str()),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            approved_by = %actor,
            status = %order.status.as_code(),
            "travel order approved",
        );
        self.dispatch(&order, &outcome.actions, None, &[]).await;
        Ok(order)
    }

    pub async fn reject(
        &self,
        id: &OrderId,
        actor: &ActorId,
        comment: &str,
    ) -> Result<TravelOrder, ServiceError> {
        let now = Utc::now();
        let mut tx = begin_immediate(&self.pool).await?;

        let mut order = travel_order::fetch(&mut *tx, id)
            .await?
            .ok_or_else(|| ServiceError::OrderNotFound(id.clone()))?;
        let prev_status = order.status.as_code();
        let prev_approver = order.current_approver.clone();

        let candidates = directory::list_active(&mut *tx).await?;
        let index = DirectoryIndex::new(candidates);
        let engine = WorkflowEngine::new(&self.taxonomy, &index);
        let outcome = engine.reject(&mut order, actor, comment, now)?;

        // Needed after commit to tell earlier signers their approvals no
        // longer stand; read inside the transaction for a consistent view.
        let prior_signatures = signature::list_for_order(&mut *tx, &order.id).await?;

        travel_order::update_guarded(
            &mut *tx,
            &order,
            &prev_status,
            prev_approver.as_ref().map(|approver| approver.0.as_str()),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            rejected_by = %actor,
            status = %order.status.as_code(),
            "travel order rejected",
        );
        self.dispatch(&order, &outcome.actions, Some(actor), &prior_signatures).await;
        Ok(order)
    }

    pub async fn resubmit(
        &self,
        id: &OrderId,
        actor: &ActorId,
    ) -> Result<TravelOrder, ServiceError> {
        let now = Utc::now();
        let mut tx = begin_immediate(&self.pool).await?;

        let mut order = travel_order::fetch(&mut *tx, id)
            .await?
            .ok_or_else(|| ServiceError::OrderNotFound(id.clone()))?;
        let prev_status = order.status.as_code();
        let prev_approver = order.current_approver.clone();

        let candidates = directory::list_active(&mut *tx).await?;
        let index = DirectoryIndex::new(candidates);
        let engine = WorkflowEngine::new(&self.taxonomy, &index);
        let outcome = engine.resubmit(&mut order, actor, now)?;

        travel_order::update_guarded(
            &mut *tx,
            &order,
            &prev_status,
            prev_approver.as_ref().map(|approver| approver.0.as_str()),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(order_id = %order.id, resubmitted_by = %actor, "travel order resubmitted");
        self.dispatch(&order, &outcome.actions, None, &[]).await;
        Ok(order)
    }

    pub async fn get(&self, id: &OrderId) -> Result<TravelOrder, ServiceError> {
        self.store()
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::OrderNotFound(id.clone()))
    }

    pub async fn list_prepared_by(
        &self,
        actor: &ActorId,
    ) -> Result<Vec<TravelOrder>, ServiceError> {
        Ok(self.store().list_prepared_by(actor).await?)
    }

    pub async fn list_pending_for_approver(
        &self,
        actor: &ActorId,
    ) -> Result<Vec<TravelOrder>, ServiceError> {
        Ok(self.store().list_pending_for_approver(actor).await?)
    }

    pub async fn list_awaiting_liquidation(
        &self,
        actor: &ActorId,
    ) -> Result<Vec<TravelOrder>, ServiceError> {
        Ok(self.store().list_awaiting_liquidation(actor).await?)
    }

    pub async fn signatures(&self, id: &OrderId) -> Result<Vec<SignatureRecord>, ServiceError> {
        Ok(signature::list_for_order(&self.pool, id).await?)
    }

    fn store(&self) -> SqlTravelOrderStore {
        SqlTravelOrderStore::new(self.pool.clone())
    }

    /// Best-effort fan-out. A sink failure is logged and dropped; it never
    /// fails the already-committed transition.
    async fn dispatch(
        &self,
        order: &TravelOrder,
        actions: &[WorkflowAction],
        rejector: Option<&ActorId>,
        prior_signatures: &[SignatureRecord],
    ) {
        let now = Utc::now();
        let mut notifications = Vec::new();

        for action in actions {
            match action {
                WorkflowAction::AssignOrderNumber => {}
                WorkflowAction::NotifyNextApprover(approver) => {
                    let (kind, title) = if order.is_resubmitted {
                        (
                            NotificationKind::Resubmitted,
                            "Resubmitted travel order awaiting your approval",
                        )
                    } else {
                        (NotificationKind::ApprovalRequested, "Travel order awaiting your approval")
                    };
                    notifications.push(Notification::new(
                        approver.id.clone(),
                        Some(order.id.clone()),
                        kind,
                        title,
                        format!(
                            "A travel order to {} filed by {} is ready for your review.",
                            order.destination, order.prepared_by,
                        ),
                        now,
                    ));
                }
                WorkflowAction::NotifyRequesterApproved => {
                    notifications.push(Notification::new(
                        order.prepared_by.clone(),
                        Some(order.id.clone()),
                        NotificationKind::Approved,
                        "Travel order approved",
                        format!(
                            "Your travel order to {} has moved to the next approver.",
                            order.destination,
                        ),
                        now,
                    ));
                }
                WorkflowAction::NotifyRequesterFinallyApproved => {
                    let number = order.order_number.as_deref().unwrap_or("(unassigned)");
                    notifications.push(Notification::new(
                        order.prepared_by.clone(),
                        Some(order.id.clone()),
                        NotificationKind::FinallyApproved,
                        "Travel order finally approved",
                        format!(
                            "Your travel order to {} has been finally approved; travel order number {number} has been issued.",
                            order.destination,
                        ),
                        now,
                    ));
                }
                WorkflowAction::NotifyRequesterRejected => {
                    let comment = order
                        .rejection
                        .as_ref()
                        .map(|rejection| rejection.comment.as_str())
                        .unwrap_or_default();
                    notifications.push(Notification::new(
                        order.prepared_by.clone(),
                        Some(order.id.clone()),
                        NotificationKind::Rejected,
                        "Travel order rejected",
                        format!(
                            "Your travel order to {} has been rejected. Reason: {comment}",
                            order.destination,
                        ),
                        now,
                    ));
                }
                WorkflowAction::NotifyPriorSigners => {
                    let mut notified = Vec::new();
                    for record in prior_signatures {
                        if Some(&record.signed_by) == rejector
                            || notified.contains(&record.signed_by)
                        {
                            continue;
                        }
                        notified.push(record.signed_by.clone());
                        notifications.push(Notification::new(
                            record.signed_by.clone(),
                            Some(order.id.clone()),
                            NotificationKind::PriorApprovalInvalidated,
                            "An approved travel order was rejected",
                            format!(
                                "The travel order to {} that you approved has since been rejected.",
                                order.destination,
                            ),
                            now,
                        ));
                    }
                }
            }
        }

        for notification in notifications {
            if let Err(error) = self.sink.deliver(notification).await {
                tracing::warn!(order_id = %order.id, %error, "notification delivery failed");
            }
        }
    }
}
