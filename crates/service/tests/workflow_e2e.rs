use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use travo_core::{
    ActorId, ApproverCandidate, InMemoryNotificationSink, LiquidationStatus, NotificationKind,
    OrderNumberFormat, OrderStatus, OrgTaxonomy, Requester, TravelOrder, UnitCode, WorkflowError,
};
use travo_db::repositories::SqlDirectoryStore;
use travo_db::{connect_with_settings, migrations, DbPool};
use travo_service::{
    FileLiquidation, LiquidationService, ServiceError, SubmitTravelOrder, TravelOrderService,
};

struct Harness {
    pool: DbPool,
    travel: TravelOrderService,
    liquidation: LiquidationService,
    sink: InMemoryNotificationSink,
}

async fn harness() -> Harness {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");

    let sink = InMemoryNotificationSink::default();
    let travel = TravelOrderService::new(
        pool.clone(),
        Arc::new(OrgTaxonomy::default_region()),
        OrderNumberFormat::regional_default(),
        Arc::new(sink.clone()),
    );
    let liquidation = LiquidationService::new(pool.clone());

    Harness { pool, travel, liquidation, sink }
}

fn candidate(id: &str, unit: Option<&str>, head: bool, top: bool) -> ApproverCandidate {
    let now = chrono::Utc::now();
    ApproverCandidate {
        id: ActorId::new(id),
        full_name: format!("Approver {id}"),
        unit: unit.map(UnitCode::new),
        is_unit_head: head,
        is_top_authority: top,
        active: true,
        created_at: now,
        updated_at: now,
    }
}

async fn seed_directory(pool: &DbPool, candidates: Vec<ApproverCandidate>) {
    let store = SqlDirectoryStore::new(pool.clone());
    for entry in candidates {
        store.save(entry).await.expect("seed candidate");
    }
}

async fn seed_full_region(pool: &DbPool) {
    seed_directory(
        pool,
        vec![
            candidate("u-bayfield", Some("bayfield_center"), true, false),
            candidate("u-harbor", Some("harbor_po"), true, false),
            candidate("u-ops", Some("operations_division"), true, false),
            candidate("u-finance", Some("finance_admin_division"), true, false),
            candidate("u-director", None, false, true),
        ],
    )
    .await;
}

fn member_submission() -> SubmitTravelOrder {
    SubmitTravelOrder {
        requester: Requester {
            actor: ActorId::new("u-clerk"),
            unit: UnitCode::new("bayfield_center"),
            is_unit_head: false,
            is_top_authority: false,
        },
        prepared_by: ActorId::new("u-clerk"),
        participants: vec![ActorId::new("u-clerk")],
        destination: "Capital City".to_string(),
        purpose: "Coordination meeting".to_string(),
        depart_on: NaiveDate::from_ymd_opt(2026, 8, 10).expect("valid date"),
        return_on: NaiveDate::from_ymd_opt(2026, 8, 12).expect("valid date"),
        evidence: None,
    }
}

fn assert_invariants(order: &TravelOrder) {
    assert_eq!(
        order.current_approver.is_none(),
        order.status.is_terminal(),
        "current_approver must be null exactly in terminal states",
    );
    assert_eq!(
        order.order_number.is_some(),
        order.status.is_finally_approved(),
        "order_number must exist exactly in the terminal approved state",
    );
}

#[tokio::test]
async fn fully_staffed_chain_runs_to_a_numbered_terminal_approval() {
    let harness = harness().await;
    seed_full_region(&harness.pool).await;

    let order = harness.travel.submit(member_submission()).await.expect("submit");
    assert_eq!(order.status, OrderStatus::Placed);
    assert_eq!(order.current_approver, Some(ActorId::new("u-bayfield")));
    assert_invariants(&order);

    let mut current = order;
    for approver in ["u-bayfield", "u-harbor", "u-ops", "u-finance"] {
        current = harness
            .travel
            .approve(&current.id, &ActorId::new(approver), None, None)
            .await
            .expect("chain advances");
        assert!(!current.status.is_terminal());
        assert_invariants(&current);
    }
    assert_eq!(current.current_approver, Some(ActorId::new("u-director")));

    let terminal = harness
        .travel
        .approve(&current.id, &ActorId::new("u-director"), Some("go ahead".to_string()), None)
        .await
        .expect("terminal approval");
    assert!(terminal.status.is_finally_approved());
    assert_invariants(&terminal);

    let number = terminal.order_number.as_deref().expect("number assigned");
    assert!(number.starts_with("R1-"), "unexpected number shape: {number}");
    assert!(number.ends_with("-0001"), "first number of the month: {number}");
    assert_eq!(
        harness.travel.render_status(&terminal),
        "The travel order has been approved by the Regional Director",
    );

    let signatures = harness.travel.signatures(&terminal.id).await.expect("signatures");
    assert_eq!(signatures.len(), 5, "one record per approval decision");

    let final_notices: Vec<_> = harness
        .sink
        .sent()
        .into_iter()
        .filter(|notification| notification.kind == NotificationKind::FinallyApproved)
        .collect();
    assert_eq!(final_notices.len(), 1);
    assert!(final_notices[0].message.contains(number));
}

#[tokio::test]
async fn vacant_middle_role_is_skipped_with_the_position_tracking_it() {
    let harness = harness().await;
    seed_directory(
        &harness.pool,
        vec![
            candidate("u-bayfield", Some("bayfield_center"), true, false),
            candidate("u-harbor", Some("harbor_po"), true, false),
            // operations_division left vacant on purpose.
            candidate("u-finance", Some("finance_admin_division"), true, false),
            candidate("u-director", None, false, true),
        ],
    )
    .await;

    let order = harness.travel.submit(member_submission()).await.expect("submit");
    let order = harness
        .travel
        .approve(&order.id, &ActorId::new("u-bayfield"), None, None)
        .await
        .expect("first approval");
    let order = harness
        .travel
        .approve(&order.id, &ActorId::new("u-harbor"), None, None)
        .await
        .expect("second approval skips the vacancy");

    assert_eq!(order.chain_position, 3);
    assert_eq!(order.current_approver, Some(ActorId::new("u-finance")));
    assert_invariants(&order);
}

#[tokio::test]
async fn second_approval_by_the_same_actor_fails_and_changes_nothing() {
    let harness = harness().await;
    seed_full_region(&harness.pool).await;

    let order = harness.travel.submit(member_submission()).await.expect("submit");
    let advanced = harness
        .travel
        .approve(&order.id, &ActorId::new("u-bayfield"), None, None)
        .await
        .expect("first approval");

    let error = harness
        .travel
        .approve(&order.id, &ActorId::new("u-bayfield"), None, None)
        .await
        .expect_err("the chain has moved on");
    assert!(matches!(error, ServiceError::Workflow(WorkflowError::Unauthorized { .. })));

    let reloaded = harness.travel.get(&order.id).await.expect("reload");
    assert_eq!(reloaded, advanced, "failed call must not mutate the aggregate");
}

#[tokio::test]
async fn reject_then_resubmit_restores_a_routable_order_and_keeps_signatures() {
    let harness = harness().await;
    seed_full_region(&harness.pool).await;

    let order = harness.travel.submit(member_submission()).await.expect("submit");
    harness
        .travel
        .approve(&order.id, &ActorId::new("u-bayfield"), None, None)
        .await
        .expect("first approval");

    let error = harness
        .travel
        .reject(&order.id, &ActorId::new("u-harbor"), "   ")
        .await
        .expect_err("blank comment is invalid");
    assert!(matches!(error, ServiceError::Workflow(WorkflowError::Validation(_))));

    let rejected = harness
        .travel
        .reject(&order.id, &ActorId::new("u-harbor"), "itinerary unclear")
        .await
        .expect("rejection");
    assert!(rejected.status.is_rejected());
    assert_invariants(&rejected);
    assert_eq!(
        harness.travel.render_status(&rejected),
        "The travel order has been rejected by the Harborside Provincial Office head",
    );

    let signatures = harness.travel.signatures(&order.id).await.expect("signatures");
    assert_eq!(signatures.len(), 1, "rejection keeps the invalidated approval history");

    let invalidated: Vec<_> = harness
        .sink
        .sent()
        .into_iter()
        .filter(|notification| notification.kind == NotificationKind::PriorApprovalInvalidated)
        .collect();
    assert_eq!(invalidated.len(), 1);
    assert_eq!(invalidated[0].recipient, ActorId::new("u-bayfield"));

    let resubmitted = harness
        .travel
        .resubmit(&order.id, &ActorId::new("u-clerk"))
        .await
        .expect("participant resubmits");
    assert_eq!(resubmitted.status, OrderStatus::Placed);
    assert_eq!(resubmitted.chain_position, 0);
    assert!(resubmitted.order_number.is_none());
    assert_eq!(resubmitted.current_approver, Some(ActorId::new("u-bayfield")));
    assert!(resubmitted.is_resubmitted);
    assert_invariants(&resubmitted);
}

#[tokio::test]
async fn top_authority_filing_is_numbered_immediately() {
    let harness = harness().await;
    seed_full_region(&harness.pool).await;

    let mut command = member_submission();
    command.requester = Requester {
        actor: ActorId::new("u-director"),
        unit: UnitCode::new("finance_admin_division"),
        is_unit_head: false,
        is_top_authority: true,
    };
    command.prepared_by = ActorId::new("u-director");

    let order = harness.travel.submit(command).await.expect("submit");
    assert!(order.status.is_finally_approved());
    let number = order.order_number.as_deref().expect("number assigned at filing");
    assert!(number.starts_with("R1-") && number.ends_with("-0001"), "got {number}");
    assert_invariants(&order);
}

#[tokio::test]
async fn unknown_order_ids_surface_not_found() {
    let harness = harness().await;
    seed_full_region(&harness.pool).await;

    let error = harness
        .travel
        .approve(&travo_core::OrderId::new("TO-missing"), &ActorId::new("u-bayfield"), None, None)
        .await
        .expect_err("missing aggregate");
    assert!(matches!(error, ServiceError::OrderNotFound(_)));
}

#[tokio::test]
async fn liquidation_is_gated_on_the_order_number_and_the_owner() {
    let harness = harness().await;
    seed_full_region(&harness.pool).await;

    let order = harness.travel.submit(member_submission()).await.expect("submit");

    let error = harness
        .liquidation
        .file(FileLiquidation {
            order_id: order.id.clone(),
            owner: ActorId::new("u-clerk"),
            amount_claimed: Decimal::new(125_000, 2),
            receipts: None,
        })
        .await
        .expect_err("no order number yet");
    assert!(matches!(error, ServiceError::Workflow(WorkflowError::InvalidState { .. })));

    let mut current = order;
    for approver in ["u-bayfield", "u-harbor", "u-ops", "u-finance", "u-director"] {
        current = harness
            .travel
            .approve(&current.id, &ActorId::new(approver), None, None)
            .await
            .expect("chain runs to terminal");
    }
    assert!(current.status.is_finally_approved());

    let error = harness
        .liquidation
        .file(FileLiquidation {
            order_id: current.id.clone(),
            owner: ActorId::new("u-intruder"),
            amount_claimed: Decimal::new(125_000, 2),
            receipts: None,
        })
        .await
        .expect_err("only the requester may file");
    assert!(matches!(error, ServiceError::Workflow(WorkflowError::Unauthorized { .. })));

    let filed = harness
        .liquidation
        .file(FileLiquidation {
            order_id: current.id.clone(),
            owner: ActorId::new("u-clerk"),
            amount_claimed: Decimal::new(125_000, 2),
            receipts: None,
        })
        .await
        .expect("owner files");
    assert_eq!(filed.status, LiquidationStatus::Pending);

    let error = harness
        .liquidation
        .file(FileLiquidation {
            order_id: current.id.clone(),
            owner: ActorId::new("u-clerk"),
            amount_claimed: Decimal::new(125_000, 2),
            receipts: None,
        })
        .await
        .expect_err("one liquidation per order");
    assert!(matches!(error, ServiceError::Workflow(WorkflowError::Validation(_))));

    let awaiting = harness
        .travel
        .list_awaiting_liquidation(&ActorId::new("u-clerk"))
        .await
        .expect("listing");
    assert!(awaiting.is_empty(), "filed orders drop out of the awaiting list");
}

#[tokio::test]
async fn liquidation_review_path_and_resubmission() {
    let harness = harness().await;
    seed_full_region(&harness.pool).await;

    let mut current = harness.travel.submit(member_submission()).await.expect("submit");
    for approver in ["u-bayfield", "u-harbor", "u-ops", "u-finance", "u-director"] {
        current = harness
            .travel
            .approve(&current.id, &ActorId::new(approver), None, None)
            .await
            .expect("chain runs to terminal");
    }

    let filed = harness
        .liquidation
        .file(FileLiquidation {
            order_id: current.id.clone(),
            owner: ActorId::new("u-clerk"),
            amount_claimed: Decimal::new(125_000, 2),
            receipts: None,
        })
        .await
        .expect("file");

    let error = harness
        .liquidation
        .review_accountant(&filed.id, &ActorId::new("u-audit"), true, None)
        .await
        .expect_err("accountant is gated on the bookkeeper");
    assert!(matches!(error, ServiceError::Workflow(WorkflowError::InvalidState { .. })));

    let after_bookkeeper = harness
        .liquidation
        .review_bookkeeper(&filed.id, &ActorId::new("u-books"), true, None)
        .await
        .expect("bookkeeper pass");
    assert_eq!(after_bookkeeper.status, LiquidationStatus::UnderFinalAudit);

    let rejected = harness
        .liquidation
        .review_accountant(
            &filed.id,
            &ActorId::new("u-audit"),
            false,
            Some("receipts missing".to_string()),
        )
        .await
        .expect("accountant rejects");
    assert_eq!(rejected.status, LiquidationStatus::Rejected);

    let error = harness
        .liquidation
        .resubmit(&filed.id, &ActorId::new("u-intruder"))
        .await
        .expect_err("only the owner may resubmit");
    assert!(matches!(error, ServiceError::Workflow(WorkflowError::Unauthorized { .. })));

    let restarted = harness
        .liquidation
        .resubmit(&filed.id, &ActorId::new("u-clerk"))
        .await
        .expect("owner resubmits");
    assert_eq!(restarted.status, LiquidationStatus::Pending);
    assert!(restarted.bookkeeper.reviewer.is_none());
    assert!(restarted.accountant.reviewer.is_none());

    let happy = harness
        .liquidation
        .review_bookkeeper(&filed.id, &ActorId::new("u-books"), true, None)
        .await
        .expect("bookkeeper pass");
    assert_eq!(happy.status, LiquidationStatus::UnderFinalAudit);
    let happy = harness
        .liquidation
        .review_accountant(&filed.id, &ActorId::new("u-audit"), true, None)
        .await
        .expect("accountant pass");
    assert_eq!(happy.status, LiquidationStatus::ReadyForClaim);
}
