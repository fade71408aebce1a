use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::directory::{ActorId, Approver, DirectoryIndex};
use crate::domain::order::{
    ApprovalRole, DocumentHandle, OrderId, OrderStatus, Rejection, Requester, TravelOrder,
};
use crate::errors::WorkflowError;
use crate::routing::ChainRouter;
use crate::taxonomy::{OrgTaxonomy, TaxonomyError, UnitCode};

/// Input for `WorkflowEngine::submit`. The id is minted by the caller so the
/// engine stays free of id-generation concerns.
#[derive(Clone, Debug)]
pub struct NewTravelOrder {
    pub id: OrderId,
    pub requester: Requester,
    pub prepared_by: ActorId,
    pub participants: Vec<ActorId>,
    pub destination: String,
    pub purpose: String,
    pub depart_on: NaiveDate,
    pub return_on: NaiveDate,
    pub evidence: Option<DocumentHandle>,
}

/// Follow-up work a transition asks its caller to perform. The engine decides
/// *what* must happen; the service owns *how* (sequence scan, sink delivery).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkflowAction {
    /// Reserve and attach the next order number before persisting. Emitted at
    /// most once per order lifetime (or again after a resubmission cleared
    /// the previous number).
    AssignOrderNumber,
    NotifyNextApprover(Approver),
    NotifyRequesterApproved,
    NotifyRequesterFinallyApproved,
    NotifyRequesterRejected,
    /// Tell every earlier signer (except the rejector) that the approval they
    /// granted has been invalidated.
    NotifyPriorSigners,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub actions: Vec<WorkflowAction>,
}

/// The approval state machine. Owns every status/stage mutation of a
/// `TravelOrder`; callers persist the result atomically and execute the
/// returned actions. The chain is recomputed from the requester snapshot on
/// every call, never stored.
#[derive(Clone, Copy, Debug)]
pub struct WorkflowEngine<'a> {
    router: ChainRouter<'a>,
}

impl<'a> WorkflowEngine<'a> {
    pub fn new(taxonomy: &'a OrgTaxonomy, directory: &'a DirectoryIndex) -> Self {
        Self { router: ChainRouter::new(taxonomy, directory) }
    }

    /// File a new travel order. A top-level-authority requester bypasses
    /// routing entirely and is terminally approved on the spot, order number
    /// included. Everyone else is routed to the first resolvable approver;
    /// an unstaffed directory fails with `NoApproverAvailable` instead of
    /// parking an unroutable order.
    pub fn submit(
        &self,
        new: NewTravelOrder,
        now: DateTime<Utc>,
    ) -> Result<(TravelOrder, TransitionOutcome), WorkflowError> {
        if new.destination.trim().is_empty() {
            return Err(WorkflowError::Validation("destination is required".to_string()));
        }
        if new.return_on < new.depart_on {
            return Err(WorkflowError::Validation(
                "return date must not precede the departure date".to_string(),
            ));
        }

        let mut participants = new.participants;
        if !participants.contains(&new.requester.actor) {
            participants.insert(0, new.requester.actor.clone());
        }

        let mut order = TravelOrder {
            id: new.id,
            requester: new.requester,
            prepared_by: new.prepared_by,
            participants,
            destination: new.destination,
            purpose: new.purpose,
            depart_on: new.depart_on,
            return_on: new.return_on,
            evidence: new.evidence,
            status: OrderStatus::Placed,
            chain_position: 0,
            current_approver: None,
            order_number: None,
            rejection: None,
            is_resubmitted: false,
            submitted_at: now,
            updated_at: now,
        };

        let from = order.status.clone();
        let mut actions = Vec::new();

        if order.requester.is_top_authority {
            order.status = OrderStatus::Approved(ApprovalRole::TopAuthority);
            actions.push(WorkflowAction::AssignOrderNumber);
            actions.push(WorkflowAction::NotifyRequesterFinallyApproved);
        } else {
            let chain = self.chain(&order.requester)?;
            let first = self
                .router
                .next_approver(&chain, 0, Some(&order.requester.actor))
                .ok_or(WorkflowError::NoApproverAvailable)?;

            order.chain_position = first.position;
            order.current_approver = Some(first.approver.id.clone());
            actions.push(WorkflowAction::NotifyNextApprover(first.approver));
        }

        let outcome = TransitionOutcome { from, to: order.status.clone(), actions };
        Ok((order, outcome))
    }

    /// Record the current approver's approval and advance or terminate the
    /// chain. A stored position past the end of the recomputed chain is
    /// treated as top-authority approval, never as an out-of-range fault.
    pub fn approve(
        &self,
        order: &mut TravelOrder,
        actor: &ActorId,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        self.ensure_current_approver(order, actor)?;

        let chain = self.chain(&order.requester)?;
        let from = order.status.clone();
        let role = approved_role_at(&chain, order.chain_position);
        order.status = OrderStatus::Approved(role);

        let mut actions = Vec::new();
        match self.router.next_approver(&chain, order.chain_position + 1, Some(actor)) {
            Some(next) => {
                order.chain_position = next.position;
                order.current_approver = Some(next.approver.id.clone());
                actions.push(WorkflowAction::NotifyRequesterApproved);
                actions.push(WorkflowAction::NotifyNextApprover(next.approver));
            }
            None => {
                order.status = OrderStatus::Approved(ApprovalRole::TopAuthority);
                order.current_approver = None;
                if order.order_number.is_none() {
                    actions.push(WorkflowAction::AssignOrderNumber);
                }
                actions.push(WorkflowAction::NotifyRequesterFinallyApproved);
            }
        }

        order.is_resubmitted = false;
        order.updated_at = now;
        Ok(TransitionOutcome { from, to: order.status.clone(), actions })
    }

    /// Record the current approver's rejection. Prior signature records are
    /// retained; they represent a now-invalidated approval history.
    pub fn reject(
        &self,
        order: &mut TravelOrder,
        actor: &ActorId,
        comment: &str,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        self.ensure_current_approver(order, actor)?;
        if comment.trim().is_empty() {
            return Err(WorkflowError::Validation("a rejection comment is required".to_string()));
        }

        let chain = self.chain(&order.requester)?;
        let from = order.status.clone();
        order.status = OrderStatus::Rejected(rejected_role_at(&chain, order.chain_position));
        order.rejection =
            Some(Rejection { by: actor.clone(), at: now, comment: comment.trim().to_string() });
        order.current_approver = None;
        order.updated_at = now;

        Ok(TransitionOutcome {
            from,
            to: order.status.clone(),
            actions: vec![WorkflowAction::NotifyRequesterRejected, WorkflowAction::NotifyPriorSigners],
        })
    }

    /// Restart a rejected order from stage zero. Any named participant (or
    /// the preparer) may trigger it; the first approver is re-resolved
    /// exactly like a fresh submission.
    pub fn resubmit(
        &self,
        order: &mut TravelOrder,
        actor: &ActorId,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        if !order.status.is_rejected() {
            return Err(WorkflowError::invalid_state(order.status.as_code()));
        }
        if !order.is_participant(actor) {
            return Err(WorkflowError::unauthorized(actor.0.clone()));
        }

        let chain = self.chain(&order.requester)?;
        let first = self
            .router
            .next_approver(&chain, 0, Some(&order.requester.actor))
            .ok_or(WorkflowError::NoApproverAvailable)?;

        let from = order.status.clone();
        order.status = OrderStatus::Placed;
        order.chain_position = first.position;
        order.current_approver = Some(first.approver.id.clone());
        order.order_number = None;
        order.rejection = None;
        order.is_resubmitted = true;
        order.updated_at = now;

        Ok(TransitionOutcome {
            from,
            to: order.status.clone(),
            actions: vec![WorkflowAction::NotifyNextApprover(first.approver)],
        })
    }

    fn ensure_current_approver(
        &self,
        order: &TravelOrder,
        actor: &ActorId,
    ) -> Result<(), WorkflowError> {
        if order.status.is_terminal() {
            return Err(WorkflowError::invalid_state(order.status.as_code()));
        }
        match &order.current_approver {
            Some(current) if current == actor => Ok(()),
            Some(_) => Err(WorkflowError::unauthorized(actor.0.clone())),
            // Non-terminal with no approver would violate the aggregate
            // invariant; refuse rather than guess.
            None => Err(WorkflowError::invalid_state(order.status.as_code())),
        }
    }

    fn chain(&self, requester: &Requester) -> Result<Vec<UnitCode>, WorkflowError> {
        self.router.chain_for(requester).map_err(taxonomy_to_workflow)
    }
}

fn approved_role_at(chain: &[UnitCode], position: usize) -> ApprovalRole {
    match chain.get(position) {
        Some(unit) => ApprovalRole::Unit(unit.clone()),
        None => ApprovalRole::TopAuthority,
    }
}

fn rejected_role_at(chain: &[UnitCode], position: usize) -> Option<ApprovalRole> {
    if position < chain.len() {
        Some(ApprovalRole::Unit(chain[position].clone()))
    } else if position == chain.len() {
        Some(ApprovalRole::TopAuthority)
    } else {
        // Stale position from an edited taxonomy: fall back to the generic
        // rejected status rather than naming the wrong role.
        None
    }
}

fn taxonomy_to_workflow(error: TaxonomyError) -> WorkflowError {
    WorkflowError::Validation(error.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use crate::domain::directory::{ActorId, ApproverCandidate, DirectoryIndex};
    use crate::domain::order::{ApprovalRole, OrderId, OrderStatus, Requester, TravelOrder};
    use crate::errors::WorkflowError;
    use crate::taxonomy::{OrgTaxonomy, UnitCode};

    use super::{NewTravelOrder, WorkflowAction, WorkflowEngine};

    fn head_of(id: &str, unit: &str) -> ApproverCandidate {
        let now = Utc::now();
        ApproverCandidate {
            id: ActorId::new(id),
            full_name: format!("Head {id}"),
            unit: Some(UnitCode::new(unit)),
            is_unit_head: true,
            is_top_authority: false,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn director(id: &str) -> ApproverCandidate {
        let now = Utc::now();
        ApproverCandidate {
            id: ActorId::new(id),
            full_name: format!("Director {id}"),
            unit: None,
            is_unit_head: false,
            is_top_authority: true,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn fully_staffed() -> Vec<ApproverCandidate> {
        vec![
            head_of("u-bayfield", "bayfield_center"),
            head_of("u-harbor", "harbor_po"),
            head_of("u-ops", "operations_division"),
            head_of("u-finance", "finance_admin_division"),
            director("u-director"),
        ]
    }

    fn new_order(requester: Requester) -> NewTravelOrder {
        NewTravelOrder {
            id: OrderId::new("TO-1"),
            requester,
            prepared_by: ActorId::new("u-clerk"),
            participants: Vec::new(),
            destination: "Capital City".to_string(),
            purpose: "Coordination meeting".to_string(),
            depart_on: NaiveDate::from_ymd_opt(2026, 8, 10).expect("valid date"),
            return_on: NaiveDate::from_ymd_opt(2026, 8, 12).expect("valid date"),
            evidence: None,
        }
    }

    fn member_of(unit: &str) -> Requester {
        Requester {
            actor: ActorId::new("u-clerk"),
            unit: UnitCode::new(unit),
            is_unit_head: false,
            is_top_authority: false,
        }
    }

    fn assert_approver_invariant(order: &TravelOrder) {
        assert_eq!(
            order.current_approver.is_none(),
            order.status.is_terminal(),
            "current_approver must be null exactly in terminal states (status: {})",
            order.status.as_code(),
        );
    }

    fn submit(
        engine: &WorkflowEngine<'_>,
        requester: Requester,
    ) -> (TravelOrder, Vec<WorkflowAction>) {
        let (order, outcome) = engine.submit(new_order(requester), Utc::now()).expect("submit");
        (order, outcome.actions)
    }

    #[test]
    fn submission_routes_to_the_first_staffed_role() {
        let taxonomy = OrgTaxonomy::default_region();
        let directory = DirectoryIndex::new(fully_staffed());
        let engine = WorkflowEngine::new(&taxonomy, &directory);

        let (order, actions) = submit(&engine, member_of("bayfield_center"));
        assert_eq!(order.status, OrderStatus::Placed);
        assert_eq!(order.chain_position, 0);
        assert_eq!(order.current_approver, Some(ActorId::new("u-bayfield")));
        assert!(order.participants.contains(&ActorId::new("u-clerk")));
        assert!(matches!(actions[0], WorkflowAction::NotifyNextApprover(_)));
        assert_approver_invariant(&order);
    }

    #[test]
    fn staffed_chain_advances_role_by_role_then_terminates_with_a_number_request() {
        let taxonomy = OrgTaxonomy::default_region();
        let directory = DirectoryIndex::new(fully_staffed());
        let engine = WorkflowEngine::new(&taxonomy, &directory);
        let now = Utc::now();

        let (mut order, _) = submit(&engine, member_of("bayfield_center"));

        let approvers =
            ["u-bayfield", "u-harbor", "u-ops", "u-finance"].map(ActorId::new).to_vec();
        let mut seen = vec![order.current_approver.clone().expect("routed")];

        for (step, approver) in approvers.iter().enumerate() {
            let outcome = engine.approve(&mut order, approver, now).expect("approval advances");
            assert!(!order.status.is_terminal(), "step {step} is not terminal");
            assert_eq!(order.chain_position, step + 1);
            let next = order.current_approver.clone().expect("still routed");
            assert!(!seen.contains(&next), "approver {next} repeated");
            seen.push(next);
            assert!(outcome.actions.contains(&WorkflowAction::NotifyRequesterApproved));
            assert_approver_invariant(&order);
        }

        // The director is now the current approver via the fallback position.
        assert_eq!(order.current_approver, Some(ActorId::new("u-director")));
        let outcome =
            engine.approve(&mut order, &ActorId::new("u-director"), now).expect("terminal");
        assert_eq!(order.status, OrderStatus::Approved(ApprovalRole::TopAuthority));
        assert!(order.current_approver.is_none());
        assert!(outcome.actions.contains(&WorkflowAction::AssignOrderNumber));
        assert!(outcome.actions.contains(&WorkflowAction::NotifyRequesterFinallyApproved));
    }

    #[test]
    fn vacancy_in_the_middle_is_skipped_with_the_position_reflecting_it() {
        let taxonomy = OrgTaxonomy::default_region();
        // operations_division vacant; approval at harbor_po must skip to
        // finance_admin_division at position 3.
        let directory = DirectoryIndex::new(vec![
            head_of("u-bayfield", "bayfield_center"),
            head_of("u-harbor", "harbor_po"),
            head_of("u-finance", "finance_admin_division"),
            director("u-director"),
        ]);
        let engine = WorkflowEngine::new(&taxonomy, &directory);
        let now = Utc::now();

        let (mut order, _) = submit(&engine, member_of("bayfield_center"));
        engine.approve(&mut order, &ActorId::new("u-bayfield"), now).expect("first");
        engine.approve(&mut order, &ActorId::new("u-harbor"), now).expect("second");

        assert_eq!(order.chain_position, 3);
        assert_eq!(order.current_approver, Some(ActorId::new("u-finance")));
        assert_approver_invariant(&order);
    }

    #[test]
    fn approve_by_anyone_but_the_current_approver_is_unauthorized_and_mutation_free() {
        let taxonomy = OrgTaxonomy::default_region();
        let directory = DirectoryIndex::new(fully_staffed());
        let engine = WorkflowEngine::new(&taxonomy, &directory);
        let now = Utc::now();

        let (mut order, _) = submit(&engine, member_of("bayfield_center"));
        engine.approve(&mut order, &ActorId::new("u-bayfield"), now).expect("first approval");
        let snapshot = order.clone();

        let error = engine
            .approve(&mut order, &ActorId::new("u-bayfield"), now)
            .expect_err("the chain has moved past this approver");
        assert!(matches!(error, WorkflowError::Unauthorized { .. }));
        assert_eq!(order, snapshot, "failed call must leave the aggregate untouched");
    }

    #[test]
    fn approving_a_terminal_order_is_an_invalid_state() {
        let taxonomy = OrgTaxonomy::default_region();
        let directory = DirectoryIndex::new(vec![head_of("u-bayfield", "bayfield_center"), director("u-director")]);
        let engine = WorkflowEngine::new(&taxonomy, &directory);
        let now = Utc::now();

        let (mut order, _) = submit(&engine, member_of("bayfield_center"));
        engine.approve(&mut order, &ActorId::new("u-bayfield"), now).expect("to director");
        engine.approve(&mut order, &ActorId::new("u-director"), now).expect("terminal");

        let error = engine
            .approve(&mut order, &ActorId::new("u-director"), now)
            .expect_err("terminal orders accept no further decisions");
        assert!(matches!(error, WorkflowError::InvalidState { .. }));
    }

    #[test]
    fn stale_position_past_the_chain_clamps_to_top_authority_approval() {
        let taxonomy = OrgTaxonomy::default_region();
        let directory = DirectoryIndex::new(fully_staffed());
        let engine = WorkflowEngine::new(&taxonomy, &directory);
        let now = Utc::now();

        let (mut order, _) = submit(&engine, member_of("bayfield_center"));
        order.chain_position = 40;
        order.current_approver = Some(ActorId::new("u-director"));

        engine.approve(&mut order, &ActorId::new("u-director"), now).expect("clamped");
        assert_eq!(order.status, OrderStatus::Approved(ApprovalRole::TopAuthority));
        assert_approver_invariant(&order);
    }

    #[test]
    fn rejection_requires_a_comment() {
        let taxonomy = OrgTaxonomy::default_region();
        let directory = DirectoryIndex::new(fully_staffed());
        let engine = WorkflowEngine::new(&taxonomy, &directory);

        let (mut order, _) = submit(&engine, member_of("bayfield_center"));
        let error = engine
            .reject(&mut order, &ActorId::new("u-bayfield"), "  ", Utc::now())
            .expect_err("blank comment");
        assert!(matches!(error, WorkflowError::Validation(_)));
        assert_eq!(order.status, OrderStatus::Placed);
    }

    #[test]
    fn rejection_names_the_role_and_clears_the_approver() {
        let taxonomy = OrgTaxonomy::default_region();
        let directory = DirectoryIndex::new(fully_staffed());
        let engine = WorkflowEngine::new(&taxonomy, &directory);
        let now = Utc::now();

        let (mut order, _) = submit(&engine, member_of("bayfield_center"));
        engine.approve(&mut order, &ActorId::new("u-bayfield"), now).expect("first");

        let outcome = engine
            .reject(&mut order, &ActorId::new("u-harbor"), "itinerary unclear", now)
            .expect("rejection");
        assert_eq!(
            order.status,
            OrderStatus::Rejected(Some(ApprovalRole::Unit(UnitCode::new("harbor_po")))),
        );
        assert!(order.current_approver.is_none());
        let rejection = order.rejection.as_ref().expect("metadata recorded");
        assert_eq!(rejection.by, ActorId::new("u-harbor"));
        assert_eq!(rejection.comment, "itinerary unclear");
        assert!(outcome.actions.contains(&WorkflowAction::NotifyPriorSigners));
        assert_approver_invariant(&order);
    }

    #[test]
    fn resubmission_round_trip_restores_a_routable_order() {
        let taxonomy = OrgTaxonomy::default_region();
        let directory = DirectoryIndex::new(fully_staffed());
        let engine = WorkflowEngine::new(&taxonomy, &directory);
        let now = Utc::now();

        let (mut order, _) = submit(&engine, member_of("bayfield_center"));
        engine.approve(&mut order, &ActorId::new("u-bayfield"), now).expect("first");
        engine
            .reject(&mut order, &ActorId::new("u-harbor"), "itinerary unclear", now)
            .expect("rejection");

        engine.resubmit(&mut order, &ActorId::new("u-clerk"), now).expect("participant resubmits");
        assert_eq!(order.status, OrderStatus::Placed);
        assert_eq!(order.chain_position, 0);
        assert!(order.order_number.is_none());
        assert_eq!(order.current_approver, Some(ActorId::new("u-bayfield")));
        assert!(order.is_resubmitted);
        assert!(order.rejection.is_none());
        assert_approver_invariant(&order);
    }

    #[test]
    fn resubmission_is_limited_to_participants_and_rejected_orders() {
        let taxonomy = OrgTaxonomy::default_region();
        let directory = DirectoryIndex::new(fully_staffed());
        let engine = WorkflowEngine::new(&taxonomy, &directory);
        let now = Utc::now();

        let (mut order, _) = submit(&engine, member_of("bayfield_center"));
        let error = engine
            .resubmit(&mut order, &ActorId::new("u-clerk"), now)
            .expect_err("only rejected orders restart");
        assert!(matches!(error, WorkflowError::InvalidState { .. }));

        engine
            .reject(&mut order, &ActorId::new("u-bayfield"), "wrong dates", now)
            .expect("rejection");
        let error = engine
            .resubmit(&mut order, &ActorId::new("u-stranger"), now)
            .expect_err("outsiders cannot resubmit");
        assert!(matches!(error, WorkflowError::Unauthorized { .. }));
    }

    #[test]
    fn resubmission_with_an_unstaffed_directory_is_surfaced() {
        let taxonomy = OrgTaxonomy::default_region();
        let staffed = DirectoryIndex::new(fully_staffed());
        let engine = WorkflowEngine::new(&taxonomy, &staffed);
        let now = Utc::now();

        let (mut order, _) = submit(&engine, member_of("bayfield_center"));
        engine
            .reject(&mut order, &ActorId::new("u-bayfield"), "wrong dates", now)
            .expect("rejection");

        let empty = DirectoryIndex::default();
        let engine = WorkflowEngine::new(&taxonomy, &empty);
        let error = engine
            .resubmit(&mut order, &ActorId::new("u-clerk"), now)
            .expect_err("nobody left to route to");
        assert_eq!(error, WorkflowError::NoApproverAvailable);
    }

    #[test]
    fn top_authority_filer_is_terminally_approved_at_submission() {
        let taxonomy = OrgTaxonomy::default_region();
        let directory = DirectoryIndex::new(fully_staffed());
        let engine = WorkflowEngine::new(&taxonomy, &directory);

        let (order, actions) = submit(
            &engine,
            Requester {
                actor: ActorId::new("u-director"),
                unit: UnitCode::new("finance_admin_division"),
                is_unit_head: false,
                is_top_authority: true,
            },
        );

        assert_eq!(order.status, OrderStatus::Approved(ApprovalRole::TopAuthority));
        assert!(order.current_approver.is_none());
        assert_eq!(order.chain_position, 0);
        assert!(actions.contains(&WorkflowAction::AssignOrderNumber));
    }

    #[test]
    fn unit_head_submission_skips_their_own_unit() {
        let taxonomy = OrgTaxonomy::default_region();
        let directory = DirectoryIndex::new(fully_staffed());
        let engine = WorkflowEngine::new(&taxonomy, &directory);

        let (order, _) = submit(
            &engine,
            Requester {
                actor: ActorId::new("u-bayfield"),
                unit: UnitCode::new("bayfield_center"),
                is_unit_head: true,
                is_top_authority: false,
            },
        );

        // Chain for the head is [harbor_po, operations_division,
        // finance_admin_division]; role 0 is the provincial office.
        assert_eq!(order.current_approver, Some(ActorId::new("u-harbor")));
        assert_eq!(order.chain_position, 0);
    }

    #[test]
    fn submission_with_nobody_to_route_to_fails() {
        let taxonomy = OrgTaxonomy::default_region();
        let directory = DirectoryIndex::default();
        let engine = WorkflowEngine::new(&taxonomy, &directory);

        let error = engine
            .submit(new_order(member_of("bayfield_center")), Utc::now())
            .expect_err("unstaffed directory");
        assert_eq!(error, WorkflowError::NoApproverAvailable);
    }

    #[test]
    fn invalid_date_range_is_rejected_up_front() {
        let taxonomy = OrgTaxonomy::default_region();
        let directory = DirectoryIndex::new(fully_staffed());
        let engine = WorkflowEngine::new(&taxonomy, &directory);

        let mut new = new_order(member_of("bayfield_center"));
        new.return_on = NaiveDate::from_ymd_opt(2026, 8, 1).expect("valid date");
        let error = engine.submit(new, Utc::now()).expect_err("dates inverted");
        assert!(matches!(error, WorkflowError::Validation(_)));
    }

    #[test]
    fn approve_clears_the_resubmission_flag() {
        let taxonomy = OrgTaxonomy::default_region();
        let directory = DirectoryIndex::new(fully_staffed());
        let engine = WorkflowEngine::new(&taxonomy, &directory);
        let now = Utc::now();

        let (mut order, _) = submit(&engine, member_of("bayfield_center"));
        engine.reject(&mut order, &ActorId::new("u-bayfield"), "redo", now).expect("rejection");
        engine.resubmit(&mut order, &ActorId::new("u-clerk"), now).expect("resubmit");
        assert!(order.is_resubmitted);

        engine.approve(&mut order, &ActorId::new("u-bayfield"), now).expect("approval");
        assert!(!order.is_resubmitted);
    }
}
