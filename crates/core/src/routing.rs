use serde::{Deserialize, Serialize};

use crate::domain::directory::{ActorId, Approver, DirectoryIndex};
use crate::domain::order::{ApprovalRole, Requester};
use crate::taxonomy::{OrgTaxonomy, TaxonomyError, UnitCode};

/// A concrete approver matched against the chain, together with the chain
/// position actually matched (so skipped vacancies are reflected) and the
/// role the match stands for. `position == chain.len()` marks the implicit
/// top-authority role above the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedApprover {
    pub approver: Approver,
    pub position: usize,
    pub role: ApprovalRole,
}

/// Chain derivation and approver resolution against a directory snapshot.
/// Pure with respect to its two inputs; both are injected so tests can stage
/// any org shape and staffing.
#[derive(Clone, Copy, Debug)]
pub struct ChainRouter<'a> {
    taxonomy: &'a OrgTaxonomy,
    directory: &'a DirectoryIndex,
}

impl<'a> ChainRouter<'a> {
    pub fn new(taxonomy: &'a OrgTaxonomy, directory: &'a DirectoryIndex) -> Self {
        Self { taxonomy, directory }
    }

    pub fn taxonomy(&self) -> &'a OrgTaxonomy {
        self.taxonomy
    }

    /// Ordered approval chain for a requester. The top-level authority gets
    /// an empty chain (they sit above routing); a unit head's chain omits
    /// their own unit, since filing implies their own approval.
    pub fn chain_for(&self, requester: &Requester) -> Result<Vec<UnitCode>, TaxonomyError> {
        if requester.is_top_authority {
            return Ok(Vec::new());
        }

        let mut chain = self.taxonomy.reporting_line(&requester.unit)?;
        if requester.is_unit_head && chain.first() == Some(&requester.unit) {
            chain.remove(0);
        }
        Ok(chain)
    }

    /// Scan `chain` from `start` for the first role with an active head,
    /// skipping the excluded actor and compressing around vacant roles. When
    /// the scan exhausts the chain, fall back to the top-level authority,
    /// still honoring the exclusion. `None` means no eligible approver exists
    /// anywhere above `start`.
    pub fn next_approver(
        &self,
        chain: &[UnitCode],
        start: usize,
        exclude: Option<&ActorId>,
    ) -> Option<ResolvedApprover> {
        for (position, unit) in chain.iter().enumerate().skip(start) {
            if let Some(head) = self.directory.active_head(unit, exclude) {
                return Some(ResolvedApprover {
                    approver: head.clone(),
                    position,
                    role: ApprovalRole::Unit(unit.clone()),
                });
            }
        }

        self.directory.top_authority(exclude).map(|authority| ResolvedApprover {
            approver: authority.clone(),
            position: chain.len(),
            role: ApprovalRole::TopAuthority,
        })
    }
}
