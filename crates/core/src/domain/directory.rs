use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::taxonomy::{normalize_key, UnitCode};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One approver-directory row. Read-only from the workflow's perspective;
/// admin tooling maintains these.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverCandidate {
    pub id: ActorId,
    pub full_name: String,
    pub unit: Option<UnitCode>,
    pub is_unit_head: bool,
    pub is_top_authority: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The slice of a candidate that routing needs once eligibility is settled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approver {
    pub id: ActorId,
    pub full_name: String,
}

/// Point-in-time snapshot of the active directory, indexed for chain
/// resolution. Built fresh for each transition so routing stays a pure
/// function of its inputs and tests can hand-roll any staffing shape.
#[derive(Clone, Debug, Default)]
pub struct DirectoryIndex {
    heads_by_unit: HashMap<String, Vec<Approver>>,
    top_authorities: Vec<Approver>,
}

impl DirectoryIndex {
    pub fn new(candidates: Vec<ApproverCandidate>) -> Self {
        let mut heads_by_unit: HashMap<String, Vec<Approver>> = HashMap::new();
        let mut top_authorities = Vec::new();

        for candidate in candidates.into_iter().filter(|candidate| candidate.active) {
            let approver =
                Approver { id: candidate.id.clone(), full_name: candidate.full_name.clone() };

            if candidate.is_top_authority {
                top_authorities.push(approver.clone());
            }
            if candidate.is_unit_head {
                if let Some(unit) = &candidate.unit {
                    heads_by_unit.entry(normalize_key(&unit.0)).or_default().push(approver);
                }
            }
        }

        // Deterministic resolution: ties break on actor id.
        for heads in heads_by_unit.values_mut() {
            heads.sort_by(|left, right| left.id.0.cmp(&right.id.0));
        }
        top_authorities.sort_by(|left, right| left.id.0.cmp(&right.id.0));

        Self { heads_by_unit, top_authorities }
    }

    pub fn active_head(&self, unit: &UnitCode, exclude: Option<&ActorId>) -> Option<&Approver> {
        self.heads_by_unit
            .get(&normalize_key(&unit.0))?
            .iter()
            .find(|approver| Some(&approver.id) != exclude)
    }

    pub fn top_authority(&self, exclude: Option<&ActorId>) -> Option<&Approver> {
        self.top_authorities.iter().find(|approver| Some(&approver.id) != exclude)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::taxonomy::UnitCode;

    use super::{ActorId, ApproverCandidate, DirectoryIndex};

    fn candidate(id: &str, unit: Option<&str>, head: bool, top: bool, active: bool) -> ApproverCandidate {
        let now = Utc::now();
        ApproverCandidate {
            id: ActorId::new(id),
            full_name: format!("Approver {id}"),
            unit: unit.map(UnitCode::new),
            is_unit_head: head,
            is_top_authority: top,
            active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn inactive_candidates_never_resolve() {
        let index = DirectoryIndex::new(vec![candidate("u-head", Some("harbor_po"), true, false, false)]);
        assert!(index.active_head(&UnitCode::new("harbor_po"), None).is_none());
    }

    #[test]
    fn head_lookup_is_deterministic_on_actor_id() {
        let index = DirectoryIndex::new(vec![
            candidate("u-zeta", Some("harbor_po"), true, false, true),
            candidate("u-alpha", Some("harbor_po"), true, false, true),
        ]);

        let head = index.active_head(&UnitCode::new("harbor_po"), None).expect("staffed unit");
        assert_eq!(head.id, ActorId::new("u-alpha"));
    }

    #[test]
    fn exclusion_falls_through_to_the_next_candidate() {
        let index = DirectoryIndex::new(vec![
            candidate("u-alpha", Some("harbor_po"), true, false, true),
            candidate("u-beta", Some("harbor_po"), true, false, true),
        ]);

        let head = index
            .active_head(&UnitCode::new("harbor_po"), Some(&ActorId::new("u-alpha")))
            .expect("second head remains");
        assert_eq!(head.id, ActorId::new("u-beta"));
    }

    #[test]
    fn top_authority_honors_exclusion() {
        let index = DirectoryIndex::new(vec![candidate("u-director", None, false, true, true)]);

        assert!(index.top_authority(None).is_some());
        assert!(index.top_authority(Some(&ActorId::new("u-director"))).is_none());
    }

    #[test]
    fn non_head_members_do_not_resolve_for_their_unit() {
        let index = DirectoryIndex::new(vec![candidate("u-clerk", Some("harbor_po"), false, false, true)]);
        assert!(index.active_head(&UnitCode::new("harbor_po"), None).is_none());
    }
}
