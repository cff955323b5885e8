//! Selectors over an explicit [`RootState`].
//!
//! Plain selectors hand out the slice `Arc`s directly. Join selectors are
//! memoized on the identity of their inputs: the same inputs give back the
//! same output `Arc`, and a change to any input (an applicant rename, say)
//! yields a fresh output.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use serde::{ser::SerializeMap, Serialize, Serializer};
use shared::domain::{
    Applicant, ApplicantId, Assignment, AssignmentId, Attributes, ContractTemplate, Position,
    PositionId, Role, Session, SessionId,
};

use crate::store::{ReportedError, RootState};

pub fn sessions_selector(state: &RootState) -> Arc<Vec<Session>> {
    Arc::clone(&state.sessions.model.model_data)
}

pub fn positions_selector(state: &RootState) -> Arc<Vec<Position>> {
    Arc::clone(&state.positions.model_data)
}

pub fn applicants_selector(state: &RootState) -> Arc<Vec<Applicant>> {
    Arc::clone(&state.applicants.model_data)
}

/// Assignments as stored, with scalar foreign keys.
pub fn raw_assignments_selector(state: &RootState) -> Arc<Vec<Assignment>> {
    Arc::clone(&state.assignments.model_data)
}

pub fn contract_templates_selector(state: &RootState) -> Arc<Vec<ContractTemplate>> {
    Arc::clone(&state.contract_templates.model_data)
}

pub fn active_session_selector(state: &RootState) -> Option<&Session> {
    state.sessions.active_session.as_ref()
}

pub fn active_role_selector(state: &RootState) -> Role {
    state.users.active_role
}

pub fn errors_selector(state: &RootState) -> Arc<Vec<ReportedError>> {
    Arc::clone(&state.errors.entries)
}

/// View shape of an assignment: both relations expanded, `{}` when the
/// related record is not loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentView {
    pub id: AssignmentId,
    #[serde(serialize_with = "object_or_empty")]
    pub position: Option<Position>,
    #[serde(serialize_with = "object_or_empty")]
    pub applicant: Option<Applicant>,
    #[serde(flatten)]
    pub attributes: Attributes,
}

fn object_or_empty<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    match value {
        Some(value) => value.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

/// Inputs a memoized selector compares between calls.
pub trait Dependency: Clone {
    fn same(&self, other: &Self) -> bool;
}

impl<T: ?Sized> Dependency for Arc<T> {
    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl Dependency for Option<SessionId> {
    fn same(&self, other: &Self) -> bool {
        self == other
    }
}

impl<A: Dependency, B: Dependency> Dependency for (A, B) {
    fn same(&self, other: &Self) -> bool {
        self.0.same(&other.0) && self.1.same(&other.1)
    }
}

impl<A: Dependency, B: Dependency, C: Dependency> Dependency for (A, B, C) {
    fn same(&self, other: &Self) -> bool {
        self.0.same(&other.0) && self.1.same(&other.1) && self.2.same(&other.2)
    }
}

/// Single-entry cache keyed on the last inputs seen.
pub struct Memo<D, O> {
    last: Mutex<Option<(D, Arc<O>)>>,
    recomputations: AtomicUsize,
}

impl<D, O> Default for Memo<D, O> {
    fn default() -> Self {
        Self {
            last: Mutex::new(None),
            recomputations: AtomicUsize::new(0),
        }
    }
}

impl<D: Dependency, O> Memo<D, O> {
    pub fn get(&self, deps: D, derive: impl FnOnce(&D) -> O) -> Arc<O> {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((prev, output)) = last.as_ref() {
            if prev.same(&deps) {
                return Arc::clone(output);
            }
        }
        let output = Arc::new(derive(&deps));
        self.recomputations.fetch_add(1, Ordering::Relaxed);
        *last = Some((deps, Arc::clone(&output)));
        output
    }

    pub fn recomputations(&self) -> usize {
        self.recomputations.load(Ordering::Relaxed)
    }
}

type AssignmentInputs = (Arc<Vec<Assignment>>, Arc<Vec<Position>>, Arc<Vec<Applicant>>);

/// Joins assignments with their position and applicant records.
#[derive(Default)]
pub struct AssignmentsSelector {
    memo: Memo<AssignmentInputs, Vec<AssignmentView>>,
}

impl AssignmentsSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&self, state: &RootState) -> Arc<Vec<AssignmentView>> {
        let inputs = (
            raw_assignments_selector(state),
            positions_selector(state),
            applicants_selector(state),
        );
        self.memo.get(inputs, |(assignments, positions, applicants)| {
            join_assignments(assignments, positions, applicants)
        })
    }

    pub fn recomputations(&self) -> usize {
        self.memo.recomputations()
    }
}

pub fn join_assignments(
    assignments: &[Assignment],
    positions: &[Position],
    applicants: &[Applicant],
) -> Vec<AssignmentView> {
    if assignments.is_empty() {
        return Vec::new();
    }
    let positions: HashMap<PositionId, &Position> =
        positions.iter().map(|position| (position.id, position)).collect();
    let applicants: HashMap<ApplicantId, &Applicant> = applicants
        .iter()
        .map(|applicant| (applicant.id, applicant))
        .collect();

    assignments
        .iter()
        .map(|assignment| AssignmentView {
            id: assignment.id,
            position: positions.get(&assignment.position_id).map(|p| (*p).clone()),
            applicant: applicants.get(&assignment.applicant_id).map(|a| (*a).clone()),
            attributes: assignment.attributes.clone(),
        })
        .collect()
}

/// Positions belonging to the active session; empty when none is active.
#[derive(Default)]
pub struct PositionsForActiveSession {
    memo: Memo<(Arc<Vec<Position>>, Option<SessionId>), Vec<Position>>,
}

impl PositionsForActiveSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&self, state: &RootState) -> Arc<Vec<Position>> {
        let active = active_session_selector(state).map(|session| session.id);
        self.memo
            .get((positions_selector(state), active), |(positions, active)| {
                let Some(active) = active else {
                    return Vec::new();
                };
                positions
                    .iter()
                    .filter(|position| position.session_id == Some(*active))
                    .cloned()
                    .collect()
            })
    }

    pub fn recomputations(&self) -> usize {
        self.memo.recomputations()
    }
}

/// The memoized selectors a client keeps for its lifetime.
#[derive(Default)]
pub struct Selectors {
    pub assignments: AssignmentsSelector,
    pub positions_for_active_session: PositionsForActiveSession,
}

#[cfg(test)]
#[path = "tests/selectors_tests.rs"]
mod tests;
