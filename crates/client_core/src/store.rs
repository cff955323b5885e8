//! Normalized entity store.
//!
//! State is an immutable [`RootState`] snapshot behind an [`ArcSwap`]; every
//! [`Action`] produces a new snapshot. Slices hold their records in an `Arc`
//! whose identity changes exactly when the slice content changes, which is
//! what the memoized selectors key on.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use shared::domain::{
    Applicant, Assignment, ContractTemplate, Position, Role, Session, SessionId,
};

/// Records with a stable integer id.
pub trait Keyed {
    fn key(&self) -> i64;
}

macro_rules! keyed {
    ($($ty:ty),* $(,)?) => {
        $(impl Keyed for $ty {
            fn key(&self) -> i64 {
                self.id.0
            }
        })*
    };
}

keyed!(Session, Position, Applicant, Assignment, ContractTemplate);

/// The three ways a slice can change.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelAction<T> {
    ReplaceAll(Vec<T>),
    UpsertOne(T),
    DeleteOne(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelState<T> {
    pub model_data: Arc<Vec<T>>,
}

impl<T> Default for ModelState<T> {
    fn default() -> Self {
        Self {
            model_data: Arc::new(Vec::new()),
        }
    }
}

impl<T: Keyed + Clone> ModelState<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            model_data: Arc::new(records),
        }
    }

    pub fn find(&self, id: i64) -> Option<&T> {
        self.model_data.iter().find(|record| record.key() == id)
    }

    /// Returns the next slice state; an action that changes nothing keeps
    /// the current `Arc`.
    pub fn reduce(&self, action: &ModelAction<T>) -> Self {
        match action {
            ModelAction::ReplaceAll(records) => Self::new(records.clone()),
            ModelAction::UpsertOne(record) => {
                let mut next = self.model_data.as_ref().clone();
                match next.iter_mut().find(|existing| existing.key() == record.key()) {
                    Some(existing) => *existing = record.clone(),
                    None => next.push(record.clone()),
                }
                Self::new(next)
            }
            ModelAction::DeleteOne(id) => {
                if self.find(*id).is_none() {
                    return self.clone();
                }
                let next = self
                    .model_data
                    .iter()
                    .filter(|record| record.key() != *id)
                    .cloned()
                    .collect();
                Self::new(next)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionsState {
    pub model: ModelState<Session>,
    pub active_session: Option<Session>,
}

impl SessionsState {
    fn reduce(&self, action: &ModelAction<Session>) -> Self {
        let model = self.model.reduce(action);
        // The active session follows the slice: refreshed when its record
        // changes, cleared when it disappears.
        let active_session = self
            .active_session
            .as_ref()
            .and_then(|active| model.find(active.id.0).cloned());
        Self {
            model,
            active_session,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsersState {
    pub active_role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Fetch,
    Upsert,
    Delete,
}

/// A failure routed to the store by a dispatcher's error reporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedError {
    pub category: ErrorCategory,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorsState {
    pub entries: Arc<Vec<ReportedError>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootState {
    pub sessions: SessionsState,
    pub positions: ModelState<Position>,
    pub applicants: ModelState<Applicant>,
    pub assignments: ModelState<Assignment>,
    pub contract_templates: ModelState<ContractTemplate>,
    pub users: UsersState,
    pub errors: ErrorsState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Sessions(ModelAction<Session>),
    Positions(ModelAction<Position>),
    Applicants(ModelAction<Applicant>),
    Assignments(ModelAction<Assignment>),
    ContractTemplates(ModelAction<ContractTemplate>),
    /// Selects a session by id; ignored when the id is not loaded.
    SetActiveSession(Option<SessionId>),
    SetActiveRole(Role),
    ReportError(ReportedError),
    ClearErrors,
}

pub fn reduce(state: &RootState, action: &Action) -> RootState {
    let mut next = state.clone();
    match action {
        Action::Sessions(action) => next.sessions = state.sessions.reduce(action),
        Action::Positions(action) => next.positions = state.positions.reduce(action),
        Action::Applicants(action) => next.applicants = state.applicants.reduce(action),
        Action::Assignments(action) => next.assignments = state.assignments.reduce(action),
        Action::ContractTemplates(action) => {
            next.contract_templates = state.contract_templates.reduce(action)
        }
        Action::SetActiveSession(None) => next.sessions.active_session = None,
        Action::SetActiveSession(Some(id)) => {
            if let Some(session) = state.sessions.model.find(id.0) {
                next.sessions.active_session = Some(session.clone());
            }
        }
        Action::SetActiveRole(role) => next.users.active_role = *role,
        Action::ReportError(error) => {
            let mut entries = state.errors.entries.as_ref().clone();
            entries.push(error.clone());
            next.errors.entries = Arc::new(entries);
        }
        Action::ClearErrors => {
            if !state.errors.entries.is_empty() {
                next.errors = ErrorsState::default();
            }
        }
    }
    next
}

/// Shared handle to the current [`RootState`].
///
/// Readers get a consistent snapshot without blocking; writers retry their
/// reduction until it lands on the snapshot it was computed from.
#[derive(Clone)]
pub struct Store {
    snap: Arc<ArcSwap<RootState>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(RootState::default())
    }
}

impl Store {
    pub fn new(initial: RootState) -> Self {
        Self {
            snap: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    pub fn state(&self) -> Arc<RootState> {
        self.snap.load_full()
    }

    pub fn dispatch(&self, action: Action) {
        loop {
            let cur = self.snap.load_full();
            let next = Arc::new(reduce(&cur, &action));
            let prev = self.snap.compare_and_swap(&cur, next);
            if Arc::ptr_eq(&prev, &cur) {
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
