use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::domain::{AssignmentId, SessionId};
use tracing::debug;

use crate::{
    collection::{record_id, Collection, EntityRules, UniqueKey, Upserted, ValueKind},
    Record, StorageError,
};

static SESSION_RULES: EntityRules = EntityRules {
    entity: "session",
    required: &["name"],
    typed: &[("name", ValueKind::String)],
    unique: &[UniqueKey {
        fields: &["name"],
        scope: None,
    }],
    immutable: &[],
};

static POSITION_RULES: EntityRules = EntityRules {
    entity: "position",
    required: &["session_id", "position_code"],
    typed: &[
        ("session_id", ValueKind::Integer),
        ("position_code", ValueKind::String),
    ],
    unique: &[UniqueKey {
        fields: &["position_code"],
        scope: Some("session_id"),
    }],
    immutable: &["session_id"],
};

static APPLICANT_RULES: EntityRules = EntityRules {
    entity: "applicant",
    required: &["utorid"],
    typed: &[("utorid", ValueKind::String)],
    unique: &[UniqueKey {
        fields: &["utorid"],
        scope: None,
    }],
    immutable: &[],
};

static ASSIGNMENT_RULES: EntityRules = EntityRules {
    entity: "assignment",
    required: &["position_id", "applicant_id"],
    typed: &[
        ("position_id", ValueKind::Integer),
        ("applicant_id", ValueKind::Integer),
    ],
    unique: &[UniqueKey {
        fields: &["position_id", "applicant_id"],
        scope: None,
    }],
    immutable: &[],
};

static CONTRACT_TEMPLATE_RULES: EntityRules = EntityRules {
    entity: "contract template",
    required: &["session_id", "template_name", "template_file"],
    typed: &[
        ("session_id", ValueKind::Integer),
        ("template_name", ValueKind::String),
        ("template_file", ValueKind::String),
    ],
    unique: &[UniqueKey {
        fields: &["template_name"],
        scope: Some("session_id"),
    }],
    immutable: &["session_id"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Session,
    Position,
    Applicant,
    Assignment,
    ContractTemplate,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Session,
        EntityKind::Position,
        EntityKind::Applicant,
        EntityKind::Assignment,
        EntityKind::ContractTemplate,
    ];

    /// Key of this collection in the persisted dataset.
    pub fn collection_name(self) -> &'static str {
        match self {
            EntityKind::Session => "sessions",
            EntityKind::Position => "positions",
            EntityKind::Applicant => "applicants",
            EntityKind::Assignment => "assignments",
            EntityKind::ContractTemplate => "contract_templates",
        }
    }

    fn rules(self) -> &'static EntityRules {
        match self {
            EntityKind::Session => &SESSION_RULES,
            EntityKind::Position => &POSITION_RULES,
            EntityKind::Applicant => &APPLICANT_RULES,
            EntityKind::Assignment => &ASSIGNMENT_RULES,
            EntityKind::ContractTemplate => &CONTRACT_TEMPLATE_RULES,
        }
    }
}

/// Persisted layout of a [`Repository`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct DatasetFile {
    #[serde(default)]
    sessions: Vec<Record>,
    #[serde(default)]
    positions: Vec<Record>,
    #[serde(default)]
    applicants: Vec<Record>,
    #[serde(default)]
    assignments: Vec<Record>,
    #[serde(default)]
    contract_templates: Vec<Record>,
    #[serde(default)]
    assignments_by_session: BTreeMap<i64, Vec<i64>>,
}

/// The whole emulated backend: one collection per entity type plus the
/// session → assignment index, mutated only through this API.
#[derive(Debug, Clone)]
pub struct Repository {
    sessions: Collection,
    positions: Collection,
    applicants: Collection,
    assignments: Collection,
    contract_templates: Collection,
    assignments_by_session: BTreeMap<i64, Vec<i64>>,
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

fn int_field(record: &Record, field: &str) -> Option<i64> {
    record.get(field).and_then(Value::as_i64)
}

impl Repository {
    pub fn new() -> Self {
        Self {
            sessions: Collection::new(EntityKind::Session.rules()),
            positions: Collection::new(EntityKind::Position.rules()),
            applicants: Collection::new(EntityKind::Applicant.rules()),
            assignments: Collection::new(EntityKind::Assignment.rules()),
            contract_templates: Collection::new(EntityKind::ContractTemplate.rules()),
            assignments_by_session: BTreeMap::new(),
        }
    }

    fn collection(&self, kind: EntityKind) -> &Collection {
        match kind {
            EntityKind::Session => &self.sessions,
            EntityKind::Position => &self.positions,
            EntityKind::Applicant => &self.applicants,
            EntityKind::Assignment => &self.assignments,
            EntityKind::ContractTemplate => &self.contract_templates,
        }
    }

    pub fn find_all(&self, kind: EntityKind) -> &[Record] {
        self.collection(kind).find_all()
    }

    pub fn find(&self, kind: EntityKind, id: i64) -> Result<&Record, StorageError> {
        self.collection(kind)
            .find(id)
            .ok_or(StorageError::NotFound {
                entity: kind.rules().entity,
                id,
            })
    }

    pub fn positions_for_session(&self, session_id: SessionId) -> Result<Vec<Record>, StorageError> {
        self.find(EntityKind::Session, session_id.0)?;
        let key = Value::from(session_id.0);
        Ok(self.positions.filter_by("session_id", &key).cloned().collect())
    }

    pub fn contract_templates_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<Record>, StorageError> {
        self.find(EntityKind::Session, session_id.0)?;
        let key = Value::from(session_id.0);
        Ok(self
            .contract_templates
            .filter_by("session_id", &key)
            .cloned()
            .collect())
    }

    pub fn assignment_ids_for_session(&self, session_id: SessionId) -> Option<Vec<AssignmentId>> {
        self.assignments_by_session
            .get(&session_id.0)
            .map(|ids| ids.iter().copied().map(AssignmentId).collect())
    }

    /// Assignments of a session, in index order.
    pub fn assignments_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<Record>, StorageError> {
        let ids = self
            .assignments_by_session
            .get(&session_id.0)
            .ok_or(StorageError::NotFound {
                entity: SESSION_RULES.entity,
                id: session_id.0,
            })?;
        Ok(ids
            .iter()
            .filter_map(|id| self.assignments.find(*id))
            .cloned()
            .collect())
    }

    fn session_of_position(&self, position_id: Option<i64>) -> Option<i64> {
        position_id
            .and_then(|id| self.positions.find(id))
            .and_then(|position| int_field(position, "session_id"))
    }

    fn require_reference(
        &self,
        candidate: &Record,
        field: &str,
        target: EntityKind,
    ) -> Result<(), StorageError> {
        let Some(value) = candidate.get(field) else {
            return Ok(());
        };
        if value.is_null() {
            return Ok(());
        }
        let exists = value
            .as_i64()
            .map(|id| self.collection(target).contains(id))
            .unwrap_or(false);
        if exists {
            Ok(())
        } else {
            Err(StorageError::Validation(format!(
                "{field} {value} does not refer to an existing {}",
                target.rules().entity
            )))
        }
    }

    fn check_references(&self, kind: EntityKind, candidate: &Record) -> Result<(), StorageError> {
        match kind {
            EntityKind::Session | EntityKind::Applicant => Ok(()),
            EntityKind::Position | EntityKind::ContractTemplate => {
                self.require_reference(candidate, "session_id", EntityKind::Session)
            }
            EntityKind::Assignment => {
                self.require_reference(candidate, "position_id", EntityKind::Position)?;
                self.require_reference(candidate, "applicant_id", EntityKind::Applicant)
            }
        }
    }

    /// Inserts (no id or unknown id) or updates (known id) one record.
    pub fn upsert(&mut self, kind: EntityKind, record: Record) -> Result<Record, StorageError> {
        let preview = self.collection(kind).preview(&record);
        self.check_references(kind, &preview)?;

        let outcome = match kind {
            EntityKind::Session => {
                let buckets = &mut self.assignments_by_session;
                self.sessions.upsert_with(record, |created| {
                    if let Some(id) = record_id(created) {
                        buckets.insert(id, Vec::new());
                    }
                })?
            }
            EntityKind::Position => self.positions.upsert(record)?,
            EntityKind::Applicant => self.applicants.upsert(record)?,
            EntityKind::ContractTemplate => self.contract_templates.upsert(record)?,
            EntityKind::Assignment => {
                let session = self.session_of_position(int_field(&preview, "position_id"));
                let buckets = &mut self.assignments_by_session;
                let outcome = self.assignments.upsert_with(record, |created| {
                    if let (Some(session), Some(id)) = (session, record_id(created)) {
                        buckets.entry(session).or_default().push(id);
                    }
                })?;
                if let Upserted::Updated { before, after } = &outcome {
                    self.reindex_moved_assignment(before, after);
                }
                outcome
            }
        };

        match &outcome {
            Upserted::Created(record) => {
                debug!(entity = kind.rules().entity, id = ?record_id(record), "created record")
            }
            Upserted::Updated { after, .. } => {
                debug!(entity = kind.rules().entity, id = ?record_id(after), "updated record")
            }
        }
        Ok(outcome.into_record())
    }

    fn reindex_moved_assignment(&mut self, before: &Record, after: &Record) {
        let from = self.session_of_position(int_field(before, "position_id"));
        let to = self.session_of_position(int_field(after, "position_id"));
        if from == to {
            return;
        }
        let Some(id) = record_id(after) else {
            return;
        };
        if let Some(bucket) = from.and_then(|s| self.assignments_by_session.get_mut(&s)) {
            bucket.retain(|existing| *existing != id);
        }
        if let Some(session) = to {
            self.assignments_by_session
                .entry(session)
                .or_default()
                .push(id);
        }
    }

    fn ensure_no_dependents(
        &self,
        kind: EntityKind,
        id: i64,
        dependents: &[(EntityKind, &str)],
    ) -> Result<(), StorageError> {
        let key = Value::from(id);
        for (dependent, field) in dependents {
            let count = self.collection(*dependent).filter_by(field, &key).count();
            if count > 0 {
                return Err(StorageError::Validation(format!(
                    "{} {id} is still referenced by {count} {}(s)",
                    kind.rules().entity,
                    dependent.rules().entity
                )));
            }
        }
        Ok(())
    }

    /// Removes the record named by `record.id` and purges it from every index.
    pub fn delete(&mut self, kind: EntityKind, record: &Record) -> Result<Record, StorageError> {
        let id = record_id(record).ok_or_else(|| {
            StorageError::Validation(format!("{} delete requires an id", kind.rules().entity))
        })?;
        self.find(kind, id)?;

        let deleted = match kind {
            EntityKind::Session => {
                self.ensure_no_dependents(
                    kind,
                    id,
                    &[
                        (EntityKind::Position, "session_id"),
                        (EntityKind::ContractTemplate, "session_id"),
                    ],
                )?;
                let deleted = self.sessions.delete(id)?;
                self.assignments_by_session.remove(&id);
                deleted
            }
            EntityKind::Position => {
                self.ensure_no_dependents(kind, id, &[(EntityKind::Assignment, "position_id")])?;
                self.positions.delete(id)?
            }
            EntityKind::Applicant => {
                self.ensure_no_dependents(kind, id, &[(EntityKind::Assignment, "applicant_id")])?;
                self.applicants.delete(id)?
            }
            EntityKind::Assignment => {
                let deleted = self.assignments.delete(id)?;
                for bucket in self.assignments_by_session.values_mut() {
                    bucket.retain(|existing| *existing != id);
                }
                deleted
            }
            EntityKind::ContractTemplate => self.contract_templates.delete(id)?,
        };
        debug!(entity = kind.rules().entity, id, "deleted record");
        Ok(deleted)
    }

    /// The session → assignment index as primary data says it should be.
    fn derive_index(&self) -> BTreeMap<i64, Vec<i64>> {
        let mut index: BTreeMap<i64, Vec<i64>> = self
            .sessions
            .find_all()
            .iter()
            .filter_map(record_id)
            .map(|id| (id, Vec::new()))
            .collect();
        for assignment in self.assignments.find_all() {
            let session = self.session_of_position(int_field(assignment, "position_id"));
            if let (Some(session), Some(id)) = (session, record_id(assignment)) {
                index.entry(session).or_default().push(id);
            }
        }
        index
    }

    /// Verifies foreign keys and that the index matches primary data.
    pub fn check_integrity(&self) -> Result<(), StorageError> {
        for kind in EntityKind::ALL {
            for record in self.find_all(kind) {
                self.check_references(kind, record)
                    .map_err(|e| StorageError::Integrity(e.to_string()))?;
            }
        }

        let derived = self.derive_index();
        if let Some(stray) = self
            .assignments_by_session
            .keys()
            .find(|id| !derived.contains_key(*id))
        {
            return Err(StorageError::Integrity(format!(
                "assignments_by_session has a bucket for unknown session {stray}"
            )));
        }
        for (session_id, expected) in derived {
            let Some(actual) = self.assignments_by_session.get(&session_id) else {
                return Err(StorageError::Integrity(format!(
                    "assignments_by_session has no bucket for session {session_id}"
                )));
            };
            let mut expected = expected;
            let mut actual = actual.clone();
            expected.sort_unstable();
            actual.sort_unstable();
            if expected != actual {
                return Err(StorageError::Integrity(format!(
                    "assignments_by_session[{session_id}] is {actual:?}, expected {expected:?}"
                )));
            }
        }
        Ok(())
    }

    pub fn export(&self) -> Value {
        let file = DatasetFile {
            sessions: self.sessions.find_all().to_vec(),
            positions: self.positions.find_all().to_vec(),
            applicants: self.applicants.find_all().to_vec(),
            assignments: self.assignments.find_all().to_vec(),
            contract_templates: self.contract_templates.find_all().to_vec(),
            assignments_by_session: self.assignments_by_session.clone(),
        };
        serde_json::to_value(file).unwrap_or(Value::Null)
    }

    /// Loads a dataset, re-checking every rule. A supplied index must agree
    /// with primary data; an omitted one is derived.
    pub fn import(value: Value) -> Result<Self, StorageError> {
        let file: DatasetFile =
            serde_json::from_value(value).map_err(|e| StorageError::Fixture(e.to_string()))?;
        let supplied_index = file.assignments_by_session;

        let mut repo = Self {
            sessions: Collection::from_records(EntityKind::Session.rules(), file.sessions)?,
            positions: Collection::from_records(EntityKind::Position.rules(), file.positions)?,
            applicants: Collection::from_records(EntityKind::Applicant.rules(), file.applicants)?,
            assignments: Collection::from_records(
                EntityKind::Assignment.rules(),
                file.assignments,
            )?,
            contract_templates: Collection::from_records(
                EntityKind::ContractTemplate.rules(),
                file.contract_templates,
            )?,
            assignments_by_session: BTreeMap::new(),
        };

        repo.assignments_by_session = if supplied_index.is_empty() {
            repo.derive_index()
        } else {
            supplied_index
        };
        let session_ids: Vec<i64> = repo.sessions.find_all().iter().filter_map(record_id).collect();
        for session_id in session_ids {
            repo.assignments_by_session.entry(session_id).or_default();
        }
        repo.check_integrity()?;
        Ok(repo)
    }
}

#[cfg(test)]
#[path = "tests/repository_tests.rs"]
mod tests;
