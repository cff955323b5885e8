use serde_json::Value;

use crate::{Record, StorageError};

/// A composite unique constraint, optionally scoped to a parent id field.
#[derive(Debug)]
pub struct UniqueKey {
    pub fields: &'static [&'static str],
    pub scope: Option<&'static str>,
}

/// JSON type a typed field must hold when it is present and not null.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Integer,
}

impl ValueKind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            ValueKind::String => value.is_string(),
            ValueKind::Integer => value.is_i64() || value.is_u64(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            ValueKind::String => "a string",
            ValueKind::Integer => "an integer",
        }
    }
}

/// Write rules enforced by a [`Collection`] on every create and update.
#[derive(Debug)]
pub struct EntityRules {
    pub entity: &'static str,
    pub required: &'static [&'static str],
    pub typed: &'static [(&'static str, ValueKind)],
    pub unique: &'static [UniqueKey],
    pub immutable: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq)]
pub enum Upserted {
    Created(Record),
    Updated { before: Record, after: Record },
}

impl Upserted {
    pub fn record(&self) -> &Record {
        match self {
            Upserted::Created(record) => record,
            Upserted::Updated { after, .. } => after,
        }
    }

    pub fn into_record(self) -> Record {
        match self {
            Upserted::Created(record) => record,
            Upserted::Updated { after, .. } => after,
        }
    }
}

/// Ordered records of one entity type, guarded by its [`EntityRules`].
#[derive(Debug, Clone)]
pub struct Collection {
    rules: &'static EntityRules,
    records: Vec<Record>,
    next_id: i64,
}

pub fn record_id(record: &Record) -> Option<i64> {
    record.get("id").and_then(Value::as_i64)
}

pub(crate) fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

impl Collection {
    pub fn new(rules: &'static EntityRules) -> Self {
        Self {
            rules,
            records: Vec::new(),
            next_id: 1,
        }
    }

    /// Rebuilds a collection from stored records, re-checking every rule.
    pub fn from_records(
        rules: &'static EntityRules,
        records: Vec<Record>,
    ) -> Result<Self, StorageError> {
        let mut collection = Self::new(rules);
        for record in records {
            let id = record_id(&record).ok_or_else(|| {
                StorageError::Fixture(format!("{} record without an integer id", rules.entity))
            })?;
            if collection.contains(id) {
                return Err(StorageError::Fixture(format!(
                    "duplicate {} id {id}",
                    rules.entity
                )));
            }
            collection.validate_new(&record)?;
            collection.next_id = collection.next_id.max(id + 1);
            collection.records.push(record);
        }
        Ok(collection)
    }

    pub fn rules(&self) -> &'static EntityRules {
        self.rules
    }

    pub fn find_all(&self) -> &[Record] {
        &self.records
    }

    pub fn find(&self, id: i64) -> Option<&Record> {
        self.records.iter().find(|r| record_id(r) == Some(id))
    }

    pub fn contains(&self, id: i64) -> bool {
        self.find(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn filter_by<'a>(
        &'a self,
        field: &'a str,
        value: &'a Value,
    ) -> impl Iterator<Item = &'a Record> + 'a {
        self.records
            .iter()
            .filter(move |r| r.get(field) == Some(value))
    }

    /// What the stored record would look like if `record` were upserted.
    pub fn preview(&self, record: &Record) -> Record {
        match record_id(record).and_then(|id| self.find(id)) {
            Some(existing) => {
                let mut merged = existing.clone();
                for (k, v) in record {
                    merged.insert(k.clone(), v.clone());
                }
                merged
            }
            None => {
                let mut fresh = record.clone();
                fresh.remove("id");
                fresh
            }
        }
    }

    pub fn validate_new(&self, record: &Record) -> Result<(), StorageError> {
        let missing: Vec<&str> = self
            .rules
            .required
            .iter()
            .copied()
            .filter(|field| is_missing(record.get(*field)))
            .collect();
        if !missing.is_empty() {
            return Err(StorageError::Validation(format!(
                "{} is missing required field(s): {}",
                self.rules.entity,
                missing.join(", ")
            )));
        }
        for (field, value) in record {
            self.check_kind(field, value)?;
        }

        for key in self.rules.unique {
            if let Some(message) = self.conflict(key, record, None) {
                return Err(StorageError::Validation(message));
            }
        }
        Ok(())
    }

    /// Checks one changed property of record `id`; `merged` is the record as
    /// it would be stored after the whole update.
    pub fn validate_prop(
        &self,
        prop: &str,
        value: &Value,
        id: i64,
        merged: &Record,
    ) -> Result<(), StorageError> {
        if self.rules.immutable.contains(&prop) {
            return Err(StorageError::Validation(format!(
                "{} field {prop} cannot be changed",
                self.rules.entity
            )));
        }
        if self.rules.required.contains(&prop) && is_missing(Some(value)) {
            return Err(StorageError::Validation(format!(
                "{} field {prop} cannot be empty",
                self.rules.entity
            )));
        }
        self.check_kind(prop, value)?;
        for key in self.rules.unique {
            let touches = key.fields.contains(&prop) || key.scope == Some(prop);
            if !touches {
                continue;
            }
            if let Some(message) = self.conflict(key, merged, Some(id)) {
                return Err(StorageError::Validation(message));
            }
        }
        Ok(())
    }

    fn check_kind(&self, field: &str, value: &Value) -> Result<(), StorageError> {
        let Some((_, kind)) = self.rules.typed.iter().find(|(name, _)| *name == field) else {
            return Ok(());
        };
        if value.is_null() || kind.accepts(value) {
            return Ok(());
        }
        Err(StorageError::Validation(format!(
            "{} field {field} must be {}",
            self.rules.entity,
            kind.describe()
        )))
    }

    fn conflict(&self, key: &UniqueKey, candidate: &Record, exclude: Option<i64>) -> Option<String> {
        if key.fields.iter().any(|f| is_missing(candidate.get(*f))) {
            return None;
        }
        let scope_value = key.scope.map(|scope| candidate.get(scope));

        let clash = self
            .records
            .iter()
            .filter(|r| exclude.is_none() || record_id(r) != exclude)
            .filter(|r| match (key.scope, scope_value) {
                (Some(scope), Some(value)) => r.get(scope) == value,
                _ => true,
            })
            .any(|r| key.fields.iter().all(|f| r.get(*f) == candidate.get(*f)));
        if !clash {
            return None;
        }

        let fields = key
            .fields
            .iter()
            .map(|f| format!("{f} = {}", candidate.get(*f).unwrap_or(&Value::Null)))
            .collect::<Vec<_>>()
            .join(" and ");
        let scope = match (key.scope, scope_value.flatten()) {
            (Some(scope), Some(value)) => format!(" in {scope} = {value}"),
            _ => String::new(),
        };
        Some(format!(
            "another {} already has {fields}{scope}",
            self.rules.entity
        ))
    }

    /// Creates when the id is absent or unknown, otherwise updates in place.
    ///
    /// `on_create` runs after the new record is appended. An update either
    /// applies every supplied field or none of them.
    pub fn upsert_with(
        &mut self,
        record: Record,
        on_create: impl FnOnce(&Record),
    ) -> Result<Upserted, StorageError> {
        let existing = record_id(&record).and_then(|id| {
            self.records
                .iter()
                .position(|r| record_id(r) == Some(id))
                .map(|index| (id, index))
        });

        let Some((id, index)) = existing else {
            let mut fresh = record;
            fresh.remove("id");
            self.validate_new(&fresh)?;
            let id = self.next_id;
            self.next_id += 1;
            fresh.insert("id".into(), Value::from(id));
            self.records.push(fresh.clone());
            on_create(&fresh);
            return Ok(Upserted::Created(fresh));
        };

        let before = self.records[index].clone();
        let merged = self.preview(&record);
        for (prop, value) in &record {
            if prop == "id" || before.get(prop) == Some(value) {
                continue;
            }
            self.validate_prop(prop, value, id, &merged)?;
        }
        self.records[index] = merged.clone();
        Ok(Upserted::Updated {
            before,
            after: merged,
        })
    }

    pub fn upsert(&mut self, record: Record) -> Result<Upserted, StorageError> {
        self.upsert_with(record, |_| {})
    }

    pub fn delete(&mut self, id: i64) -> Result<Record, StorageError> {
        let index = self
            .records
            .iter()
            .position(|r| record_id(r) == Some(id))
            .ok_or(StorageError::NotFound {
                entity: self.rules.entity,
                id,
            })?;
        Ok(self.records.remove(index))
    }
}

#[cfg(test)]
#[path = "tests/collection_tests.rs"]
mod tests;
