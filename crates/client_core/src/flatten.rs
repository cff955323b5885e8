use serde_json::Value;

/// Rewrites one nested relation of a view-shape payload into its scalar
/// foreign key, e.g. `{"applicant": {"id": 3, ..}}` into `{"applicant_id": 3}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlattenId {
    pub field: &'static str,
    pub id_field: &'static str,
}

impl FlattenId {
    pub const fn new(field: &'static str, id_field: &'static str) -> Self {
        Self { field, id_field }
    }

    /// No-op unless `field` holds an object. A nested object without an id
    /// is dropped without setting `id_field`.
    pub fn apply(&self, mut payload: Value) -> Value {
        let Some(object) = payload.as_object_mut() else {
            return payload;
        };
        if !object.get(self.field).is_some_and(Value::is_object) {
            return payload;
        }
        if let Some(Value::Object(nested)) = object.remove(self.field) {
            if let Some(id) = nested.get("id").filter(|id| !id.is_null()) {
                object.insert(self.id_field.to_string(), id.clone());
            }
        }
        payload
    }
}

/// Applies every translation in turn; order does not matter as long as the
/// fields are distinct.
pub fn flatten_all(payload: Value, translations: &[FlattenId]) -> Value {
    translations
        .iter()
        .fold(payload, |payload, translation| translation.apply(payload))
}

#[cfg(test)]
#[path = "tests/flatten_tests.rs"]
mod tests;
