//! Mock backend API.
//!
//! Every operation here takes wire-shape JSON, runs it through the
//! [`storage`] emulator and answers with wire-shape JSON or an [`ApiError`].

use serde_json::Value;
use shared::{
    domain::{AssignmentId, IdOnly, SessionId},
    error::{ApiError, ErrorCode},
};
use storage::{EntityKind, Record, Storage, StorageError};

pub mod docs;
pub mod mock_transport;
pub mod router;

pub use docs::{RouteDoc, ROUTES};
pub use mock_transport::MockTransport;
pub use router::build_router;

#[derive(Clone, Default)]
pub struct ApiContext {
    pub storage: Storage,
}

impl ApiContext {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

pub fn list(ctx: &ApiContext, kind: EntityKind) -> Vec<Record> {
    ctx.storage.find_all(kind)
}

pub fn upsert(ctx: &ApiContext, kind: EntityKind, body: Value) -> Result<Record, ApiError> {
    let record = into_record(body)?;
    ctx.storage.upsert(kind, record).map_err(storage_error)
}

/// Deletes the record named by an `{id}` body.
pub fn delete(ctx: &ApiContext, kind: EntityKind, body: Value) -> Result<Record, ApiError> {
    let IdOnly { id } =
        serde_json::from_value(Value::Object(into_record(body)?)).map_err(|err| {
            ApiError::new(ErrorCode::Validation, format!("invalid delete body: {err}"))
        })?;
    let mut target = Record::new();
    target.insert("id".into(), Value::from(id));
    ctx.storage.delete(kind, &target).map_err(storage_error)
}

pub fn list_session_positions(
    ctx: &ApiContext,
    session_id: SessionId,
) -> Result<Vec<Record>, ApiError> {
    ctx.storage
        .positions_for_session(session_id)
        .map_err(storage_error)
}

pub fn list_session_assignments(
    ctx: &ApiContext,
    session_id: SessionId,
) -> Result<Vec<Record>, ApiError> {
    ctx.storage
        .assignments_for_session(session_id)
        .map_err(storage_error)
}

pub fn list_session_contract_templates(
    ctx: &ApiContext,
    session_id: SessionId,
) -> Result<Vec<Record>, ApiError> {
    ctx.storage
        .contract_templates_for_session(session_id)
        .map_err(storage_error)
}

pub fn get_assignment(ctx: &ApiContext, assignment_id: AssignmentId) -> Result<Record, ApiError> {
    ctx.storage
        .find(EntityKind::Assignment, assignment_id.0)
        .map_err(storage_error)
}

fn into_record(body: Value) -> Result<Record, ApiError> {
    match body {
        Value::Object(record) => Ok(record),
        other => Err(ApiError::new(
            ErrorCode::BadRequest,
            format!("request body must be a JSON object, got {}", json_kind(&other)),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub fn storage_error(err: StorageError) -> ApiError {
    let code = match &err {
        StorageError::Validation(_) => ErrorCode::Validation,
        StorageError::NotFound { .. } => ErrorCode::NotFound,
        StorageError::Fixture(_) | StorageError::Integrity(_) => ErrorCode::Internal,
    };
    ApiError::new(code, err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
