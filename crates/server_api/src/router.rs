use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use shared::{
    domain::{AssignmentId, Role, SessionId},
    error::{ApiError, ErrorCode},
};
use storage::{EntityKind, Record};
use tracing::debug;

use crate::{docs::RouteDoc, ApiContext, ROUTES};

type HttpResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

/// Registers the full route grammar over one shared dataset.
pub fn build_router(ctx: ApiContext) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/docs", get(docs))
        .route("/sessions", get(list_sessions).post(upsert_session))
        .route("/sessions/delete", post(delete_session))
        .route(
            "/:role/sessions",
            get(list_sessions_as).post(upsert_session_as),
        )
        .route("/:role/sessions/delete", post(delete_session_as))
        .route(
            "/:role/sessions/:session_id/positions",
            get(list_session_positions),
        )
        .route(
            "/:role/sessions/:session_id/assignments",
            get(list_session_assignments),
        )
        .route(
            "/:role/sessions/:session_id/contract_templates",
            get(list_session_contract_templates),
        )
        .route("/:role/positions", post(upsert_position))
        .route("/:role/positions/delete", post(delete_position))
        .route(
            "/:role/applicants",
            get(list_applicants).post(upsert_applicant),
        )
        .route("/:role/applicants/delete", post(delete_applicant))
        .route("/:role/assignments", post(upsert_assignment))
        .route("/:role/assignments/delete", post(delete_assignment))
        .route("/:role/assignments/:assignment_id", get(get_assignment))
        .route("/:role/contract_templates", post(upsert_contract_template))
        .route(
            "/:role/contract_templates/delete",
            post(delete_contract_template),
        )
        .with_state(ctx)
}

pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn respond<T: Serialize>(result: Result<T, ApiError>) -> HttpResult<T> {
    result
        .map(Json)
        .map_err(|error| (status_for(error.code), Json(error)))
}

fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        ApiError::new(ErrorCode::BadRequest, format!("malformed JSON body: {e}"))
    })
}

fn upsert_as(ctx: &ApiContext, role: Role, kind: EntityKind, body: Bytes) -> HttpResult<Record> {
    debug!(%role, collection = kind.collection_name(), "upsert request");
    respond(parse_body(&body).and_then(|body| crate::upsert(ctx, kind, body)))
}

fn delete_as(ctx: &ApiContext, role: Role, kind: EntityKind, body: Bytes) -> HttpResult<Record> {
    debug!(%role, collection = kind.collection_name(), "delete request");
    respond(parse_body(&body).and_then(|body| crate::delete(ctx, kind, body)))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn docs() -> Json<&'static [RouteDoc]> {
    Json(ROUTES)
}

async fn list_sessions(State(ctx): State<ApiContext>) -> Json<Vec<Record>> {
    Json(crate::list(&ctx, EntityKind::Session))
}

async fn list_sessions_as(
    State(ctx): State<ApiContext>,
    Path(role): Path<Role>,
) -> Json<Vec<Record>> {
    debug!(%role, "list sessions");
    Json(crate::list(&ctx, EntityKind::Session))
}

async fn upsert_session(State(ctx): State<ApiContext>, body: Bytes) -> HttpResult<Record> {
    upsert_as(&ctx, Role::default(), EntityKind::Session, body)
}

async fn upsert_session_as(
    State(ctx): State<ApiContext>,
    Path(role): Path<Role>,
    body: Bytes,
) -> HttpResult<Record> {
    upsert_as(&ctx, role, EntityKind::Session, body)
}

async fn delete_session(State(ctx): State<ApiContext>, body: Bytes) -> HttpResult<Record> {
    delete_as(&ctx, Role::default(), EntityKind::Session, body)
}

async fn delete_session_as(
    State(ctx): State<ApiContext>,
    Path(role): Path<Role>,
    body: Bytes,
) -> HttpResult<Record> {
    delete_as(&ctx, role, EntityKind::Session, body)
}

async fn list_session_positions(
    State(ctx): State<ApiContext>,
    Path((role, session_id)): Path<(Role, i64)>,
) -> HttpResult<Vec<Record>> {
    debug!(%role, session_id, "list positions");
    respond(crate::list_session_positions(&ctx, SessionId(session_id)))
}

async fn list_session_assignments(
    State(ctx): State<ApiContext>,
    Path((role, session_id)): Path<(Role, i64)>,
) -> HttpResult<Vec<Record>> {
    debug!(%role, session_id, "list assignments");
    respond(crate::list_session_assignments(&ctx, SessionId(session_id)))
}

async fn list_session_contract_templates(
    State(ctx): State<ApiContext>,
    Path((role, session_id)): Path<(Role, i64)>,
) -> HttpResult<Vec<Record>> {
    debug!(%role, session_id, "list contract templates");
    respond(crate::list_session_contract_templates(
        &ctx,
        SessionId(session_id),
    ))
}

async fn upsert_position(
    State(ctx): State<ApiContext>,
    Path(role): Path<Role>,
    body: Bytes,
) -> HttpResult<Record> {
    upsert_as(&ctx, role, EntityKind::Position, body)
}

async fn delete_position(
    State(ctx): State<ApiContext>,
    Path(role): Path<Role>,
    body: Bytes,
) -> HttpResult<Record> {
    delete_as(&ctx, role, EntityKind::Position, body)
}

async fn list_applicants(
    State(ctx): State<ApiContext>,
    Path(role): Path<Role>,
) -> Json<Vec<Record>> {
    debug!(%role, "list applicants");
    Json(crate::list(&ctx, EntityKind::Applicant))
}

async fn upsert_applicant(
    State(ctx): State<ApiContext>,
    Path(role): Path<Role>,
    body: Bytes,
) -> HttpResult<Record> {
    upsert_as(&ctx, role, EntityKind::Applicant, body)
}

async fn delete_applicant(
    State(ctx): State<ApiContext>,
    Path(role): Path<Role>,
    body: Bytes,
) -> HttpResult<Record> {
    delete_as(&ctx, role, EntityKind::Applicant, body)
}

async fn get_assignment(
    State(ctx): State<ApiContext>,
    Path((role, assignment_id)): Path<(Role, i64)>,
) -> HttpResult<Record> {
    debug!(%role, assignment_id, "get assignment");
    respond(crate::get_assignment(&ctx, AssignmentId(assignment_id)))
}

async fn upsert_assignment(
    State(ctx): State<ApiContext>,
    Path(role): Path<Role>,
    body: Bytes,
) -> HttpResult<Record> {
    upsert_as(&ctx, role, EntityKind::Assignment, body)
}

async fn delete_assignment(
    State(ctx): State<ApiContext>,
    Path(role): Path<Role>,
    body: Bytes,
) -> HttpResult<Record> {
    delete_as(&ctx, role, EntityKind::Assignment, body)
}

async fn upsert_contract_template(
    State(ctx): State<ApiContext>,
    Path(role): Path<Role>,
    body: Bytes,
) -> HttpResult<Record> {
    upsert_as(&ctx, role, EntityKind::ContractTemplate, body)
}

async fn delete_contract_template(
    State(ctx): State<ApiContext>,
    Path(role): Path<Role>,
    body: Bytes,
) -> HttpResult<Record> {
    delete_as(&ctx, role, EntityKind::ContractTemplate, body)
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;
