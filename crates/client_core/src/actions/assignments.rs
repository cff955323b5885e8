use serde_json::Value;
use shared::{
    domain::{Assignment, AssignmentId, IdOnly},
    protocol::{
        assignment_route, assignments_delete_route, assignments_route, session_assignments_route,
    },
};

use super::{
    decode, delete_one, errors::fetch_error, fetch_all, id_only, upsert_one, Endpoints,
    ListRoute, ID_REQUIRED,
};
use crate::{
    flatten::FlattenId,
    pipeline::{DispatchContext, ValidatedDispatcher},
    store::{Action, ModelAction},
};

/// View-shape relations of an assignment and their wire keys.
pub const ASSIGNMENT_RELATIONS: &[FlattenId] = &[
    FlattenId::new("applicant", "applicant_id"),
    FlattenId::new("position", "position_id"),
];

static ASSIGNMENTS: Endpoints<Assignment> = Endpoints {
    entity: "assignments",
    list: ListRoute::PerSession(session_assignments_route),
    upsert: assignments_route,
    delete: assignments_delete_route,
    wrap: Action::Assignments,
    flatten: ASSIGNMENT_RELATIONS,
};

pub fn fetch_assignments() -> ValidatedDispatcher {
    fetch_all(
        "fetch_assignments",
        "Fetch assignments of the active session",
        &ASSIGNMENTS,
    )
}

pub fn fetch_assignment() -> ValidatedDispatcher {
    ValidatedDispatcher::new(
        "fetch_assignment",
        "Fetch assignment",
        fetch_error,
        |payload, ctx| async move {
            let path = assignment_path(&payload, &ctx)?;
            let data = ctx.transport().get(&path).await?;
            let assignment: Assignment = decode(data, "assignment")?;
            ctx.dispatch(Action::Assignments(ModelAction::UpsertOne(assignment)));
            Ok(())
        },
    )
    .with_contract(ID_REQUIRED)
    .single_flight(assignment_path)
}

fn assignment_path(payload: &Value, ctx: &DispatchContext) -> anyhow::Result<String> {
    let IdOnly { id } = id_only(payload)?;
    Ok(assignment_route(ctx.role(), AssignmentId(id)))
}

pub fn upsert_assignment() -> ValidatedDispatcher {
    upsert_one("upsert_assignment", "Add/update assignment", &ASSIGNMENTS)
}

pub fn delete_assignment() -> ValidatedDispatcher {
    delete_one("delete_assignment", "Delete assignment", &ASSIGNMENTS)
}
