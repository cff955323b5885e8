use serde::Serialize;

/// One entry of the table served at `GET /docs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteDoc {
    pub method: &'static str,
    pub path: &'static str,
    pub summary: &'static str,
}

const fn route(method: &'static str, path: &'static str, summary: &'static str) -> RouteDoc {
    RouteDoc {
        method,
        path,
        summary,
    }
}

pub const ROUTES: &[RouteDoc] = &[
    route("GET", "/healthz", "Liveness probe; answers `ok`."),
    route("GET", "/docs", "This table."),
    route("GET", "/{role}/sessions", "List every session."),
    route("GET", "/sessions", "List every session (role-less alias)."),
    route(
        "POST",
        "/{role}/sessions",
        "Create a session, or update it when `id` names an existing one.",
    ),
    route("POST", "/sessions", "Upsert a session (role-less alias)."),
    route(
        "POST",
        "/{role}/sessions/delete",
        "Delete the session named by `{id}`; refused while positions or templates remain.",
    ),
    route("POST", "/sessions/delete", "Delete a session (role-less alias)."),
    route(
        "GET",
        "/{role}/sessions/{session_id}/positions",
        "List the positions of one session.",
    ),
    route(
        "POST",
        "/{role}/positions",
        "Upsert a position; `position_code` is unique within its session.",
    ),
    route(
        "POST",
        "/{role}/positions/delete",
        "Delete a position; refused while assignments reference it.",
    ),
    route("GET", "/{role}/applicants", "List every applicant."),
    route(
        "POST",
        "/{role}/applicants",
        "Upsert an applicant; `utorid` is globally unique.",
    ),
    route(
        "POST",
        "/{role}/applicants/delete",
        "Delete an applicant; refused while assignments reference it.",
    ),
    route(
        "GET",
        "/{role}/sessions/{session_id}/assignments",
        "List the assignments of one session, in index order.",
    ),
    route(
        "GET",
        "/{role}/assignments/{assignment_id}",
        "Fetch one assignment.",
    ),
    route(
        "POST",
        "/{role}/assignments",
        "Upsert an assignment (wire shape); each position/applicant pair appears once.",
    ),
    route(
        "POST",
        "/{role}/assignments/delete",
        "Delete an assignment and drop it from its session index.",
    ),
    route(
        "GET",
        "/{role}/sessions/{session_id}/contract_templates",
        "List the contract templates of one session.",
    ),
    route(
        "POST",
        "/{role}/contract_templates",
        "Upsert a contract template; `template_name` is unique within its session.",
    ),
    route(
        "POST",
        "/{role}/contract_templates/delete",
        "Delete a contract template.",
    ),
];
