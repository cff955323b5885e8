use shared::{
    domain::{Session, SessionId},
    protocol::{sessions_delete_route, sessions_route},
};

use super::{delete_one, fetch_all, upsert_one, Endpoints, ListRoute};
use crate::{pipeline::ValidatedDispatcher, store::Action};

static SESSIONS: Endpoints<Session> = Endpoints {
    entity: "sessions",
    list: ListRoute::Global(sessions_route),
    upsert: sessions_route,
    delete: sessions_delete_route,
    wrap: Action::Sessions,
    flatten: &[],
};

pub fn fetch_sessions() -> ValidatedDispatcher {
    fetch_all("fetch_sessions", "Fetch sessions", &SESSIONS)
}

pub fn upsert_session() -> ValidatedDispatcher {
    upsert_one("upsert_session", "Add/update session", &SESSIONS)
}

pub fn delete_session() -> ValidatedDispatcher {
    delete_one("delete_session", "Delete session", &SESSIONS)
}

/// Selects a loaded session as the scope of positions, assignments and
/// contract templates.
pub fn set_active_session(session_id: Option<SessionId>) -> Action {
    Action::SetActiveSession(session_id)
}
