use shared::{
    domain::Position,
    protocol::{positions_delete_route, positions_route, session_positions_route},
};

use super::{delete_one, fetch_all, upsert_one, Endpoints, ListRoute};
use crate::{flatten::FlattenId, pipeline::ValidatedDispatcher, store::Action};

static POSITIONS: Endpoints<Position> = Endpoints {
    entity: "positions",
    list: ListRoute::PerSession(session_positions_route),
    upsert: positions_route,
    delete: positions_delete_route,
    wrap: Action::Positions,
    flatten: &[FlattenId::new("session", "session_id")],
};

pub fn fetch_positions() -> ValidatedDispatcher {
    fetch_all(
        "fetch_positions",
        "Fetch positions of the active session",
        &POSITIONS,
    )
}

pub fn upsert_position() -> ValidatedDispatcher {
    upsert_one("upsert_position", "Add/update position", &POSITIONS)
}

pub fn delete_position() -> ValidatedDispatcher {
    delete_one("delete_position", "Delete position", &POSITIONS)
}
