//! Dispatchers and plain action creators, one module per entity.
//!
//! Every dispatcher reads the active role (and, for session-scoped
//! listings, the active session) when it runs, sends a wire-shape body and
//! ends with exactly one success dispatch.

use anyhow::{anyhow, Context};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::domain::{IdOnly, Role, SessionId};
use tracing::debug;

use crate::{
    flatten::{flatten_all, FlattenId},
    pipeline::{DispatchContext, FieldKind, FieldSpec, PayloadContract, ValidatedDispatcher},
    selectors::active_session_selector,
    store::{Action, Keyed, ModelAction},
};

pub mod applicants;
pub mod assignments;
pub mod contract_templates;
pub mod errors;
pub mod positions;
pub mod sessions;
pub mod users;

use errors::{delete_error, fetch_error, upsert_error};

/// Payload of every delete and single-record fetch.
pub const ID_REQUIRED: PayloadContract =
    PayloadContract::new(&[FieldSpec::required("id", FieldKind::Integer)]);

pub(crate) enum ListRoute {
    Global(fn(Role) -> String),
    PerSession(fn(Role, SessionId) -> String),
}

/// Routes and store wiring of one entity type.
pub(crate) struct Endpoints<T> {
    pub entity: &'static str,
    pub list: ListRoute,
    pub upsert: fn(Role) -> String,
    pub delete: fn(Role) -> String,
    pub wrap: fn(ModelAction<T>) -> Action,
    pub flatten: &'static [FlattenId],
}

pub(crate) fn active_session_id(ctx: &DispatchContext) -> anyhow::Result<SessionId> {
    active_session_selector(&ctx.state())
        .map(|session| session.id)
        .ok_or_else(|| anyhow!("no active session selected"))
}

/// Reads the `id` of a payload that passed [`ID_REQUIRED`].
pub(crate) fn id_only(payload: &Value) -> anyhow::Result<IdOnly> {
    let id = payload["id"].as_i64().context("id must be an integer")?;
    Ok(IdOnly { id })
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value, what: &str) -> anyhow::Result<T> {
    serde_json::from_value(value).with_context(|| format!("malformed {what} in response"))
}

/// Listing path under the current role and, when scoped, active session.
pub(crate) fn list_path<T>(
    endpoints: &Endpoints<T>,
    ctx: &DispatchContext,
) -> anyhow::Result<String> {
    let role = ctx.role();
    Ok(match endpoints.list {
        ListRoute::Global(route) => route(role),
        ListRoute::PerSession(route) => route(role, active_session_id(ctx)?),
    })
}

/// Replaces the whole slice with a fresh listing.
///
/// Calls resolving to the same path share one request. A listing whose path
/// no longer matches the current role and active session is discarded.
pub(crate) fn fetch_all<T>(
    name: &'static str,
    description: &'static str,
    endpoints: &'static Endpoints<T>,
) -> ValidatedDispatcher
where
    T: DeserializeOwned + Send + 'static,
{
    ValidatedDispatcher::new(name, description, fetch_error, move |_payload, ctx| async move {
        let path = list_path(endpoints, &ctx)?;
        let data = ctx.transport().get(&path).await?;
        let records: Vec<T> = decode(data, endpoints.entity)?;
        if list_path(endpoints, &ctx).ok().as_deref() != Some(path.as_str()) {
            debug!(operation = name, %path, "discarding listing for an inactive target");
            return Ok(());
        }
        ctx.dispatch((endpoints.wrap)(ModelAction::ReplaceAll(records)));
        Ok(())
    })
    .single_flight(move |_payload, ctx| list_path(endpoints, ctx))
}

pub(crate) fn upsert_one<T>(
    name: &'static str,
    description: &'static str,
    endpoints: &'static Endpoints<T>,
) -> ValidatedDispatcher
where
    T: DeserializeOwned + Send + 'static,
{
    ValidatedDispatcher::new(name, description, upsert_error, move |payload, ctx| async move {
        let body = flatten_all(payload, endpoints.flatten);
        let data = ctx.transport().post(&(endpoints.upsert)(ctx.role()), body).await?;
        let record: T = decode(data, endpoints.entity)?;
        ctx.dispatch((endpoints.wrap)(ModelAction::UpsertOne(record)));
        Ok(())
    })
}

pub(crate) fn delete_one<T>(
    name: &'static str,
    description: &'static str,
    endpoints: &'static Endpoints<T>,
) -> ValidatedDispatcher
where
    T: DeserializeOwned + Keyed + Send + 'static,
{
    ValidatedDispatcher::new(name, description, delete_error, move |payload, ctx| async move {
        let body = serde_json::to_value(id_only(&payload)?)?;
        let data = ctx.transport().post(&(endpoints.delete)(ctx.role()), body).await?;
        let record: T = decode(data, endpoints.entity)?;
        ctx.dispatch((endpoints.wrap)(ModelAction::DeleteOne(record.key())));
        Ok(())
    })
    .with_contract(ID_REQUIRED)
}

/// Every dispatcher the client exposes.
#[derive(Debug, Clone)]
pub struct Dispatchers {
    pub fetch_sessions: ValidatedDispatcher,
    pub upsert_session: ValidatedDispatcher,
    pub delete_session: ValidatedDispatcher,
    pub fetch_positions: ValidatedDispatcher,
    pub upsert_position: ValidatedDispatcher,
    pub delete_position: ValidatedDispatcher,
    pub fetch_applicants: ValidatedDispatcher,
    pub upsert_applicant: ValidatedDispatcher,
    pub delete_applicant: ValidatedDispatcher,
    pub fetch_assignments: ValidatedDispatcher,
    pub fetch_assignment: ValidatedDispatcher,
    pub upsert_assignment: ValidatedDispatcher,
    pub delete_assignment: ValidatedDispatcher,
    pub fetch_contract_templates: ValidatedDispatcher,
    pub upsert_contract_template: ValidatedDispatcher,
    pub delete_contract_template: ValidatedDispatcher,
}

impl Default for Dispatchers {
    fn default() -> Self {
        Self {
            fetch_sessions: sessions::fetch_sessions(),
            upsert_session: sessions::upsert_session(),
            delete_session: sessions::delete_session(),
            fetch_positions: positions::fetch_positions(),
            upsert_position: positions::upsert_position(),
            delete_position: positions::delete_position(),
            fetch_applicants: applicants::fetch_applicants(),
            upsert_applicant: applicants::upsert_applicant(),
            delete_applicant: applicants::delete_applicant(),
            fetch_assignments: assignments::fetch_assignments(),
            fetch_assignment: assignments::fetch_assignment(),
            upsert_assignment: assignments::upsert_assignment(),
            delete_assignment: assignments::delete_assignment(),
            fetch_contract_templates: contract_templates::fetch_contract_templates(),
            upsert_contract_template: contract_templates::upsert_contract_template(),
            delete_contract_template: contract_templates::delete_contract_template(),
        }
    }
}

impl Dispatchers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> [&ValidatedDispatcher; 16] {
        [
            &self.fetch_sessions,
            &self.upsert_session,
            &self.delete_session,
            &self.fetch_positions,
            &self.upsert_position,
            &self.delete_position,
            &self.fetch_applicants,
            &self.upsert_applicant,
            &self.delete_applicant,
            &self.fetch_assignments,
            &self.fetch_assignment,
            &self.upsert_assignment,
            &self.delete_assignment,
            &self.fetch_contract_templates,
            &self.upsert_contract_template,
            &self.delete_contract_template,
        ]
    }

    pub fn find(&self, name: &str) -> Option<&ValidatedDispatcher> {
        self.all().into_iter().find(|dispatcher| dispatcher.name() == name)
    }
}

#[cfg(test)]
#[path = "../tests/actions_tests.rs"]
mod tests;
