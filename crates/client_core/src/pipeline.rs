//! Dispatch pipeline.
//!
//! A [`ValidatedDispatcher`] wraps one async operation with a payload shape
//! check, a name and description for tooling, optional single-flight
//! coalescing, and uniform error reporting into the store.

use std::{
    collections::HashSet,
    fmt,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};

use futures::future::BoxFuture;
use serde_json::Value;
use shared::{domain::Role, transport::Transport};
use thiserror::Error;
use tracing::{debug, warn};

use crate::store::{Action, RootState, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Any,
    Integer,
    String,
    Object,
}

impl FieldKind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldKind::Any => true,
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::String => value.is_string(),
            FieldKind::Object => value.is_object(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            FieldKind::Any => "any value",
            FieldKind::Integer => "an integer",
            FieldKind::String => "a string",
            FieldKind::Object => "an object",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// Expected shape of a dispatcher payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadContract {
    fields: &'static [FieldSpec],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProblem {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid payload for {operation}: {}", join_problems(.problems))]
pub struct PayloadError {
    pub operation: &'static str,
    pub problems: Vec<FieldProblem>,
}

fn join_problems(problems: &[FieldProblem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl PayloadContract {
    pub const fn new(fields: &'static [FieldSpec]) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    /// Lists every field-level problem; empty means the payload conforms.
    pub fn problems(&self, payload: &Value) -> Vec<FieldProblem> {
        let Some(object) = payload.as_object() else {
            return vec![FieldProblem {
                field: "payload",
                message: "must be an object".into(),
            }];
        };
        self.fields
            .iter()
            .filter_map(|field| match object.get(field.name) {
                None | Some(Value::Null) if field.required => Some(FieldProblem {
                    field: field.name,
                    message: "is required".into(),
                }),
                None | Some(Value::Null) => None,
                Some(value) if !field.kind.accepts(value) => Some(FieldProblem {
                    field: field.name,
                    message: format!("must be {}", field.kind.describe()),
                }),
                Some(_) => None,
            })
            .collect()
    }
}

/// What a dispatcher sees of its environment.
///
/// State is read through [`DispatchContext::state`] at the moment it is
/// needed, so a dispatcher never acts on a snapshot taken before an await.
#[derive(Clone)]
pub struct DispatchContext {
    store: Store,
    transport: Arc<dyn Transport>,
}

impl DispatchContext {
    pub fn new(store: Store, transport: Arc<dyn Transport>) -> Self {
        Self { store, transport }
    }

    pub fn state(&self) -> Arc<RootState> {
        self.store.state()
    }

    pub fn role(&self) -> Role {
        self.store.state().users.active_role
    }

    pub fn dispatch(&self, action: Action) {
        self.store.dispatch(action);
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }
}

/// Result of one invocation, as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The dispatcher failed and the failure was reported to the store.
    Reported,
    /// An identical call was already in flight; nothing was issued.
    Coalesced,
}

pub type ErrorReporter = fn(String) -> Action;

type DispatchFn =
    dyn Fn(Value, DispatchContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;

/// Resolves the request a call would issue, e.g. the listing path under the
/// current role and active session. Identical keys share one flight.
type FlightKeyFn = dyn Fn(&Value, &DispatchContext) -> anyhow::Result<String> + Send + Sync;

#[derive(Clone)]
pub struct ValidatedDispatcher {
    name: &'static str,
    description: &'static str,
    contract: Option<PayloadContract>,
    on_error: ErrorReporter,
    flight_key: Option<Arc<FlightKeyFn>>,
    inflight: Arc<Mutex<HashSet<String>>>,
    dispatcher: Arc<DispatchFn>,
}

impl fmt::Debug for ValidatedDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedDispatcher")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("contract", &self.contract)
            .field("single_flight", &self.flight_key.is_some())
            .finish_non_exhaustive()
    }
}

impl ValidatedDispatcher {
    pub fn new<F, Fut>(
        name: &'static str,
        description: &'static str,
        on_error: ErrorReporter,
        dispatcher: F,
    ) -> Self
    where
        F: Fn(Value, DispatchContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name,
            description,
            contract: None,
            on_error,
            flight_key: None,
            inflight: Arc::default(),
            dispatcher: Arc::new(
                move |payload: Value, ctx: DispatchContext| -> BoxFuture<'static, anyhow::Result<()>> {
                    Box::pin(dispatcher(payload, ctx))
                },
            ),
        }
    }

    pub fn with_contract(mut self, contract: PayloadContract) -> Self {
        self.contract = Some(contract);
        self
    }

    /// Coalesces calls whose resolved key matches one already in flight.
    ///
    /// The key is computed when the call starts, after the contract check.
    /// Failing to resolve it is reported like any other dispatch failure.
    pub fn single_flight<K>(mut self, key: K) -> Self
    where
        K: Fn(&Value, &DispatchContext) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        self.flight_key = Some(Arc::new(key));
        self
    }

    pub fn is_single_flight(&self) -> bool {
        self.flight_key.is_some()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn contract(&self) -> Option<&PayloadContract> {
        self.contract.as_ref()
    }

    /// Runs the operation.
    ///
    /// Only a payload that breaks the contract is returned as an error, and
    /// it is returned before anything else happens. Failures of the
    /// operation itself go to the error reporter.
    pub async fn call(&self, ctx: &DispatchContext, payload: Value) -> Result<Outcome, PayloadError> {
        if let Some(contract) = &self.contract {
            let problems = contract.problems(&payload);
            if !problems.is_empty() {
                return Err(PayloadError {
                    operation: self.name,
                    problems,
                });
            }
        }

        let _guard = match &self.flight_key {
            None => None,
            Some(flight_key) => {
                let key = match flight_key(&payload, ctx) {
                    Ok(key) => key,
                    Err(err) => return Ok(self.report(ctx, err)),
                };
                match InflightGuard::acquire(&self.inflight, key) {
                    Some(guard) => Some(guard),
                    None => {
                        debug!(operation = self.name, "identical dispatch already in flight");
                        return Ok(Outcome::Coalesced);
                    }
                }
            }
        };

        match (self.dispatcher)(payload, ctx.clone()).await {
            Ok(()) => Ok(Outcome::Completed),
            Err(err) => Ok(self.report(ctx, err)),
        }
    }

    fn report(&self, ctx: &DispatchContext, err: anyhow::Error) -> Outcome {
        let message = format!("{err:#}");
        warn!(operation = self.name, error = %message, "dispatch failed");
        ctx.dispatch((self.on_error)(message));
        Outcome::Reported
    }
}

/// Marks one resolved request as in flight until dropped.
struct InflightGuard {
    inflight: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl InflightGuard {
    fn acquire(inflight: &Arc<Mutex<HashSet<String>>>, key: String) -> Option<Self> {
        let mut set = inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if !set.insert(key.clone()) {
            return None;
        }
        Some(Self {
            inflight: Arc::clone(inflight),
            key,
        })
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
#[path = "tests/pipeline_tests.rs"]
mod tests;
