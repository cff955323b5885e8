//! Client-side data synchronization.
//!
//! [`SyncClient`] ties the pieces together: dispatchers built on the
//! [`pipeline`] talk to a [`Transport`], merge responses into the
//! normalized [`store`], and the UI reads derived views through
//! [`selectors`].

use std::sync::Arc;

use serde_json::Value;
use shared::{
    domain::{Position, Role, SessionId},
    transport::Transport,
};

pub mod actions;
pub mod flatten;
pub mod pipeline;
pub mod selectors;
pub mod store;
pub mod transport;

pub use actions::Dispatchers;
pub use flatten::{flatten_all, FlattenId};
pub use pipeline::{DispatchContext, Outcome, PayloadContract, PayloadError, ValidatedDispatcher};
pub use selectors::{AssignmentView, Selectors};
pub use store::{Action, ReportedError, RootState, Store};
pub use transport::HttpTransport;

/// Name and description of one dispatcher, for tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherInfo {
    pub name: &'static str,
    pub description: &'static str,
}

pub struct SyncClient {
    ctx: DispatchContext,
    dispatchers: Dispatchers,
    selectors: Selectors,
}

impl SyncClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_store(Store::default(), transport)
    }

    pub fn with_store(store: Store, transport: Arc<dyn Transport>) -> Self {
        Self {
            ctx: DispatchContext::new(store, transport),
            dispatchers: Dispatchers::new(),
            selectors: Selectors::default(),
        }
    }

    pub fn context(&self) -> &DispatchContext {
        &self.ctx
    }

    pub fn store(&self) -> &Store {
        self.ctx.store()
    }

    pub fn state(&self) -> Arc<RootState> {
        self.ctx.state()
    }

    pub fn dispatchers(&self) -> &Dispatchers {
        &self.dispatchers
    }

    pub fn catalog(&self) -> Vec<DispatcherInfo> {
        self.dispatchers
            .all()
            .into_iter()
            .map(|dispatcher| DispatcherInfo {
                name: dispatcher.name(),
                description: dispatcher.description(),
            })
            .collect()
    }

    /// Runs the dispatcher registered under `name`.
    pub async fn run(&self, name: &str, payload: Value) -> anyhow::Result<Outcome> {
        let dispatcher = self
            .dispatchers
            .find(name)
            .ok_or_else(|| anyhow::anyhow!("unknown dispatcher '{name}'"))?;
        Ok(dispatcher.call(&self.ctx, payload).await?)
    }

    pub fn set_active_role(&self, role: Role) {
        self.ctx.dispatch(actions::users::set_active_role(role));
    }

    pub fn set_active_session(&self, session_id: Option<SessionId>) {
        self.ctx
            .dispatch(actions::sessions::set_active_session(session_id));
    }

    pub fn clear_errors(&self) {
        self.ctx.dispatch(actions::errors::clear_errors());
    }

    pub fn assignments(&self) -> Arc<Vec<AssignmentView>> {
        self.selectors.assignments.select(&self.state())
    }

    pub fn positions_for_active_session(&self) -> Arc<Vec<Position>> {
        self.selectors
            .positions_for_active_session
            .select(&self.state())
    }

    pub fn errors(&self) -> Arc<Vec<ReportedError>> {
        selectors::errors_selector(&self.state())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
