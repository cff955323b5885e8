use super::*;
use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use server_api::MockTransport;
use shared::{error::TransportError, transport::Transport};
use storage::{EntityKind, Storage};
use serde_json::json;

use crate::{
    pipeline::Outcome,
    store::{ErrorCategory, Store},
};

/// Mock backend that also remembers every request line.
struct RecordingTransport {
    inner: MockTransport,
    requests: Mutex<Vec<String>>,
}

impl RecordingTransport {
    fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        self.requests.lock().expect("lock").push(format!("GET {path}"));
        self.inner.get(path).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, TransportError> {
        self.requests
            .lock()
            .expect("lock")
            .push(format!("POST {path} {body}"));
        self.inner.post(path, body).await
    }
}

/// Mock backend that holds one GET path until the gate opens.
struct GatedTransport {
    inner: MockTransport,
    held: String,
    reached: tokio::sync::Notify,
    gate: tokio::sync::Semaphore,
}

#[async_trait]
impl Transport for GatedTransport {
    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        if path == self.held {
            self.reached.notify_one();
            let permit = self.gate.acquire().await.expect("gate open");
            permit.forget();
        }
        self.inner.get(path).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, TransportError> {
        self.inner.post(path, body).await
    }
}

fn object(value: Value) -> storage::Record {
    value.as_object().cloned().expect("object")
}

struct Harness {
    ctx: DispatchContext,
    storage: Storage,
    transport: Arc<RecordingTransport>,
    dispatchers: Dispatchers,
}

impl Harness {
    fn new() -> Self {
        let storage = Storage::new();
        let transport = Arc::new(RecordingTransport {
            inner: MockTransport::from_storage(storage.clone()),
            requests: Mutex::new(Vec::new()),
        });
        Self {
            ctx: DispatchContext::new(Store::default(), transport.clone()),
            storage,
            transport,
            dispatchers: Dispatchers::new(),
        }
    }

    async fn run(&self, dispatcher: &ValidatedDispatcher, payload: Value) -> Outcome {
        dispatcher.call(&self.ctx, payload).await.expect("valid payload")
    }

    fn error_messages(&self, category: ErrorCategory) -> Vec<String> {
        self.ctx
            .state()
            .errors
            .entries
            .iter()
            .filter(|e| e.category == category)
            .map(|e| e.message.clone())
            .collect()
    }

    async fn seed_active_session(&self, name: &str) -> SessionId {
        let d = &self.dispatchers;
        self.run(&d.upsert_session, json!({ "name": name })).await;
        let session = self
            .ctx
            .state()
            .sessions
            .model
            .model_data
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.id)
            .expect("session in store");
        self.ctx.dispatch(sessions::set_active_session(Some(session)));
        session
    }
}

#[test]
fn dispatcher_names_are_unique_and_described() {
    let dispatchers = Dispatchers::new();
    let names: HashSet<_> = dispatchers.all().iter().map(|d| d.name()).collect();
    assert_eq!(names.len(), 16);
    assert!(dispatchers.all().iter().all(|d| !d.description().is_empty()));
    assert_eq!(
        dispatchers.find("delete_assignment").map(|d| d.contract().is_some()),
        Some(true)
    );
    assert!(dispatchers.find("nope").is_none());
}

#[tokio::test]
async fn sessions_round_trip_into_the_store() {
    let h = Harness::new();
    let d = &h.dispatchers;
    assert_eq!(h.run(&d.upsert_session, json!({"name": "2025 Fall"})).await, Outcome::Completed);
    h.storage
        .upsert(
            EntityKind::Session,
            json!({"name": "created elsewhere"}).as_object().cloned().expect("object"),
        )
        .expect("direct insert");

    h.run(&d.fetch_sessions, Value::Null).await;
    let names: Vec<_> = h
        .ctx
        .state()
        .sessions
        .model
        .model_data
        .iter()
        .map(|s| s.name.clone())
        .collect();
    assert_eq!(names, vec!["2025 Fall", "created elsewhere"]);
    assert_eq!(
        h.transport.requests(),
        vec![
            r#"POST /admin/sessions {"name":"2025 Fall"}"#.to_string(),
            "GET /admin/sessions".to_string(),
        ]
    );
}

#[tokio::test]
async fn duplicate_session_name_is_reported_not_stored() {
    let h = Harness::new();
    let d = &h.dispatchers;
    h.run(&d.upsert_session, json!({"name": "2025 Fall"})).await;
    let outcome = h.run(&d.upsert_session, json!({"name": "2025 Fall"})).await;

    assert_eq!(outcome, Outcome::Reported);
    let messages = h.error_messages(ErrorCategory::Upsert);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("422: "), "{}", messages[0]);
    assert!(messages[0].contains("name"), "{}", messages[0]);
    assert_eq!(h.ctx.state().sessions.model.model_data.len(), 1);
}

#[tokio::test]
async fn scoped_fetch_requires_an_active_session() {
    let h = Harness::new();
    let outcome = h.run(&h.dispatchers.fetch_positions, Value::Null).await;
    assert_eq!(outcome, Outcome::Reported);
    assert_eq!(
        h.error_messages(ErrorCategory::Fetch),
        vec!["no active session selected"]
    );
    assert!(h.transport.requests().is_empty());
}

#[tokio::test]
async fn role_in_the_store_picks_the_route_prefix() {
    let h = Harness::new();
    let session = h.seed_active_session("Summer").await;
    h.ctx.dispatch(users::set_active_role(shared::domain::Role::Instructor));
    h.run(&h.dispatchers.fetch_assignments, Value::Null).await;
    assert_eq!(
        h.transport.requests().last().map(String::as_str),
        Some(format!("GET /instructor/sessions/{session}/assignments").as_str())
    );
}

#[tokio::test]
async fn assignments_are_sent_in_wire_shape_and_joined_back() {
    let h = Harness::new();
    let d = &h.dispatchers;
    let session = h.seed_active_session("2026 Winter").await;

    h.run(
        &d.upsert_position,
        json!({"session": {"id": session.0, "name": "2026 Winter"}, "position_code": "CSC209"}),
    )
    .await;
    h.run(&d.upsert_applicant, json!({"utorid": "smithj"})).await;
    let state = h.ctx.state();
    let position = state.positions.model_data[0].clone();
    let applicant = state.applicants.model_data[0].clone();
    assert_eq!(position.session_id, Some(session));

    h.run(
        &d.upsert_assignment,
        json!({
            "position": serde_json::to_value(&position).expect("json"),
            "applicant": serde_json::to_value(&applicant).expect("json"),
            "hours": 54
        }),
    )
    .await;
    let sent = h.transport.requests().last().cloned().expect("request");
    assert!(sent.starts_with("POST /admin/assignments {"), "{sent}");
    assert!(sent.contains(r#""applicant_id":1"#), "{sent}");
    assert!(!sent.contains(r#""applicant":"#), "{sent}");

    h.ctx
        .dispatch(Action::Assignments(ModelAction::ReplaceAll(Vec::new())));
    h.run(&d.fetch_assignments, Value::Null).await;
    let state = h.ctx.state();
    let assignment = &state.assignments.model_data[0];
    assert_eq!(assignment.position_id, position.id);
    assert_eq!(assignment.attributes["hours"], json!(54));

    let views = crate::selectors::AssignmentsSelector::new().select(&state);
    assert_eq!(
        views[0].applicant.as_ref().map(|a| a.attributes["utorid"].clone()),
        Some(json!("smithj"))
    );
}

#[tokio::test]
async fn delete_removes_from_store_and_backend_index() {
    let h = Harness::new();
    let d = &h.dispatchers;
    let session = h.seed_active_session("Fall").await;
    h.run(&d.upsert_position, json!({"session_id": session.0, "position_code": "MAT137"}))
        .await;
    h.run(&d.upsert_applicant, json!({"utorid": "a1"})).await;
    h.run(&d.upsert_assignment, json!({"position_id": 1, "applicant_id": 1}))
        .await;
    assert_eq!(h.ctx.state().assignments.model_data.len(), 1);

    h.run(&d.delete_assignment, json!({"id": 1})).await;
    assert!(h.ctx.state().assignments.model_data.is_empty());
    assert_eq!(h.storage.assignment_ids_for_session(session), Some(Vec::new()));
    assert_eq!(
        h.transport.requests().last().map(String::as_str),
        Some(r#"POST /admin/assignments/delete {"id":1}"#)
    );
}

#[tokio::test]
async fn delete_without_id_never_reaches_the_backend() {
    let h = Harness::new();
    let err = h
        .dispatchers
        .delete_session
        .call(&h.ctx, json!({"name": "Fall"}))
        .await
        .expect_err("id is required");
    assert_eq!(err.problems[0].field, "id");
    assert!(h.transport.requests().is_empty());
    assert!(h.ctx.state().errors.entries.is_empty());
}

#[tokio::test]
async fn deleting_a_referenced_record_is_a_delete_error() {
    let h = Harness::new();
    let d = &h.dispatchers;
    let session = h.seed_active_session("Fall").await;
    h.run(&d.upsert_position, json!({"session_id": session.0, "position_code": "MAT137"}))
        .await;

    let outcome = h.run(&d.delete_session, json!({ "id": session.0 })).await;
    assert_eq!(outcome, Outcome::Reported);
    assert_eq!(h.error_messages(ErrorCategory::Delete).len(), 1);
    assert!(h.ctx.state().sessions.active_session.is_some());
}

#[tokio::test]
async fn fetch_assignment_merges_one_record() {
    let h = Harness::new();
    let d = &h.dispatchers;
    let session = h.seed_active_session("Fall").await;
    h.run(&d.upsert_position, json!({"session_id": session.0, "position_code": "MAT137"}))
        .await;
    h.run(&d.upsert_applicant, json!({"utorid": "a1"})).await;
    h.storage
        .upsert(
            EntityKind::Assignment,
            json!({"position_id": 1, "applicant_id": 1, "note": "backend only"})
                .as_object()
                .cloned()
                .expect("object"),
        )
        .expect("direct insert");

    h.run(&d.fetch_assignment, json!({"id": 1})).await;
    let state = h.ctx.state();
    assert_eq!(state.assignments.model_data.len(), 1);
    assert_eq!(state.assignments.model_data[0].attributes["note"], json!("backend only"));

    let missing = h.run(&d.fetch_assignment, json!({"id": 8})).await;
    assert_eq!(missing, Outcome::Reported);
    assert_eq!(h.error_messages(ErrorCategory::Fetch), vec!["404: no assignment with id 8"]);
}

#[tokio::test]
async fn contract_templates_are_scoped_to_the_active_session() {
    let h = Harness::new();
    let d = &h.dispatchers;
    let fall = h.seed_active_session("Fall").await;
    let template = json!({
        "session": {"id": fall.0},
        "template_name": "standard",
        "template_file": "standard.html"
    });
    h.run(&d.upsert_contract_template, template.clone()).await;
    assert_eq!(
        h.run(&d.upsert_contract_template, template).await,
        Outcome::Reported
    );

    let winter = h.seed_active_session("Winter").await;
    h.run(
        &d.upsert_contract_template,
        json!({"session_id": winter.0, "template_name": "standard", "template_file": "w.html"}),
    )
    .await;
    h.run(&d.fetch_contract_templates, Value::Null).await;
    let state = h.ctx.state();
    let files: Vec<_> = state
        .contract_templates
        .model_data
        .iter()
        .map(|t| t.template_file.clone())
        .collect();
    assert_eq!(files, vec!["w.html"]);
    assert_eq!(h.error_messages(ErrorCategory::Upsert).len(), 1);
}

#[tokio::test]
async fn switching_sessions_mid_fetch_keeps_the_new_session_listing() {
    let storage = Storage::new();
    for name in ["Fall", "Winter"] {
        storage
            .upsert(EntityKind::Session, object(json!({"name": name})))
            .expect("session");
    }
    for (session, code) in [(1, "CSC100"), (2, "CSC200")] {
        storage
            .upsert(
                EntityKind::Position,
                object(json!({"session_id": session, "position_code": code})),
            )
            .expect("position");
    }
    storage
        .upsert(EntityKind::Applicant, object(json!({"utorid": "a1"})))
        .expect("applicant");
    for position in [1, 2] {
        storage
            .upsert(
                EntityKind::Assignment,
                object(json!({"position_id": position, "applicant_id": 1})),
            )
            .expect("assignment");
    }

    let transport = Arc::new(GatedTransport {
        inner: MockTransport::from_storage(storage),
        held: "/admin/sessions/1/assignments".into(),
        reached: tokio::sync::Notify::new(),
        gate: tokio::sync::Semaphore::new(0),
    });
    let ctx = DispatchContext::new(Store::default(), transport.clone());
    let dispatchers = Dispatchers::new();
    dispatchers
        .fetch_sessions
        .call(&ctx, Value::Null)
        .await
        .expect("valid");
    ctx.dispatch(sessions::set_active_session(Some(SessionId(1))));

    let fall = tokio::spawn({
        let fetch = dispatchers.fetch_assignments.clone();
        let ctx = ctx.clone();
        async move { fetch.call(&ctx, Value::Null).await }
    });
    transport.reached.notified().await;

    ctx.dispatch(sessions::set_active_session(Some(SessionId(2))));
    let winter = dispatchers
        .fetch_assignments
        .call(&ctx, Value::Null)
        .await
        .expect("valid");
    assert_eq!(winter, Outcome::Completed, "a different session is a different request");

    transport.gate.add_permits(1);
    assert_eq!(fall.await.expect("join"), Ok(Outcome::Completed));

    let state = ctx.state();
    assert_eq!(state.sessions.active_session.as_ref().map(|s| s.id), Some(SessionId(2)));
    let ids: Vec<_> = state.assignments.model_data.iter().map(|a| a.id.0).collect();
    assert_eq!(ids, vec![2], "the late Fall listing must not replace Winter's");
    assert!(state.errors.entries.is_empty());
}
