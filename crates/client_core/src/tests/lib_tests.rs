use super::*;
use serde_json::json;
use server_api::MockTransport;
use storage::Storage;

fn client() -> SyncClient {
    SyncClient::new(Arc::new(MockTransport::from_storage(Storage::new())))
}

#[test]
fn catalog_lists_every_dispatcher() {
    let client = client();
    let catalog = client.catalog();
    assert_eq!(catalog.len(), 16);
    assert_eq!(
        catalog[0],
        DispatcherInfo {
            name: "fetch_sessions",
            description: "Fetch sessions"
        }
    );
}

#[tokio::test]
async fn run_dispatches_by_name() {
    let client = client();
    let outcome = client
        .run("upsert_session", json!({"name": "Fall"}))
        .await
        .expect("known dispatcher");
    assert_eq!(outcome, Outcome::Completed);
    assert!(client.run("unknown", Value::Null).await.is_err());
    assert!(client.run("delete_session", json!({})).await.is_err());
}

#[tokio::test]
async fn staffing_workflow_end_to_end() {
    let client = client();
    client
        .run("upsert_session", json!({"name": "2025 Fall"}))
        .await
        .expect("session");
    client.set_active_session(Some(SessionId(1)));
    client
        .run("upsert_position", json!({"session_id": 1, "position_code": "CSC108"}))
        .await
        .expect("position");
    for utorid in ["alice1", "bob2"] {
        client
            .run("upsert_applicant", json!({ "utorid": utorid }))
            .await
            .expect("applicant");
    }
    for applicant_id in [1, 2] {
        client
            .run(
                "upsert_assignment",
                json!({"position": {"id": 1}, "applicant": {"id": applicant_id}}),
            )
            .await
            .expect("assignment");
    }

    let views = client.assignments();
    assert_eq!(views.len(), 2);
    assert!(Arc::ptr_eq(&views, &client.assignments()));
    assert_eq!(client.positions_for_active_session().len(), 1);

    client
        .run("upsert_applicant", json!({"id": 2, "utorid": "robert2"}))
        .await
        .expect("rename");
    let renamed = client.assignments();
    assert_eq!(
        renamed[1].applicant.as_ref().map(|a| a.attributes["utorid"].clone()),
        Some(json!("robert2"))
    );

    client
        .run("upsert_assignment", json!({"position_id": 1, "applicant_id": 1}))
        .await
        .expect("duplicate pair");
    assert_eq!(client.errors().len(), 1);
    client.clear_errors();
    assert!(client.errors().is_empty());
}

#[tokio::test]
async fn role_switch_applies_to_the_next_dispatch() {
    let client = client();
    client.set_active_role(Role::Ta);
    assert_eq!(client.state().users.active_role, Role::Ta);
    client
        .run("fetch_sessions", Value::Null)
        .await
        .expect("fetch");
    assert!(client.errors().is_empty());
}
