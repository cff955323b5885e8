use serde_json::json;
use storage::{EntityKind, Record};

use super::*;

fn record(value: Value) -> Record {
    match value {
        Value::Object(record) => record,
        other => panic!("not an object: {other}"),
    }
}

fn seeded_client() -> SyncClient {
    let storage = Storage::new();
    storage
        .upsert(EntityKind::Session, record(json!({"name": "2025 Fall"})))
        .expect("session");
    storage
        .upsert(
            EntityKind::Position,
            record(json!({"session_id": 1, "position_code": "CSC108"})),
        )
        .expect("position");
    storage
        .upsert(
            EntityKind::Applicant,
            record(json!({"utorid": "smithj", "first_name": "Jo"})),
        )
        .expect("applicant");
    storage
        .upsert(
            EntityKind::Assignment,
            record(json!({"position_id": 1, "applicant_id": 1, "hours": 70})),
        )
        .expect("assignment");
    SyncClient::new(Arc::new(MockTransport::from_storage(storage)))
}

#[tokio::test]
async fn catalog_lists_every_dispatcher() {
    let client = seeded_client();
    let output = execute(&client, Command::Catalog).await.expect("catalog");
    assert_eq!(output.lines().count(), client.catalog().len());
    assert!(output.contains("fetch_sessions"), "{output}");
}

#[tokio::test]
async fn assignments_are_printed_joined() {
    let client = seeded_client();
    let output = execute(&client, Command::Assignments { session: 1 })
        .await
        .expect("assignments");
    let views: Value = serde_json::from_str(&output).expect("json");
    assert_eq!(views[0]["position"]["position_code"], "CSC108");
    assert_eq!(views[0]["applicant"]["utorid"], "smithj");
}

#[tokio::test]
async fn unknown_session_is_an_error() {
    let client = seeded_client();
    let err = execute(&client, Command::Positions { session: 9 })
        .await
        .expect_err("no session 9");
    assert_eq!(err.to_string(), "no session with id 9");
}

#[tokio::test]
async fn run_surfaces_reported_failures() {
    let client = seeded_client();
    let err = execute(
        &client,
        Command::Run {
            name: "upsert_session".into(),
            payload: r#"{"name": "2025 Fall"}"#.into(),
        },
    )
    .await
    .expect_err("duplicate session name");
    assert!(err.to_string().contains("Upsert"), "{err}");
}

#[tokio::test]
async fn run_rejects_malformed_payload_json() {
    let client = seeded_client();
    let err = execute(
        &client,
        Command::Run {
            name: "delete_session".into(),
            payload: "{".into(),
        },
    )
    .await
    .expect_err("bad json");
    assert_eq!(err.to_string(), "payload is not valid JSON");
}
