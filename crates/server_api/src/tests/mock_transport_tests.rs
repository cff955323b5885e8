use super::*;
use serde_json::json;
use shared::{
    error::ErrorCode,
    protocol::{applicants_delete_route, applicants_route, session_positions_route, sessions_route},
    domain::{Role, SessionId},
};

#[tokio::test]
async fn round_trips_through_the_route_grammar() {
    let transport = MockTransport::from_storage(Storage::new());
    let session = transport
        .post(&sessions_route(Role::Admin), json!({"name": "Summer"}))
        .await
        .expect("session");
    assert_eq!(session["id"], json!(1));

    transport
        .post(
            &shared::protocol::positions_route(Role::Admin),
            json!({"session_id": 1, "position_code": "STA130"}),
        )
        .await
        .expect("position");
    let positions = transport
        .get(&session_positions_route(Role::Instructor, SessionId(1)))
        .await
        .expect("positions");
    assert_eq!(positions[0]["position_code"], json!("STA130"));
}

#[tokio::test]
async fn api_errors_surface_as_typed_transport_errors() {
    let transport = MockTransport::from_storage(Storage::new());
    transport
        .post(&applicants_route(Role::Admin), json!({"utorid": "dup"}))
        .await
        .expect("first");
    let err = transport
        .post(&applicants_route(Role::Admin), json!({"utorid": "dup"}))
        .await
        .expect_err("duplicate utorid");
    assert_eq!(err.code(), Some(ErrorCode::Validation));
    assert!(err.to_string().starts_with("422: "), "{err}");

    let err = transport
        .post(&applicants_delete_route(Role::Admin), json!({"id": 40}))
        .await
        .expect_err("unknown id");
    assert_eq!(err.code(), Some(ErrorCode::NotFound));
}

#[tokio::test]
async fn clones_share_the_same_dataset() {
    let storage = Storage::new();
    let transport = MockTransport::from_storage(storage.clone());
    transport
        .clone()
        .post(&applicants_route(Role::Ta), json!({"utorid": "shared"}))
        .await
        .expect("create");
    assert_eq!(storage.find_all(storage::EntityKind::Applicant).len(), 1);
}
