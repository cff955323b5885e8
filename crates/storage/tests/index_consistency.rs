use serde_json::json;
use shared::domain::SessionId;
use storage::{record_id, EntityKind, Record, Storage};

fn rec(value: serde_json::Value) -> Record {
    value.as_object().expect("object literal").clone()
}

fn create(storage: &Storage, kind: EntityKind, value: serde_json::Value) -> i64 {
    let record = storage.upsert(kind, rec(value)).expect("create");
    record_id(&record).expect("id")
}

#[test]
fn index_stays_consistent_through_a_mixed_workload() {
    let storage = Storage::new();
    let session = create(&storage, EntityKind::Session, json!({"name": "2025 Fall"}));
    let other = create(&storage, EntityKind::Session, json!({"name": "2026 Winter"}));

    let positions: Vec<i64> = (0..3)
        .map(|n| {
            create(
                &storage,
                EntityKind::Position,
                json!({"session_id": session, "position_code": format!("CSC{n}00")}),
            )
        })
        .collect();
    let elsewhere = create(
        &storage,
        EntityKind::Position,
        json!({"session_id": other, "position_code": "MAT100"}),
    );
    let applicants: Vec<i64> = (0..4)
        .map(|n| {
            create(
                &storage,
                EntityKind::Applicant,
                json!({"utorid": format!("user{n}")}),
            )
        })
        .collect();

    let mut expected = Vec::new();
    for (i, applicant) in applicants.iter().enumerate() {
        let position = positions[i % positions.len()];
        expected.push(create(
            &storage,
            EntityKind::Assignment,
            json!({"position_id": position, "applicant_id": applicant}),
        ));
    }
    create(
        &storage,
        EntityKind::Assignment,
        json!({"position_id": elsewhere, "applicant_id": applicants[0]}),
    );

    let ids: Vec<i64> = storage
        .assignment_ids_for_session(SessionId(session))
        .expect("bucket")
        .into_iter()
        .map(|id| id.0)
        .collect();
    assert_eq!(ids, expected);

    let removed = expected.remove(1);
    storage
        .delete(EntityKind::Assignment, &rec(json!({ "id": removed })))
        .expect("delete");
    let listed: Vec<i64> = storage
        .assignments_for_session(SessionId(session))
        .expect("listing")
        .iter()
        .filter_map(record_id)
        .collect();
    assert_eq!(listed, expected);

    storage.check_integrity().expect("index matches primary data");
}
