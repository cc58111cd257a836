use crate::errors::ServerError;
use crate::router::handle;
use crate::tests::utils::{body_json, harness, rejected};
use astra::Body;
use http::{Method, Request};
use serde_json::json;

fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[test]
fn health_check_answers() {
    let h = harness("route_health");
    let resp = handle(get("/health"), &h.scheduler).expect("Failed to handle request");
    assert_eq!(resp.status(), 200);
    assert_eq!(body_json(resp)["status"], "ok");
}

#[test]
fn schedule_then_conflict_reports_the_meeting() {
    let h = harness("route_schedule");
    let booking = json!({
        "salespersonId": 1,
        "clientId": 10,
        "date": "2025-03-10",
        "start": "10:00",
        "end": "11:00",
        "city": "Recife"
    });

    let resp = handle(post("/meetings", booking), &h.scheduler).expect("Failed to handle request");
    assert_eq!(resp.status(), 201);
    let meeting = body_json(resp);
    assert_eq!(meeting["status"], "scheduled");
    assert_eq!(meeting["window"]["startMinute"], 600);
    let id = meeting["id"].as_i64().unwrap();

    let check = handle(
        post(
            "/bookings/validate",
            json!({"salespersonId": 1, "date": "2025-03-10", "start": "10:30", "end": "11:30"}),
        ),
        &h.scheduler,
    )
    .expect("Failed to handle request");
    let check = body_json(check);
    assert_eq!(check["valid"], false);
    assert_eq!(check["reason"], "MEETING_CONFLICT");
    assert_eq!(check["conflictingEntity"]["id"], id);

    let err = rejected(handle(
        post(
            "/meetings",
            json!({"salespersonId": 1, "clientId": 11, "date": "2025-03-10", "start": "10:30", "end": "11:30"}),
        ),
        &h.scheduler,
    ));
    assert_eq!(err.status(), 409);
    assert_eq!(err.code(), "MEETING_CONFLICT");
}

#[test]
fn meeting_lifecycle_over_http() {
    let h = harness("route_lifecycle");
    let resp = handle(
        post(
            "/meetings",
            json!({"salespersonId": 2, "clientId": 20, "date": "2025-03-10", "start": "09:00", "end": "10:00"}),
        ),
        &h.scheduler,
    )
    .unwrap();
    let id = body_json(resp)["id"].as_i64().unwrap();

    let confirmed = handle(
        post(&format!("/meetings/{id}/confirm"), json!({"party": "client"})),
        &h.scheduler,
    )
    .unwrap();
    let confirmed = body_json(confirmed);
    assert_eq!(confirmed["status"], "confirmed");
    assert_eq!(confirmed["confirmedByClient"], true);

    let moved = handle(
        post(
            &format!("/meetings/{id}/reschedule"),
            json!({"date": "2025-03-10", "start": "09:30", "end": "10:30"}),
        ),
        &h.scheduler,
    )
    .unwrap();
    let moved = body_json(moved);
    assert_eq!(moved["status"], "rescheduled");
    assert_eq!(moved["confirmedByClient"], false);

    let done = handle(
        post(
            &format!("/meetings/{id}/complete"),
            json!({"outcome": "follow_up", "notes": "retornar em abril"}),
        ),
        &h.scheduler,
    )
    .unwrap();
    assert_eq!(body_json(done)["outcome"], "follow_up");

    let err = rejected(handle(post(&format!("/meetings/{id}/cancel"), json!({})), &h.scheduler));
    assert_eq!(err.code(), "INVALID_TRANSITION");

    let agenda = handle(get("/salespeople/2/agenda?date=2025-03-10"), &h.scheduler).unwrap();
    assert_eq!(body_json(agenda).as_array().unwrap().len(), 1);
}

#[test]
fn blocks_and_free_slots_over_http() {
    let h = harness("route_blocks");
    let resp = handle(
        post("/salespeople/3/blocks", json!({"dateStart": "2025-04-01", "reason": "feriado"})),
        &h.scheduler,
    )
    .unwrap();
    assert_eq!(resp.status(), 201);
    let block_id = body_json(resp)["id"].as_i64().unwrap();

    let err = rejected(handle(
        post(
            "/meetings",
            json!({"salespersonId": 3, "clientId": 30, "date": "2025-04-01", "start": "09:00", "end": "10:00"}),
        ),
        &h.scheduler,
    ));
    assert_eq!(err.code(), "BLOCKED_PERIOD");
    match err {
        ServerError::Scheduling(e) => assert_eq!(e.conflicting_entity().map(|r| r.id), Some(block_id)),
        other => panic!("unexpected error {other:?}"),
    }

    let slots = handle(
        get("/salespeople/3/free-slots?date=2025-04-01&duration=30"),
        &h.scheduler,
    )
    .unwrap();
    assert!(body_json(slots).as_array().unwrap().is_empty());

    handle(post(&format!("/blocks/{block_id}/deactivate"), json!({})), &h.scheduler).unwrap();
    let slots = handle(
        get("/salespeople/3/free-slots?date=2025-04-01&duration=60&step=60"),
        &h.scheduler,
    )
    .unwrap();
    assert_eq!(body_json(slots).as_array().unwrap().len(), 10);
}

#[test]
fn bad_requests_are_reported_as_such() {
    let h = harness("route_bad");

    let err = rejected(handle(get("/meetings/abc"), &h.scheduler));
    assert_eq!(err.status(), 400);

    let err = rejected(handle(
        post(
            "/meetings",
            json!({"salespersonId": 1, "clientId": 1, "date": "2025-03-10", "start": "25:00", "end": "26:00"}),
        ),
        &h.scheduler,
    ));
    assert_eq!(err.code(), "INVALID_WINDOW");

    let err = rejected(handle(post("/meetings", json!({"salespersonId": 1})), &h.scheduler));
    assert_eq!(err.code(), "BAD_REQUEST");

    for query in ["duration=60&step=2147483647", "duration=2147483647&step=30", "duration=1441"] {
        let err = rejected(handle(
            get(&format!("/salespeople/1/free-slots?date=2025-03-10&{query}")),
            &h.scheduler,
        ));
        assert_eq!(err.code(), "INVALID_INPUT", "{query}");
    }

    let err = rejected(handle(get("/meetings/99"), &h.scheduler));
    assert_eq!(err.status(), 404);

    let err = rejected(handle(get("/nowhere"), &h.scheduler));
    assert!(matches!(err, ServerError::NotFound));
}
