use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bossraid::server::{router, routes::route_request};
use bossraid::RaidEngine;
use futures_util::StreamExt;
use tower::ServiceExt;

const CREATE_BODY: &str = r##"{
    "bossId": "golem",
    "questions": [
        {"prompt": "2+2", "options": ["3", "4"], "correctIndex": 1, "difficulty": "hard"},
        {"prompt": "3+3", "options": ["6", "7"], "correctIndex": 0}
    ],
    "teams": [
        {"id": "red", "name": "Red", "color": "#f00"},
        {"id": "blue", "name": "Blue", "color": "#00f"}
    ]
}"##;

fn json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).expect("response should be valid json")
}

fn create(engine: &RaidEngine) -> String {
    let response = route_request(engine, "POST", "/api/battles", CREATE_BODY);
    assert_eq!(response.status_code, 200, "{}", response.body);
    json(&response.body)["id"].as_str().expect("id").to_string()
}

#[test]
fn health_endpoint_returns_ok_json() {
    let engine = RaidEngine::in_memory(1);
    let response = route_request(&engine, "GET", "/api/health", "");
    assert_eq!(response.status_code, 200);
    assert_eq!(response.content_type, "application/json");
    assert!(response.body.contains("\"status\": \"ok\""));
}

#[test]
fn create_then_fetch_battle() {
    let engine = RaidEngine::in_memory(2);
    let id = create(&engine);

    let response = route_request(&engine, "GET", &format!("/api/battles/{id}"), "");
    assert_eq!(response.status_code, 200);
    let battle = json(&response.body);
    assert_eq!(battle["status"], "active");
    assert_eq!(battle["boss"]["maxHP"], 25);
    assert_eq!(battle["classHP"]["max"], 10);
    assert_eq!(battle["version"], 1);
    assert_eq!(battle["teamProgress"]["red"]["questionOrder"].as_array().map(Vec::len), Some(2));
    assert!(battle.get("endedAt").is_none(), "nulls are never stored");

    let listing = json(&route_request(&engine, "GET", "/api/battles", "").body);
    assert_eq!(listing["battles"][0]["id"], id.as_str());
    assert_eq!(listing["battles"][0]["teamCount"], 2);
}

#[test]
fn create_reports_validation_errors() {
    let engine = RaidEngine::in_memory(3);
    let response = route_request(&engine, "POST", "/api/battles", r#"{"bossId": "golem"}"#);
    assert_eq!(response.status_code, 400);
    let payload = json(&response.body);
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["message"], "Validation failed");
    assert_eq!(payload["errors"][0]["field"], "questions");
    assert_eq!(payload["errors"][1]["field"], "teams");

    let malformed = route_request(&engine, "POST", "/api/battles", "{not json");
    assert_eq!(malformed.status_code, 400);
    assert!(json(&malformed.body)["message"]
        .as_str()
        .is_some_and(|m| m.starts_with("Invalid request body")));
}

#[test]
fn answer_and_ability_flow() {
    let engine = RaidEngine::in_memory(4);
    let id = create(&engine);

    let ability = route_request(
        &engine,
        "POST",
        &format!("/api/battles/{id}/ability"),
        r#"{"teamId": "red", "abilityId": "criticalHit"}"#,
    );
    assert_eq!(ability.status_code, 200);
    assert!(json(&ability.body)["error"].is_null());

    let again = route_request(
        &engine,
        "POST",
        &format!("/api/battles/{id}/ability"),
        r#"{"teamId": "red", "abilityId": "criticalHit"}"#,
    );
    assert_eq!(json(&again.body)["error"], "critical hit already active");

    let battle = engine.get_battle(&id).expect("get").expect("battle");
    let first = battle.team_progress["red"].question_order[0];
    let correct = battle.questions[first].correct_index;
    let answer = route_request(
        &engine,
        "POST",
        &format!("/api/battles/{id}/answer"),
        &format!(r#"{{"teamId": "red", "answerIndex": {correct}}}"#),
    );
    assert_eq!(answer.status_code, 200);
    let result = &json(&answer.body)["result"];
    assert_eq!(result["correct"], true);
    assert_eq!(result["criticalHit"], true);

    let unknown_team = route_request(
        &engine,
        "POST",
        &format!("/api/battles/{id}/answer"),
        r#"{"teamId": "green", "answerIndex": 0}"#,
    );
    assert_eq!(unknown_team.status_code, 200);
    assert!(json(&unknown_team.body)["result"].is_null());
}

#[test]
fn end_and_delete_battle() {
    let engine = RaidEngine::in_memory(5);
    let id = create(&engine);

    let rejected = route_request(&engine, "POST", &format!("/api/battles/{id}/end"), r#"{"status": "active"}"#);
    assert_eq!(rejected.status_code, 400);

    let ended = route_request(&engine, "POST", &format!("/api/battles/{id}/end"), r#"{"status": "defeat"}"#);
    assert_eq!(ended.status_code, 200);
    let battle = json(&ended.body);
    assert_eq!(battle["status"], "defeat");
    assert!(battle["endedAt"].is_string());
    assert_eq!(battle["log"][0]["kind"], "end");

    let deleted = route_request(&engine, "DELETE", &format!("/api/battles/{id}"), "");
    assert_eq!(deleted.status_code, 200);
    let missing = route_request(&engine, "GET", &format!("/api/battles/{id}"), "");
    assert_eq!(missing.status_code, 404);
    let deleted_again = route_request(&engine, "DELETE", &format!("/api/battles/{id}"), "");
    assert_eq!(deleted_again.status_code, 404);
}

#[test]
fn unknown_routes_and_methods() {
    let engine = RaidEngine::in_memory(6);
    assert_eq!(route_request(&engine, "GET", "/api/nope", "").status_code, 404);
    assert_eq!(route_request(&engine, "PUT", "/api/battles", "").status_code, 405);
    assert_eq!(route_request(&engine, "GET", "/api/catalog?pretty=1", "").status_code, 200);
}

#[tokio::test]
async fn router_dispatches_through_axum() {
    let app = router(Arc::new(RaidEngine::in_memory(7)));
    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
}

#[tokio::test]
async fn event_stream_sends_current_snapshot() {
    let engine = Arc::new(RaidEngine::in_memory(8));
    let id = create(&engine);
    let app = router(engine.clone());

    let missing = app
        .clone()
        .oneshot(Request::get("/api/battles/nope/events").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(
            Request::get(format!("/api/battles/{id}/events"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );

    let mut stream = response.into_body().into_data_stream();
    let chunk = stream.next().await.expect("first event").expect("bytes");
    let text = String::from_utf8_lossy(&chunk);
    assert!(text.contains("event: battle"), "{text}");
    assert!(text.contains(&id), "{text}");
}
