//! HTTP integration tests against the in-memory store.
//!
//! Requests go through the full router (auth middleware, request ids, CORS)
//! via `tower::ServiceExt::oneshot`.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use ed25519_dalek::SigningKey;
use http_body_util::BodyExt;
use live_poker::{
    BotRegistry, BroadcastNotifier, BroadcastSignaler, MemoryTableStore, PhysicalDevice,
    TableConfig, TableManager, TableView, TokenVerifier, VideoBridge, VideoWebhookVerifier,
    device::{DeviceType, encode_public_key, sign_submission},
    game::entities::{Phase, TableId},
};
use lp_server::api::{AppState, create_router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

const JWT_SECRET: &str = "test_secret_key_for_testing_only_0123456789";
const SCHEDULER_TOKEN: &str = "scheduler-token-for-tests";
const VIDEO_SECRET: &str = "video_secret_for_tests";
const SCANNER: &str = "SCN-0001";

struct TestServer {
    app: Router,
    state: AppState,
    table_id: TableId,
}

impl TestServer {
    fn token(&self, subject: &str) -> String {
        self.state.tokens.issue(subject, Utc::now()).unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn act(&self, subject: &str, action: Value) -> (StatusCode, Value) {
        let request = Request::post(format!("/api/v1/tables/{}/actions", self.table_id))
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", self.token(subject)))
            .body(Body::from(action.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn view_as(&self, subject: &str) -> TableView {
        let request = Request::get(format!("/api/v1/tables/{}", self.table_id))
            .header("authorization", format!("Bearer {}", self.token(subject)))
            .body(Body::empty())
            .unwrap();
        let (status, body) = self.send(request).await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_value(body).unwrap()
    }
}

/// One 3-seat table run by `dealer`, with a scanner registered to it.
async fn create_test_server() -> TestServer {
    let notifier = BroadcastNotifier::default();
    let signaler = BroadcastSignaler::default();
    let bots = BotRegistry::default();

    let table_manager = TableManager::new(
        Arc::new(MemoryTableStore::new()),
        Arc::new(notifier.clone()),
    )
    .with_bots(bots.clone());

    let table = table_manager
        .create_table(&TableConfig {
            seat_count: 3,
            ..TableConfig::default()
        })
        .await
        .unwrap();

    table_manager
        .register_device(&PhysicalDevice {
            serial: SCANNER.to_string(),
            device_type: DeviceType::Scanner,
            table_id: table.id,
            seat_number: None,
            public_key: Some(encode_public_key(&scanner_key().verifying_key())),
            last_seen_at: None,
        })
        .await
        .unwrap();

    let video = VideoBridge::new(
        table_manager.clone(),
        VideoWebhookVerifier::new(VIDEO_SECRET),
        Arc::new(signaler.clone()),
    );

    let state = AppState {
        table_manager,
        tokens: TokenVerifier::new(JWT_SECRET, bots),
        notifier,
        signaler,
        video: Some(video),
        scheduler_token: Some(SCHEDULER_TOKEN.to_string()),
    };

    TestServer {
        app: create_router(state.clone()),
        state,
        table_id: table.id,
    }
}

fn scanner_key() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

fn scan(barcode: &str) -> Value {
    let timestamp = Utc::now().timestamp().to_string();
    json!({
        "serial": SCANNER,
        "barcode": barcode,
        "timestamp": timestamp,
        "signature": sign_submission(&scanner_key(), SCANNER, barcode, &timestamp),
    })
}

/// alice, bob and carol in seats 0-2 with a hand started.
async fn started_hand(server: &TestServer) {
    for (seat_number, name) in ["alice", "bob", "carol"].into_iter().enumerate() {
        let (status, _) = server
            .act(name, json!({"action": "join_seat", "seat_number": seat_number}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = server.act("dealer", json!({"action": "start_game"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "DEAL_HOLE_CARDS");
}

#[tokio::test]
async fn test_health_check_endpoint() {
    let server = create_test_server().await;
    let (status, body) = server.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], true);
}

#[tokio::test]
async fn test_404_for_invalid_endpoint() {
    let server = create_test_server().await;
    let (status, _) = server.get("/api/v1/nonexistent").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server().await;
    let request = Request::get("/health")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();
    let response = server.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers().get("x-request-id").unwrap(), "req-42");
}

#[tokio::test]
async fn test_cors_headers_present() {
    let server = create_test_server().await;
    let request = Request::get("/health")
        .header("origin", "http://dealer.example")
        .body(Body::empty())
        .unwrap();
    let response = server.app.clone().oneshot(request).await.unwrap();
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_actions_require_session() {
    let server = create_test_server().await;

    let uri = format!("/api/v1/tables/{}/actions", server.table_id);
    let (status, _) = server.post_json(&uri, json!({"action": "leave_seat"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::post(&uri)
        .header("content-type", "application/json")
        .header("authorization", "Bearer not-a-jwt")
        .body(Body::from(json!({"action": "leave_seat"}).to_string()))
        .unwrap();
    let (status, _) = server.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bot_identity_cannot_hold_a_session() {
    let server = create_test_server().await;
    let (status, _) = server
        .act("bot-1", json!({"action": "join_seat", "seat_number": 1}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_error_status_mapping() {
    let server = create_test_server().await;
    started_hand(&server).await;

    // Betting is not open while hole cards are dealt.
    let (status, body) = server.act("alice", json!({"action": "check"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_transition");

    // Only the dealer may kick.
    let (status, body) = server
        .act("alice", json!({"action": "kick_seat", "seat_number": 1}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");

    // Unknown action names never reach the engine.
    let (status, body) = server.act("alice", json!({"action": "double_down"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_malformed_device_bodies_get_device_codes() {
    let server = create_test_server().await;

    let (status, body) = server
        .post_json(
            "/api/v1/devices/cards",
            json!({"serial": "SCN-0001", "barcode": 1010}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"ok": false, "code": "invalid_request"}));

    let (status, body) = server
        .post_json("/api/v1/devices/identify", json!({"id": "SCN-0001"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"ok": false, "code": "invalid_request"}));

    // Not JSON at all.
    let request = Request::post("/api/v1/devices/cards")
        .body(Body::from("barcode=1010"))
        .unwrap();
    let (status, body) = server.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
}

#[tokio::test]
async fn test_dealt_card_visibility() {
    let server = create_test_server().await;
    started_hand(&server).await;

    let (status, body) = server
        .act("dealer", json!({"action": "deal_card", "card": "As"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seats"][1]["cards"][0], "As");

    // Dealing the same card again conflicts.
    let (status, body) = server
        .act("dealer", json!({"action": "deal_card", "card": "As"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "duplicate_card");

    let bob = server.view_as("bob").await;
    assert_eq!(bob.viewer_seat, Some(1));
    assert_eq!(bob.seat(1).unwrap().cards.as_ref().unwrap().len(), 1);

    let alice = server.view_as("alice").await;
    assert!(alice.seat(1).unwrap().cards.is_none());
    assert_eq!(alice.seat(1).unwrap().card_count, 1);
}

#[tokio::test]
async fn test_event_delta_cursor() {
    let server = create_test_server().await;
    started_hand(&server).await;

    let uri = format!("/api/v1/tables/{}/events", server.table_id);
    let (status, full) = server.get(&uri).await;
    assert_eq!(status, StatusCode::OK);
    let events = full["events"].as_array().unwrap();
    assert!(events.len() >= 4);
    let cursor = full["cursor"].as_i64().unwrap();
    assert_eq!(events.last().unwrap()["id"].as_i64().unwrap(), cursor);

    let (status, tail) = server.get(&format!("{uri}?after_id={cursor}")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(tail["events"].as_array().unwrap().is_empty());
    assert_eq!(tail["cursor"].as_i64().unwrap(), cursor);

    server.act("dealer", json!({"action": "reset_table"})).await;
    let (_, next) = server.get(&format!("{uri}?after_id={cursor}")).await;
    let next_events = next["events"].as_array().unwrap();
    assert_eq!(next_events.len(), 1);
    assert_eq!(next_events[0]["payload"]["phase"], "WAITING");
}

#[tokio::test]
async fn test_blinds_endpoint() {
    let server = create_test_server().await;
    let (status, body) = server
        .get(&format!("/api/v1/tables/{}/blinds", server.table_id))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["multiplier"], 1);
    assert_eq!(body["small_blind"], 5);
    assert_eq!(body["big_blind"], 10);

    let (status, body) = server.get("/api/v1/tables/999/blinds").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_bot_turn_requires_scheduler_token() {
    let server = create_test_server().await;
    let uri = format!("/api/v1/tables/{}/bot-turn", server.table_id);

    let (status, _) = server.post_json(&uri, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::post(&uri)
        .header("x-scheduler-token", "wrong-token")
        .body(Body::empty())
        .unwrap();
    let (status, _) = server.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bot_turn_plays_only_bot_seats() {
    let server = create_test_server().await;
    server
        .act("alice", json!({"action": "join_seat", "seat_number": 0}))
        .await;
    server
        .act("dealer", json!({"action": "seat_bot", "seat_number": 1}))
        .await;
    server
        .act("carol", json!({"action": "join_seat", "seat_number": 2}))
        .await;
    server.act("dealer", json!({"action": "start_game"})).await;
    for card in ["As", "Ks", "Qs", "Js", "Ts", "9s"] {
        let (status, _) = server
            .act("dealer", json!({"action": "deal_card", "card": card}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let trigger = || {
        Request::post(format!("/api/v1/tables/{}/bot-turn", server.table_id))
            .header("x-scheduler-token", SCHEDULER_TOKEN)
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = server.send(trigger()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["acted"], false);

    server.act("alice", json!({"action": "call"})).await;
    let (status, body) = server.send(trigger()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["acted"], true);
    assert_eq!(body["table"]["seats"][1]["is_bot"], true);
}

#[tokio::test]
async fn test_scanner_submission_and_replay() {
    let server = create_test_server().await;
    started_hand(&server).await;

    let submission = scan("1010");
    let (status, body) = server
        .post_json("/api/v1/devices/cards", submission.clone())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true, "card": "As"}));

    let (status, body) = server.post_json("/api/v1/devices/cards", submission).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({"ok": false, "code": "duplicate_card"}));
}

#[tokio::test]
async fn test_scanner_rejections_are_terse() {
    let server = create_test_server().await;
    started_hand(&server).await;

    let mut tampered = scan("1010");
    tampered["barcode"] = json!("1130");
    let (status, body) = server.post_json("/api/v1/devices/cards", tampered).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"ok": false, "code": "bad_signature"}));

    let mut stale = scan("1010");
    stale["timestamp"] = json!((Utc::now().timestamp() - 300).to_string());
    let (_, body) = server.post_json("/api/v1/devices/cards", stale).await;
    assert_eq!(body["code"], "stale_timestamp");

    let mut unknown = scan("1010");
    unknown["serial"] = json!("SCN-9999");
    let (status, body) = server.post_json("/api/v1/devices/cards", unknown).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unknown_device");

    let (status, body) = server
        .post_json("/api/v1/devices/cards", scan("99"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_barcode");

    // Nothing was dealt.
    let dealer = server.view_as("dealer").await;
    assert_eq!(dealer.phase, Phase::DealHoleCards);
    assert!(dealer.seats.iter().all(|seat| seat.card_count == 0));
}

#[tokio::test]
async fn test_device_identify() {
    let server = create_test_server().await;

    let (status, body) = server
        .post_json("/api/v1/devices/identify", json!({"serial": SCANNER}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"table_id": server.table_id, "type": "scanner", "seat_number": null})
    );

    let (status, body) = server
        .post_json("/api/v1/devices/identify", json!({"serial": "nope"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"ok": false, "code": "not_found"}));
}

#[tokio::test]
async fn test_video_webhook() {
    let server = create_test_server().await;
    server
        .state
        .table_manager
        .register_device(&PhysicalDevice {
            serial: "CAM-DEALER".to_string(),
            device_type: DeviceType::Dealer,
            table_id: server.table_id,
            seat_number: None,
            public_key: None,
            last_seen_at: None,
        })
        .await
        .unwrap();

    let body = json!({
        "event": "participant_joined",
        "room": {"name": format!("table-{}", server.table_id)},
        "participant": {"identity": "dealer"},
    })
    .to_string();

    // Unsigned
    let (status, _) = server
        .post_json("/api/v1/webhooks/video", serde_json::from_str(&body).unwrap())
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let exp = Utc::now().timestamp() + 60;
    let token = VideoWebhookVerifier::new(VIDEO_SECRET)
        .sign("api-key", body.as_bytes(), exp)
        .unwrap();
    let request = Request::post("/api/v1/webhooks/video")
        .header("content-type", "application/webhook+json")
        .header("authorization", token)
        .body(Body::from(body))
        .unwrap();
    let (status, response) = server.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        response["commands"],
        json!([{"serial": "CAM-DEALER", "action": "start"}])
    );
}
