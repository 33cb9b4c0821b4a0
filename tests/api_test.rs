//! HTTP surface tests driven through the axum router

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use ed25519_dalek::SigningKey;
use rand_core::OsRng;
use roulette::api::build_app;
use roulette::config::RouletteConfig;
use roulette::games::{FixedEntropy, TableAction};
use roulette::{sign_request, RouletteFactory};
use serde_json::{json, Value};
use tower::ServiceExt;

fn dev_app() -> Router {
    let runtime = RouletteFactory::build(RouletteConfig::development()).unwrap();
    build_app(&runtime)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn airdrop(app: &Router, address: &str, amount: u64) {
    let (status, _) = send(
        app,
        "POST",
        &format!("/accounts/{}/airdrop", address),
        Some(json!({ "amount": amount })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_and_positions() {
    let app = dev_app();

    let (status, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "Running");
    assert_eq!(health["entropy"], "vrf");

    let (status, positions) = send(&app, "GET", "/positions", None).await;
    assert_eq!(status, StatusCode::OK);
    let positions = positions.as_array().unwrap();
    assert_eq!(positions.len(), 13);
    assert_eq!(positions[2]["name"], "GREEN");
    assert_eq!(positions[2]["payout_multiplier"], 36);
}

#[tokio::test]
async fn test_round_over_http() {
    let app = dev_app();
    airdrop(&app, "alice", 5).await;

    let (status, created) = send(&app, "POST", "/tables", Some(json!({ "table_id": "QWER123", "signer": "alice" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["receipt"]["kind"], "created");
    assert_eq!(created["table"]["result"], -1);
    assert_eq!(created["table"]["status"], "created");

    let (status, placed) = send(
        &app,
        "POST",
        "/tables/QWER123/bets",
        Some(json!({ "position": "RED", "amount": 2, "signer": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(placed["receipt"]["accumulated"], 2);
    assert_eq!(placed["table"]["positions"][0]["position"], "RED");

    let (status, spun) = send(&app, "POST", "/tables/QWER123/spin", Some(json!({ "signer": "alice" }))).await;
    assert_eq!(status, StatusCode::OK);
    let result = spun["table"]["result"].as_i64().unwrap();
    assert!((0..=36).contains(&result));
    assert!(spun["receipt"]["spin"]["proof"]["vrf_proof"].is_string());

    let (status, claimed) = send(&app, "POST", "/tables/QWER123/claim", Some(json!({ "signer": "alice" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(claimed["table"]["positions"][0]["is_claimed"], true);

    let (status, again) = send(&app, "POST", "/tables/QWER123/claim", Some(json!({ "signer": "alice" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(again["error"]["code"], "ALREADY_CLAIMED");
    assert!(again["request_id"].is_string());
}

#[tokio::test]
async fn test_error_kinds_are_distinguishable() {
    let app = dev_app();
    airdrop(&app, "bob", 1).await;
    send(&app, "POST", "/tables", Some(json!({ "table_id": "T1", "signer": "owner" }))).await;

    let (status, body) = send(
        &app,
        "POST",
        "/tables/T1/bets",
        Some(json!({ "position": "BLUE", "amount": 2, "signer": "bob" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_POSITION");

    let (status, body) = send(
        &app,
        "POST",
        "/tables/T1/bets",
        Some(json!({ "position": "RED", "amount": 2, "signer": "bob" })),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_FUNDS");

    let (status, body) = send(&app, "POST", "/tables/T1/claim", Some(json!({ "signer": "bob" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "RESULT_NOT_READY");

    let (status, body) = send(&app, "GET", "/tables/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "TABLE_NOT_FOUND");

    let (status, body) = send(&app, "POST", "/tables", Some(json!({ "table_id": "T1", "signer": "owner" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_EXISTS");

    let (status, body) = send(
        &app,
        "POST",
        "/tables/T1/bets",
        Some(json!({ "position": "RED", "amount": 1000000, "signer": "table:T1" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "RESERVED_ADDRESS");

    let (_, table) = send(&app, "GET", "/tables/T1", None).await;
    assert_eq!(table["accumulated"], 0);
    assert_eq!(table["positions"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_signed_requests() {
    let mut config = RouletteConfig::development();
    config.api.require_signatures = true;
    let runtime = RouletteFactory::build(config).unwrap();
    let app = build_app(&runtime);

    let key = SigningKey::generate(&mut OsRng);
    let create = sign_request(&key, "SIGNED1", &TableAction::Create, 1).unwrap();
    let body = json!({
        "table_id": "SIGNED1",
        "signer": create.signer,
        "nonce": create.nonce,
        "signature": create.signature,
    });

    let (status, created) = send(&app, "POST", "/tables", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["table"]["owner"], create.signer);

    // Replaying the same envelope is refused
    let (status, replay) = send(&app, "POST", "/tables", Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(replay["error"]["code"], "STALE_NONCE");

    let (_, account) = send(&app, "GET", &format!("/accounts/{}", create.signer), None).await;
    assert_eq!(account["next_nonce"], 2);

    // Unsigned request against a signing server
    let (status, unsigned) = send(&app, "POST", "/tables/SIGNED1/spin", Some(json!({ "signer": create.signer, "nonce": 2 }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(unsigned["error"]["code"], "INVALID_SIGNATURE");
}

#[tokio::test]
async fn test_airdrop_disabled_by_default() {
    let mut config = RouletteConfig::development();
    config.api.allow_airdrop = false;
    let runtime = RouletteFactory::build(config).unwrap();
    let app = build_app(&runtime);

    let (status, body) = send(&app, "POST", "/accounts/alice/airdrop", Some(json!({ "amount": 5 }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_metrics_count_rejections() {
    let app = dev_app();
    send(&app, "POST", "/tables", Some(json!({ "table_id": "T1", "signer": "owner" }))).await;
    send(&app, "POST", "/tables/T1/spin", Some(json!({ "signer": "owner" }))).await;

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let text = String::from_utf8(to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()).unwrap();
    assert!(text.contains("roulette_tables_created_total 1"));
    assert!(text.contains("roulette_rejections_total{code=\"NO_BETS_PLACED\"} 1"));
}

#[test]
fn test_fixed_entropy_is_exported_for_downstream_tests() {
    use roulette::games::EntropySource;
    assert_eq!(FixedEntropy::constant(36).next_uniform(37, "t").unwrap().value, 36);
}
