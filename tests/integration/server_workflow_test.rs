//! End-to-end workflows against the composed router and a real database.
//!
//! These tests need a reachable PostgreSQL (`DATABASE_URL`) with migrations
//! applied, so they are ignored by default — run locally with
//! `cargo test -- --ignored`.

mod common;

use common::{registration_envelope, TestClient, MASTER_PASSWORD};

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use statesync_common::Config;

fn test_config() -> Config {
    Config {
        database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL required"),
        master_password: MASTER_PASSWORD.to_string(),
        external_url: "http://localhost:4545".to_string(),
        allowed_origins: vec!["http://localhost:4545".to_string()],
        jwt_expiration_hours: 24,
        challenge_ttl_sec: 300,
        registration_token_ttl_sec: 10,
        event_retention_days: 7,
        sweep_hour_local: 2,
        log_level: "info".to_string(),
        port: 4545,
    }
}

async fn test_app() -> (Router, PgPool) {
    let config = test_config();
    let pool = PgPool::connect(&config.database_url).await.expect("connect");
    statesync_app::migrate(&pool).await.expect("migrations");
    let app = statesync_app::create_app(config, pool.clone())
        .await
        .expect("create app");
    // Background sweeper is irrelevant here; drop its handle with the app
    (app.router, pool)
}

fn request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

/// Bootstrap an owner account and log it in; returns the session token.
async fn login_owner(router: &Router, client: &TestClient, username: &str) -> String {
    let envelope = registration_envelope(MASTER_PASSWORD, client, username);
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/users/owners/register")
                .header("x-registration-token", envelope)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    login(router, client).await
}

/// Challenge-response login for an existing user.
async fn login(router: &Router, client: &TestClient) -> String {
    let uri = format!(
        "/users/challenge?publicKey={}",
        urlencode(&client.public_pem)
    );
    let response = router
        .clone()
        .oneshot(request("GET", &uri, None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let challenge = body_json(response).await;

    let assertion = client.login_assertion(
        challenge["challenge"].as_str().unwrap(),
        chrono::Utc::now().timestamp(),
    );
    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/users/auth",
            None,
            Some(json!({ "assertion": assertion })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session = body_json(response).await;
    session["token"].as_str().unwrap().to_string()
}

fn urlencode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            other => format!("%{:02X}", other),
        })
        .collect()
}

async fn submit_event(router: &Router, token: &str, body: Value) -> Response<Body> {
    router
        .clone()
        .oneshot(request("POST", "/events", Some(token), Some(body)))
        .await
        .unwrap()
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL pointing at a migratable PostgreSQL
async fn test_full_collaboration_workflow() {
    let (router, _pool) = test_app().await;
    let run = Uuid::new_v4().simple().to_string();
    let app_id = format!("app-{}", run);

    // --- Owner bootstrap + login -----------------------------------------
    let owner = TestClient::generate();
    let owner_token = login_owner(&router, &owner, &format!("owner-{}", run)).await;

    // --- Register an application with exactly one owner ------------------
    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/applications/register",
            Some(&owner_token),
            Some(json!({
                "id": app_id,
                "name": "Workflow Test",
                "members": [{
                    "id": "m-1",
                    "name": "Owner",
                    "role": "owner",
                    "publicKey": owner.public_pem,
                }],
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // A roster without an owner is rejected outright
    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/applications/register",
            Some(&owner_token),
            Some(json!({
                "id": format!("app2-{}", run),
                "name": "No Owner",
                "members": [{
                    "id": "m-1",
                    "name": "Only Member",
                    "role": "member",
                    "publicKey": owner.public_pem,
                }],
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // --- Events: accept, sequence, read back ------------------------------
    for n in 1..=3 {
        let response = submit_event(
            &router,
            &owner_token,
            json!({
                "id": format!("evt-{}-{}", run, n),
                "type": "application_data_changed",
                "version": 1,
                "data": { "applicationId": app_id },
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let accepted = body_json(response).await;
        assert_eq!(accepted["accepted"], true);
        assert_eq!(accepted["sequence"], n);
    }

    // Full read: three events, densely numbered from 1
    let response = router
        .clone()
        .oneshot(request("GET", "/events", Some(&owner_token), None))
        .await
        .unwrap();
    let page = body_json(response).await;
    let events = page["events"].as_array().unwrap();
    assert_eq!(events.len(), 3);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event["sequenceNumber"], (i + 1) as i64);
    }
    assert_eq!(page["hasMore"], false);

    // Cursor read: strictly after the first event
    let cursor = events[0]["id"].as_str().unwrap();
    let response = router
        .clone()
        .oneshot(request(
            "GET",
            &format!("/events?since={}", cursor),
            Some(&owner_token),
            None,
        ))
        .await
        .unwrap();
    let page = body_json(response).await;
    let tail = page["events"].as_array().unwrap();
    assert_eq!(tail.len(), 2);
    assert_eq!(tail[0]["sequenceNumber"], 2);

    // A cursor that no longer resolves demands a resync
    let response = router
        .clone()
        .oneshot(request(
            "GET",
            "/events?since=evt-that-never-existed",
            Some(&owner_token),
            None,
        ))
        .await
        .unwrap();
    let page = body_json(response).await;
    assert_eq!(page["fullResyncRequired"], true);
    assert_eq!(page["reason"], "cursor expired or gap");

    // --- Invitation: create, join, idempotent rejoin ----------------------
    let response = router
        .clone()
        .oneshot(request(
            "POST",
            &format!("/applications/{}/invites", app_id),
            Some(&owner_token),
            Some(json!({ "role": "member", "maxUses": 2 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let invite = body_json(response).await;
    let invite_token = invite["token"].as_str().unwrap().to_string();

    let guest = TestClient::generate();
    let join_body = json!({
        "publicKey": guest.public_pem,
        "username": format!("guest-{}", run),
    });

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            &format!("/invites/{}/join", invite_token),
            None,
            Some(join_body.clone()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let joined = body_json(response).await;
    assert_eq!(joined["isNewMember"], true);
    assert_eq!(joined["applicationId"], app_id.as_str());

    // Second join with the same key is success without a second membership
    let response = router
        .clone()
        .oneshot(request(
            "POST",
            &format!("/invites/{}/join", invite_token),
            None,
            Some(join_body),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let rejoined = body_json(response).await;
    assert_eq!(rejoined["isNewMember"], false);

    // --- Authorization: member cannot delete the application --------------
    let guest_token = login(&router, &guest).await;
    let response = submit_event(
        &router,
        &guest_token,
        json!({
            "id": format!("evt-{}-del", run),
            "type": "application_deleted",
            "version": 1,
            "data": { "applicationId": app_id },
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let rejected = body_json(response).await;
    assert_eq!(rejected["accepted"], false);
    assert_eq!(rejected["reason"], "unauthorized");

    // The application is untouched
    let response = router
        .clone()
        .oneshot(request(
            "GET",
            &format!("/applications/{}", app_id),
            Some(&owner_token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let full = body_json(response).await;
    assert_eq!(full["members"].as_array().unwrap().len(), 2);
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL pointing at a migratable PostgreSQL
async fn test_concurrent_submitters_get_dense_sequences() {
    let (router, _pool) = test_app().await;
    let run = Uuid::new_v4().simple().to_string();
    let app_id = format!("race-{}", run);

    let owner = TestClient::generate();
    let owner_token = login_owner(&router, &owner, &format!("racer-{}", run)).await;

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/applications/register",
            Some(&owner_token),
            Some(json!({
                "id": app_id,
                "name": "Race",
                "members": [{
                    "id": "m-1",
                    "name": "Owner",
                    "role": "owner",
                    "publicKey": owner.public_pem,
                }],
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Ten concurrent submissions; all accepted, sequences a permutation of 1..=10
    let mut handles = Vec::new();
    for n in 0..10 {
        let router = router.clone();
        let token = owner_token.clone();
        let body = json!({
            "id": format!("evt-{}-{}", run, n),
            "type": "application_data_changed",
            "version": 1,
            "data": { "applicationId": app_id },
        });
        handles.push(tokio::spawn(async move {
            let response = router
                .oneshot(request("POST", "/events", Some(&token), Some(body)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            body_json(response).await["sequence"].as_i64().unwrap()
        }));
    }

    let mut sequences = Vec::new();
    for handle in handles {
        sequences.push(handle.await.unwrap());
    }
    sequences.sort_unstable();
    assert_eq!(sequences, (1..=10).collect::<Vec<i64>>());
}
