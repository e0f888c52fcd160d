//! HTTP surface tests: the router driven in-process with bearer tokens

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use circulation_server::{
    api,
    config::{AppConfig, EmailConfig},
    models::{enums::Role, member::MemberClaims},
    repository::Repository,
    services::Services,
    AppState,
};

use common::*;

struct TestApp {
    harness: Harness,
    router: Router,
    secret: String,
}

impl TestApp {
    /// Router over the seeded store, with the inbox notifier wired in
    async fn new() -> Self {
        let harness = Harness::new().await;
        let config = AppConfig::default();
        let secret = config.auth.jwt_secret.clone();
        let services = Services::new(
            Repository::in_memory(harness.store.clone()),
            EmailConfig::default(),
            harness.clock.clone(),
        );
        let router = api::router(AppState {
            config: Arc::new(config),
            services: Arc::new(services),
        });
        Self {
            harness,
            router,
            secret,
        }
    }

    fn token(&self, member_id: i32, role: Role) -> String {
        let now = Utc::now().timestamp();
        MemberClaims {
            sub: format!("member-{}", member_id),
            member_id,
            role,
            exp: now + 3600,
            iat: now,
        }
        .create_token(&self.secret)
        .unwrap()
    }

    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;

    let (status, body) = app.send("GET", "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.send("GET", "/api/v1/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_requests_need_a_valid_token() {
    let app = TestApp::new().await;
    let reserve = json!({ "member_id": ADA, "book_id": DUNE });

    let (status, _) = app.send("POST", "/api/v1/borrowings/reserve", None, Some(reserve.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send("POST", "/api/v1/borrowings/reserve", Some("not-a-jwt"), Some(reserve))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 2);
}

#[tokio::test]
async fn test_reserve_then_expired_pickup() {
    let app = TestApp::new().await;
    let ada = app.token(ADA, Role::Member);
    let staff = app.token(LIBRARIAN, Role::Librarian);

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/borrowings/reserve",
            Some(&ada),
            Some(json!({ "member_id": ADA, "book_id": DUNE, "copy_id": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "Reserved");
    let id = body["id"].as_i64().unwrap();

    let pickup = format!("/api/v1/borrowings/{}/pickup", id);
    let (status, _) = app.send("POST", &pickup, Some(&ada), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.harness.clock.advance(Duration::hours(25));
    let (status, body) = app.send("POST", &pickup, Some(&staff), None).await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["code"], 7);

    let (status, body) = app
        .send("GET", &format!("/api/v1/borrowings/{}", id), Some(&ada), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Cancelled");
}

#[tokio::test]
async fn test_unavailable_copy_is_a_conflict() {
    let app = TestApp::new().await;
    let staff = app.token(LIBRARIAN, Role::Librarian);
    let checkout = json!({ "member_id": ADA, "book_id": SOLARIS, "copy_id": 1 });

    let (status, _) = app
        .send("POST", "/api/v1/borrowings/direct", Some(&staff), Some(checkout.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send("POST", "/api/v1/borrowings/direct", Some(&staff), Some(checkout))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 6);

    let (status, _) = app.send("GET", "/api/v1/borrowings/999", Some(&staff), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_notices_land_in_the_inbox() {
    let app = TestApp::new().await;
    let ada = app.token(ADA, Role::Member);
    let staff = app.token(LIBRARIAN, Role::Librarian);

    let (status, _) = app
        .send(
            "POST",
            "/api/v1/borrowings/reserve",
            Some(&ada),
            Some(json!({ "member_id": ADA, "book_id": DUNE })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.send("GET", "/api/v1/notifications", Some(&ada), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["type"], "RESERVATION_SUCCESS");

    let (_, body) = app.send("GET", "/api/v1/notifications", Some(&staff), None).await;
    assert_eq!(body["items"][0]["type"], "NEW_RESERVATION_ADMIN");

    let (status, body) = app.send("PUT", "/api/v1/notifications/read-all", Some(&ada), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 1);
}

#[tokio::test]
async fn test_admin_only_endpoints() {
    let app = TestApp::new().await;
    let staff = app.token(LIBRARIAN, Role::Librarian);
    let admin = app.token(ADMIN, Role::Admin);
    let update = json!({ "max_books_per_user": 3 });

    let (status, _) = app.send("PUT", "/api/v1/settings", Some(&staff), Some(update.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send("PUT", "/api/v1/settings", Some(&admin), Some(update)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["max_books_per_user"], 3);

    let (status, _) = app.send("POST", "/api/v1/admin/sweeps", Some(&staff), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send("POST", "/api/v1/admin/sweeps", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let sweeps: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["sweep"].as_str().unwrap())
        .collect();
    assert_eq!(
        sweeps,
        vec!["overdue", "expired_reservations", "return_reminders", "pickup_reminders"]
    );
}

#[tokio::test]
async fn test_copy_management() {
    let app = TestApp::new().await;
    let staff = app.token(LIBRARIAN, Role::Librarian);
    let ada = app.token(ADA, Role::Member);

    let (status, _) = app
        .send("POST", "/api/v1/books/1/copies", Some(&ada), Some(json!({ "location": "Annex" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send("POST", "/api/v1/books/1/copies", Some(&staff), Some(json!({ "location": "" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send("POST", "/api/v1/books/1/copies", Some(&staff), Some(json!({ "location": "Annex" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["copy_id"], 3);
    assert_eq!(body["status"], "Available");

    let (status, body) = app.send("GET", "/api/v1/books/1/copies", Some(&ada), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (status, _) = app
        .send(
            "PUT",
            "/api/v1/books/1/copies/3",
            Some(&staff),
            Some(json!({ "status": "Borrowed" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
