//! REST surface tests driven through the router

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use nexus_core::{Environment, Role, UserId};
use nexus_presence_sdk::{routes, RosterResponse, StatsResponse};
use presence_service::auth::{InMemoryUserDirectory, UserRecord};
use presence_service::{PresenceConfig, PresenceService};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn user(id: &str, role: Role) -> UserRecord {
    UserRecord {
        id: UserId::new(id),
        name: format!("User {}", id),
        email: format!("{}@nexus.test", id),
        role,
    }
}

fn service_with(environment: Environment, users: &[UserRecord]) -> PresenceService {
    let directory = InMemoryUserDirectory::new();
    for record in users {
        directory.insert(record.clone());
    }
    let config = PresenceConfig {
        environment,
        ..Default::default()
    };
    PresenceService::with_directory(config, Some(Arc::new(directory)))
}

fn bearer(service: &PresenceService, record: &UserRecord) -> String {
    format!("Bearer {}", service.tokens().issue(record).unwrap())
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn announce(path: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(path: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header(header::AUTHORIZATION, token)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_is_plain_ok() {
    let service = service_with(Environment::Production, &[]);
    let response = service
        .router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn test_announce_without_token_is_unauthorized() {
    let service = service_with(Environment::Production, &[]);
    let router = service.router();

    let (status, body) = send(&router, announce(routes::ONLINE, None, json!({"action": "online"}))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "AUTH_ERROR");
    assert!(service.store().is_empty());
}

#[tokio::test]
async fn test_unknown_subject_is_forbidden() {
    let service = service_with(Environment::Production, &[]);
    let router = service.router();
    let token = bearer(&service, &user("ghost", Role::Admin));

    let (status, body) = send(
        &router,
        announce(routes::ONLINE, Some(&token), json!({"action": "online"})),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_invalid_action_is_rejected() {
    let admin = user("a1", Role::Admin);
    let service = service_with(Environment::Production, &[admin.clone()]);
    let router = service.router();
    let token = bearer(&service, &admin);

    let (status, body) = send(
        &router,
        announce(routes::ONLINE, Some(&token), json!({"action": "away"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(service.store().is_empty());
}

#[tokio::test]
async fn test_online_then_offline_through_both_routes() {
    let admin = user("a1", Role::Admin);
    let service = service_with(Environment::Production, &[admin.clone()]);
    let router = service.router();
    let token = bearer(&service, &admin);

    let (status, body) = send(
        &router,
        announce(routes::ONLINE, Some(&token), json!({"action": "online"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalOnline"], 1);

    let (status, _) = send(
        &router,
        announce(routes::HEARTBEAT, Some(&token), json!({"action": "heartbeat"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(service.store().len(), 1);

    let (status, body) = send(
        &router,
        announce(routes::ONLINE, Some(&token), json!({"action": "offline"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalOnline"], 0);
    assert!(service.store().get(&admin.id).is_none());
}

#[tokio::test]
async fn test_roster_is_role_gated_but_stats_are_not() {
    let admin = user("a1", Role::Admin);
    let customer = user("c1", Role::Customer);
    let service = service_with(Environment::Production, &[admin.clone(), customer.clone()]);
    let router = service.router();
    let admin_token = bearer(&service, &admin);
    let customer_token = bearer(&service, &customer);

    for token in [&admin_token, &customer_token] {
        send(&router, announce(routes::ONLINE, Some(token), json!({"action": "online"}))).await;
    }

    let (_, body) = send(&router, get(routes::ROSTER, &customer_token)).await;
    let roster: RosterResponse = serde_json::from_value(body).unwrap();
    assert!(roster.success);
    assert!(roster.data.is_empty());
    assert_eq!(roster.total, 0);

    let (_, body) = send(&router, get(routes::ROSTER, &admin_token)).await;
    let roster: RosterResponse = serde_json::from_value(body).unwrap();
    assert_eq!(roster.total, 2);

    let (status, body) = send(&router, get(routes::STATS, &customer_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["lastCleanup"].is_i64());
    let stats: StatsResponse = serde_json::from_value(body).unwrap();
    assert_eq!(stats.data.snapshot.total, 2);
    assert_eq!(stats.data.snapshot.count_for(&Role::Customer), 1);
    assert_eq!(stats.data.snapshot.count_for(&Role::Admin), 1);
    assert_eq!(stats.data.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_debug_view_requires_admin_in_production() {
    let admin = user("a1", Role::Admin);
    let staff = user("s1", Role::InternalUser);
    let service = service_with(Environment::Production, &[admin.clone(), staff.clone()]);
    let router = service.router();

    let (status, _) = send(&router, get(routes::DEBUG, &bearer(&service, &staff))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&router, get(routes::DEBUG, &bearer(&service, &admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn test_debug_view_open_in_development() {
    let customer = user("c1", Role::Customer);
    let service = service_with(Environment::Development, &[customer.clone()]);
    let router = service.router();
    let token = bearer(&service, &customer);

    send(&router, announce(routes::ONLINE, Some(&token), json!({"action": "online"}))).await;
    let (status, body) = send(&router, get(routes::DEBUG, &token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["users"][0]["userId"], "c1");
    assert!(body["data"]["users"][0]["inactiveForMs"].is_i64());
}
