#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use serde_json::{Value, json};
use tower::ServiceExt;

use huddle_api::state::{AppState, AppStateInner};
use huddle_store::Store;

pub const OK: u16 = 200;
pub const INPUT_ERROR: u16 = 400;
pub const FORBIDDEN: u16 = 403;

pub fn test_state() -> AppState {
    AppStateInner::new(Store::in_memory(), "http://localhost:3200")
}

pub fn test_app() -> Router {
    huddle_api::router(test_state())
}

/// Fire one request at the router and decode the JSON response.
pub async fn call(
    app: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (u16, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header("token", token);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status().as_u16();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

pub fn error_message(body: &Value) -> &str {
    body["error"]["message"].as_str().expect("error body")
}

/// Register a user and return `{ token, authUserId }`.
pub async fn register_user(
    app: &Router,
    email: &str,
    name_first: &str,
    name_last: &str,
) -> Value {
    let (status, body) = call(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({
            "email": email,
            "password": "password1",
            "nameFirst": name_first,
            "nameLast": name_last,
        })),
    )
    .await;
    assert_eq!(status, OK, "register failed: {body}");
    body
}

pub async fn create_channel(app: &Router, token: &str, name: &str, is_public: bool) -> Value {
    let (status, body) = call(
        app,
        "POST",
        "/channels/create",
        Some(token),
        Some(json!({ "name": name, "isPublic": is_public })),
    )
    .await;
    assert_eq!(status, OK, "channels/create failed: {body}");
    body
}

pub async fn create_dm(app: &Router, token: &str, u_ids: Value) -> Value {
    let (status, body) = call(
        app,
        "POST",
        "/dm/create",
        Some(token),
        Some(json!({ "uIds": u_ids })),
    )
    .await;
    assert_eq!(status, OK, "dm/create failed: {body}");
    body
}

pub async fn send_message(app: &Router, token: &str, channel_id: &Value, text: &str) -> Value {
    let (status, body) = call(
        app,
        "POST",
        "/message/send",
        Some(token),
        Some(json!({ "channelId": channel_id, "message": text })),
    )
    .await;
    assert_eq!(status, OK, "message/send failed: {body}");
    body
}

pub fn token(auth: &Value) -> &str {
    auth["token"].as_str().expect("token")
}

pub fn user_id(auth: &Value) -> Value {
    auth["authUserId"].clone()
}
