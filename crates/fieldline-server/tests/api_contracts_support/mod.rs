// SPDX-License-Identifier: Apache-2.0

//! Shared plumbing for the API contract tests: an ephemeral-port server over
//! an in-memory store and the billing fake, driven by raw HTTP/1.1.

// Each test binary compiles this module and uses its own subset of helpers.
#![allow(dead_code)]

use fieldline_server::{build_router, ApiConfig, AppState, FakeBilling};
use fieldline_store::Store;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub struct TestApp {
    pub addr: std::net::SocketAddr,
    pub billing: Arc<FakeBilling>,
    pub state: AppState,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_config(ApiConfig::default()).await
}

pub async fn spawn_app_with_config(api: ApiConfig) -> TestApp {
    let store = Store::open_in_memory().await.expect("open in-memory store");
    let billing = Arc::new(FakeBilling::default());
    let state = AppState::with_config(store, billing.clone(), api);
    let app = build_router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    TestApp {
        addr,
        billing,
        state,
    }
}

pub async fn send_raw(
    addr: std::net::SocketAddr,
    path: &str,
    headers: &[(&str, &str)],
) -> (u16, String, String) {
    send_raw_with_method(addr, "GET", path, headers, None).await
}

pub async fn send_raw_with_method(
    addr: std::net::SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<&str>,
) -> (u16, String, String) {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    if let Some(payload) = body {
        req.push_str("Content-Type: application/json\r\n");
        req.push_str(&format!("Content-Length: {}\r\n", payload.len()));
    }
    for (k, v) in headers {
        req.push_str(&format!("{k}: {v}\r\n"));
    }
    req.push_str("\r\n");
    if let Some(payload) = body {
        req.push_str(payload);
    }
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response must have separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("http status");
    (status, head.to_string(), body.to_string())
}

pub const TEST_PASSWORD: &str = "hunter22";

/// Signs up a company with one owner account; answers (companyId, userId).
pub async fn signup(
    addr: std::net::SocketAddr,
    company: &str,
    email: &str,
) -> (String, String) {
    let payload = json!({
        "name": company,
        "owner": {
            "email": email,
            "password": TEST_PASSWORD,
            "displayName": "Ana Silva",
        }
    })
    .to_string();
    let (status, _, body) =
        send_raw_with_method(addr, "POST", "/v1/companies", &[], Some(&payload)).await;
    assert_eq!(status, 201, "signup failed: {body}");
    let v: Value = serde_json::from_str(&body).expect("signup json");
    (
        v["companyId"].as_str().expect("companyId").to_string(),
        v["userId"].as_str().expect("userId").to_string(),
    )
}

pub async fn login(addr: std::net::SocketAddr, email: &str) -> String {
    let payload = json!({"email": email, "password": TEST_PASSWORD}).to_string();
    let (status, _, body) =
        send_raw_with_method(addr, "POST", "/v1/auth/login", &[], Some(&payload)).await;
    assert_eq!(status, 200, "login failed: {body}");
    let v: Value = serde_json::from_str(&body).expect("login json");
    v["token"].as_str().expect("token").to_string()
}

/// Signup plus login in one step; answers (companyId, bearer token).
pub async fn signup_and_login(
    addr: std::net::SocketAddr,
    company: &str,
    email: &str,
) -> (String, String) {
    let (company_id, _) = signup(addr, company, email).await;
    let token = login(addr, email).await;
    (company_id, token)
}

pub async fn post_json(
    addr: std::net::SocketAddr,
    path: &str,
    token: &str,
    payload: &Value,
) -> (u16, Value) {
    let auth = format!("Bearer {token}");
    let body = payload.to_string();
    let (status, _, raw) = send_raw_with_method(
        addr,
        "POST",
        path,
        &[("authorization", auth.as_str())],
        Some(&body),
    )
    .await;
    (status, parse_body(&raw))
}

pub async fn put_json(
    addr: std::net::SocketAddr,
    path: &str,
    token: &str,
    payload: &Value,
) -> (u16, Value) {
    let auth = format!("Bearer {token}");
    let body = payload.to_string();
    let (status, _, raw) = send_raw_with_method(
        addr,
        "PUT",
        path,
        &[("authorization", auth.as_str())],
        Some(&body),
    )
    .await;
    (status, parse_body(&raw))
}

pub async fn get_json(addr: std::net::SocketAddr, path: &str, token: &str) -> (u16, Value) {
    let auth = format!("Bearer {token}");
    let (status, _, raw) = send_raw(addr, path, &[("authorization", auth.as_str())]).await;
    (status, parse_body(&raw))
}

pub async fn delete_json(addr: std::net::SocketAddr, path: &str, token: &str) -> (u16, Value) {
    let auth = format!("Bearer {token}");
    let (status, _, raw) = send_raw_with_method(
        addr,
        "DELETE",
        path,
        &[("authorization", auth.as_str())],
        None,
    )
    .await;
    (status, parse_body(&raw))
}

fn parse_body(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(raw).unwrap_or_else(|e| panic!("response body not json ({e}): {raw}"))
}

/// Creates a client document for the tenant; answers its id.
pub async fn seed_client(addr: std::net::SocketAddr, token: &str, name: &str) -> String {
    let (status, body) = post_json(addr, "/v1/clients", token, &json!({"name": name})).await;
    assert_eq!(status, 201, "seed client failed: {body}");
    body["id"].as_str().expect("client id").to_string()
}
