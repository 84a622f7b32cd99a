// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::Ordering;

use fieldline_server::ApiConfig;
use serde_json::Value;

mod api_contracts_support;
use api_contracts_support::{
    seed_client, send_raw, signup_and_login, spawn_app, spawn_app_with_config,
};

fn metric_value(body: &str, name: &str) -> f64 {
    body.lines()
        .find(|line| line.starts_with(name))
        .and_then(|line| line.split_whitespace().last())
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or_else(|| panic!("metric {name} missing from:\n{body}"))
}

fn metric_sum(body: &str, name: &str, label_fragment: &str) -> f64 {
    body.lines()
        .filter(|line| line.starts_with(name) && line.contains(label_fragment))
        .filter_map(|line| line.split_whitespace().last())
        .filter_map(|v| v.parse::<f64>().ok())
        .sum()
}

#[tokio::test]
async fn health_and_ready_reflect_server_state() {
    let app = spawn_app().await;

    let (status, _, body) = send_raw(app.addr, "/healthz", &[]).await;
    assert_eq!(status, 200);
    assert_eq!(body, "ok");

    let (status, _, body) = send_raw(app.addr, "/readyz", &[]).await;
    assert_eq!(status, 200);
    assert_eq!(body, "ready");

    app.state.accepting_requests.store(false, Ordering::Relaxed);
    let (status, _, body) = send_raw(app.addr, "/readyz", &[]).await;
    assert_eq!(status, 503);
    assert_eq!(body, "not-ready");

    app.state.accepting_requests.store(true, Ordering::Relaxed);
    let (status, _, _) = send_raw(app.addr, "/readyz", &[]).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn version_identifies_the_crate_and_allows_caching() {
    let app = spawn_app().await;
    let (status, head, body) = send_raw(app.addr, "/v1/version", &[]).await;
    assert_eq!(status, 200);
    let parsed: Value = serde_json::from_str(&body).expect("version json");
    assert_eq!(parsed["name"], "fieldline-server");
    assert_eq!(parsed["version"], env!("CARGO_PKG_VERSION"));
    assert!(
        head.to_ascii_lowercase()
            .contains("cache-control: public, max-age=30"),
        "missing cache header in:\n{head}"
    );
}

#[tokio::test]
async fn every_response_carries_a_request_id() {
    let app = spawn_app().await;
    for path in ["/healthz", "/readyz", "/metrics", "/v1/version"] {
        let (_, head, _) = send_raw(app.addr, path, &[]).await;
        assert!(
            head.to_ascii_lowercase().contains("x-request-id: req-"),
            "{path} response lacks a generated request id:\n{head}"
        );
    }

    // Middleware rejections are stamped too.
    let (status, head, _) = send_raw(app.addr, "/v1/clients", &[]).await;
    assert_eq!(status, 401);
    assert!(head.to_ascii_lowercase().contains("x-request-id: req-"));
}

#[tokio::test]
async fn explicit_request_ids_are_preserved() {
    let app = spawn_app().await;
    let (_, head, _) = send_raw(app.addr, "/healthz", &[("x-request-id", "trace-abc-123")]).await;
    assert!(
        head.to_ascii_lowercase().contains("x-request-id: trace-abc-123"),
        "caller id not echoed:\n{head}"
    );
}

#[tokio::test]
async fn metrics_expose_gauges_and_traffic_counters() {
    let app = spawn_app().await;
    for _ in 0..3 {
        send_raw(app.addr, "/healthz", &[]).await;
    }

    let (status, _, body) = send_raw(app.addr, "/metrics", &[]).await;
    assert_eq!(status, 200);
    assert_eq!(metric_value(&body, "fieldline_server_ready"), 1.0);
    assert_eq!(metric_value(&body, "fieldline_server_accepting_requests"), 1.0);
    let healthz_hits = metric_sum(
        &body,
        "fieldline_http_requests_total",
        "route=\"/healthz\",status=\"200\"",
    );
    assert!(healthz_hits >= 3.0, "expected healthz traffic in:\n{body}");
    assert!(
        body.lines().any(|line| {
            line.starts_with("fieldline_http_request_latency_p95_seconds")
                && line.contains("route=\"/healthz\"")
        }),
        "latency series missing:\n{body}"
    );

    app.state.accepting_requests.store(false, Ordering::Relaxed);
    let (_, _, body) = send_raw(app.addr, "/metrics", &[]).await;
    assert_eq!(metric_value(&body, "fieldline_server_accepting_requests"), 0.0);
}

#[tokio::test]
async fn error_responses_are_counted_by_status() {
    let app = spawn_app().await;
    let (_, token) = signup_and_login(app.addr, "Acme Glass", "ana@acme-glass.example").await;
    let auth = format!("Bearer {token}");
    let (status, _, _) = send_raw(
        app.addr,
        "/v1/clients/not-a-ulid",
        &[("authorization", auth.as_str())],
    )
    .await;
    assert_eq!(status, 404);

    let (_, _, body) = send_raw(app.addr, "/metrics", &[]).await;
    let not_found_hits = metric_sum(
        &body,
        "fieldline_http_requests_total",
        "route=\"/v1/clients/:id\",status=\"404\"",
    );
    assert!(not_found_hits >= 1.0, "404 not counted in:\n{body}");
}

#[tokio::test]
async fn debug_tenants_is_gated_by_config() {
    let app = spawn_app().await;
    let (status, _, body) = send_raw(app.addr, "/debug/tenants?companyId=acme", &[]).await;
    assert_eq!(status, 404);
    let parsed: Value = serde_json::from_str(&body).expect("error json");
    assert_eq!(parsed["error"]["message"], "debug endpoint disabled");

    let app = spawn_app_with_config(ApiConfig {
        enable_debug_endpoints: true,
        ..ApiConfig::default()
    })
    .await;
    let (company_id, token) =
        signup_and_login(app.addr, "Acme Glass", "ana@acme-glass.example").await;
    seed_client(app.addr, &token, "Rivera Bakery").await;

    let (status, _, body) = send_raw(
        app.addr,
        &format!("/debug/tenants?companyId={company_id}"),
        &[],
    )
    .await;
    assert_eq!(status, 200, "debug counts failed: {body}");
    let parsed: Value = serde_json::from_str(&body).expect("counts json");
    assert_eq!(parsed["companyId"], company_id.as_str());
    assert_eq!(parsed["documents"]["clients"], 1);
    assert_eq!(parsed["documents"]["quotes"], 0);

    let (status, _, _) = send_raw(app.addr, "/debug/tenants", &[]).await;
    assert_eq!(status, 400);
}
