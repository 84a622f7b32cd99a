use crate::*;
use fieldline_api::VersionResponse;
use fieldline_model::ValidationError;
use serde_json::json;
use serde_json::Value;
use std::collections::BTreeMap;

pub(crate) fn api_error_response(status: StatusCode, err: ApiError) -> Response {
    let body = Json(json!({"error": err}));
    (status, body).into_response()
}

pub(crate) fn error_status(err: &ApiError) -> StatusCode {
    StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

pub(crate) fn validation_error(err: ValidationError) -> ApiError {
    ApiError::validation(&err.0)
}

pub(crate) fn store_error(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound(what) => ApiError::not_found(what),
        StoreError::EmailExists => ApiError::new(
            ApiErrorCode::EmailAlreadyExists,
            "a user with this email already exists",
            Value::Null,
        ),
        StoreError::Backend(msg) => {
            error!(error = %msg, "store backend failure");
            ApiError::internal("storage failure")
        }
    }
}

/// Provider failures are logged and surfaced with the provider's own
/// message, unmodified.
pub(crate) fn billing_error(err: BillingError) -> ApiError {
    error!(error = %err, "billing provider call failed");
    ApiError::billing_upstream(&err.0)
}

pub(crate) fn parse_json_body(raw: &Bytes) -> Result<Value, ApiError> {
    if raw.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(raw)
        .map_err(|e| ApiError::validation(&format!("request body is not valid JSON: {e}")))
}

/// Document ids are opaque; anything that does not parse cannot name a
/// stored document, so it reads as not-found rather than invalid.
pub(crate) fn parse_doc_id(
    raw: &str,
    what: &'static str,
) -> Result<fieldline_model::DocumentId, ApiError> {
    fieldline_model::parse_document_id(raw).map_err(|_| ApiError::not_found(what))
}

/// Shallow merge for updates: absent keys keep the stored value, `null`
/// clears, a string overwrites (blank strings clear).
pub(crate) fn apply_optional(
    body: &Value,
    name: &str,
    slot: &mut Option<String>,
) -> Result<(), ApiError> {
    if body.get(name).is_none() {
        return Ok(());
    }
    *slot = fieldline_api::body::optional_str(body, name)?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    Ok(())
}

pub(crate) fn make_request_id(state: &AppState) -> String {
    let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
    format!("req-{id:016x}")
}

pub(crate) fn propagated_request_id(headers: &HeaderMap, state: &AppState) -> String {
    if let Some(raw) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    make_request_id(state)
}

pub(crate) fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(v) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert("x-request-id", v);
    }
    response
}

pub(crate) fn is_draining(state: &AppState) -> bool {
    !state.accepting_requests.load(Ordering::Relaxed)
}

/// Converts a handler outcome into the wire response, records it in the
/// request metrics, and stamps the request id header.
pub(crate) async fn finish(
    state: &AppState,
    route: &'static str,
    started: Instant,
    request_id: &str,
    result: Result<Response, ApiError>,
) -> Response {
    let resp = match result {
        Ok(resp) => resp,
        Err(err) => api_error_response(error_status(&err), err),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request(route, status, started.elapsed())
        .await;
    with_request_id(resp, request_id)
}

pub(crate) async fn healthz_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let request_id = propagated_request_id(&headers, &state);
    let started = Instant::now();
    let resp = (StatusCode::OK, "ok").into_response();
    state
        .metrics
        .observe_request("/healthz", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn readyz_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let request_id = propagated_request_id(&headers, &state);
    let started = Instant::now();
    if state.ready.load(Ordering::Relaxed) && state.accepting_requests.load(Ordering::Relaxed) {
        let resp = (StatusCode::OK, "ready").into_response();
        state
            .metrics
            .observe_request("/readyz", StatusCode::OK, started.elapsed())
            .await;
        with_request_id(resp, &request_id)
    } else {
        let resp = (StatusCode::SERVICE_UNAVAILABLE, "not-ready").into_response();
        state
            .metrics
            .observe_request("/readyz", StatusCode::SERVICE_UNAVAILABLE, started.elapsed())
            .await;
        with_request_id(resp, &request_id)
    }
}

pub(crate) async fn version_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let request_id = propagated_request_id(&headers, &state);
    let started = Instant::now();
    let payload = VersionResponse {
        name: CRATE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let mut response = Json(payload).into_response();
    if let Ok(value) = HeaderValue::from_str("public, max-age=30") {
        response.headers_mut().insert("cache-control", value);
    }
    state
        .metrics
        .observe_request("/v1/version", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(response, &request_id)
}

pub(crate) async fn metrics_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    crate::telemetry::metrics_endpoint::metrics_handler(State(state), headers).await
}

pub(crate) async fn debug_tenants_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    if !state.api.enable_debug_endpoints {
        let resp = api_error_response(
            StatusCode::NOT_FOUND,
            ApiError::new(ApiErrorCode::NotFound, "debug endpoint disabled", json!({})),
        );
        state
            .metrics
            .observe_request("/debug/tenants", StatusCode::NOT_FOUND, started.elapsed())
            .await;
        return with_request_id(resp, &request_id);
    }
    let out = debug_tenants(&state, &params).await;
    finish(&state, "/debug/tenants", started, &request_id, out).await
}

async fn debug_tenants(
    state: &AppState,
    params: &BTreeMap<String, String>,
) -> Result<Response, ApiError> {
    let raw = fieldline_api::params::optional_param(params, "companyId")
        .ok_or_else(|| ApiError::missing_field("companyId"))?;
    let company_id = fieldline_model::parse_company_id(raw).map_err(validation_error)?;
    let counts = state
        .store
        .tenant_counts(&company_id)
        .await
        .map_err(store_error)?;
    Ok(Json(json!({"companyId": company_id, "documents": counts})).into_response())
}
