use crate::auth::AuthContext;
use crate::http::handlers::{
    apply_optional, finish, parse_doc_id, parse_json_body, propagated_request_id, store_error,
    validation_error,
};
use crate::*;
use chrono::NaiveDate;
use fieldline_api::body::{optional_str, require_str};
use fieldline_api::params::optional_param;
use fieldline_model::{parse_document_id, parse_quote_title, WorkOrder, WorkOrderStatus};
use serde_json::{json, Value};
use std::collections::BTreeMap;

const ROUTE_WORK_ORDERS: &str = "/v1/work-orders";
const ROUTE_WORK_ORDER: &str = "/v1/work-orders/:id";
const ROUTE_WORK_ORDER_STATUS: &str = "/v1/work-orders/:id/status";

fn apply_scheduled_for(body: &Value, slot: &mut Option<NaiveDate>) -> Result<(), ApiError> {
    if body.get("scheduledFor").is_none() {
        return Ok(());
    }
    *slot = match optional_str(body, "scheduledFor")? {
        None => None,
        Some(raw) => Some(raw.parse::<NaiveDate>().map_err(|_| {
            ApiError::invalid_field("scheduledFor", "expected YYYY-MM-DD")
        })?),
    };
    Ok(())
}

pub(crate) async fn create_work_order_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = create_work_order(&state, &context, &body).await;
    finish(&state, ROUTE_WORK_ORDERS, started, &request_id, out).await
}

async fn create_work_order(
    state: &AppState,
    context: &AuthContext,
    raw: &Bytes,
) -> Result<Response, ApiError> {
    let body = parse_json_body(raw)?;
    let client_id = parse_document_id(require_str(&body, "clientId")?)
        .map_err(|e| ApiError::invalid_field("clientId", &e.0))?;
    let title = require_str(&body, "title")?;
    let mut order = WorkOrder::new(context.company_id.clone(), client_id, title)
        .map_err(validation_error)?;
    apply_scheduled_for(&body, &mut order.scheduled_for)?;
    apply_optional(&body, "notes", &mut order.notes)?;
    state
        .store
        .put_work_order(&order)
        .await
        .map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(order)).into_response())
}

pub(crate) async fn list_work_orders_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = list_work_orders(&state, &context, &params).await;
    finish(&state, ROUTE_WORK_ORDERS, started, &request_id, out).await
}

async fn list_work_orders(
    state: &AppState,
    context: &AuthContext,
    params: &BTreeMap<String, String>,
) -> Result<Response, ApiError> {
    let status = match optional_param(params, "status") {
        None => None,
        Some(raw) => Some(
            WorkOrderStatus::parse(raw).map_err(|e| ApiError::invalid_field("status", &e.0))?,
        ),
    };
    let orders = state
        .store
        .list_work_orders(&context.company_id, status.map(WorkOrderStatus::as_str))
        .await
        .map_err(store_error)?;
    Ok(Json(json!({"workOrders": orders})).into_response())
}

pub(crate) async fn get_work_order_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = get_work_order(&state, &context, &id).await;
    finish(&state, ROUTE_WORK_ORDER, started, &request_id, out).await
}

async fn get_work_order(
    state: &AppState,
    context: &AuthContext,
    raw_id: &str,
) -> Result<Response, ApiError> {
    let id = parse_doc_id(raw_id, "work order")?;
    let order = state
        .store
        .get_work_order(&context.company_id, &id)
        .await
        .map_err(store_error)?;
    Ok(Json(order).into_response())
}

pub(crate) async fn update_work_order_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = update_work_order(&state, &context, &id, &body).await;
    finish(&state, ROUTE_WORK_ORDER, started, &request_id, out).await
}

async fn update_work_order(
    state: &AppState,
    context: &AuthContext,
    raw_id: &str,
    raw: &Bytes,
) -> Result<Response, ApiError> {
    let id = parse_doc_id(raw_id, "work order")?;
    let body = parse_json_body(raw)?;
    let mut order = state
        .store
        .get_work_order(&context.company_id, &id)
        .await
        .map_err(store_error)?;
    if body.get("title").is_some() {
        order.title = parse_quote_title(require_str(&body, "title")?).map_err(validation_error)?;
    }
    if body.get("clientId").is_some() {
        order.client_id = parse_document_id(require_str(&body, "clientId")?)
            .map_err(|e| ApiError::invalid_field("clientId", &e.0))?;
    }
    apply_scheduled_for(&body, &mut order.scheduled_for)?;
    apply_optional(&body, "notes", &mut order.notes)?;
    order.touch();
    state
        .store
        .put_work_order(&order)
        .await
        .map_err(store_error)?;
    Ok(Json(order).into_response())
}

pub(crate) async fn work_order_status_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = work_order_status(&state, &context, &id, &body).await;
    finish(&state, ROUTE_WORK_ORDER_STATUS, started, &request_id, out).await
}

async fn work_order_status(
    state: &AppState,
    context: &AuthContext,
    raw_id: &str,
    raw: &Bytes,
) -> Result<Response, ApiError> {
    let id = parse_doc_id(raw_id, "work order")?;
    let body = parse_json_body(raw)?;
    let status = WorkOrderStatus::parse(require_str(&body, "status")?)
        .map_err(|e| ApiError::invalid_field("status", &e.0))?;
    let mut order = state
        .store
        .get_work_order(&context.company_id, &id)
        .await
        .map_err(store_error)?;
    order.status = status;
    order.touch();
    state
        .store
        .put_work_order(&order)
        .await
        .map_err(store_error)?;
    Ok(Json(order).into_response())
}

pub(crate) async fn delete_work_order_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = delete_work_order(&state, &context, &id).await;
    finish(&state, ROUTE_WORK_ORDER, started, &request_id, out).await
}

async fn delete_work_order(
    state: &AppState,
    context: &AuthContext,
    raw_id: &str,
) -> Result<Response, ApiError> {
    let id = parse_doc_id(raw_id, "work order")?;
    state
        .store
        .delete_work_order(&context.company_id, &id)
        .await
        .map_err(store_error)?;
    Ok(Json(json!({"success": true})).into_response())
}
