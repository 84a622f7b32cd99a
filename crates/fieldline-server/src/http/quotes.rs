// SPDX-License-Identifier: Apache-2.0

use crate::auth::AuthContext;
use crate::http::handlers::{
    apply_optional, finish, parse_doc_id, parse_json_body, propagated_request_id, store_error,
    validation_error,
};
use crate::*;
use fieldline_api::body::{optional_array, require_i64, require_str};
use fieldline_api::params::optional_param;
use fieldline_model::{parse_document_id, QuoteItem, QuoteStatus, WorkOrder};
use fieldline_model::{parse_quote_title, Quote};
use serde_json::{json, Value};
use std::collections::BTreeMap;

const ROUTE_QUOTES: &str = "/v1/quotes";
const ROUTE_QUOTE: &str = "/v1/quotes/:id";
const ROUTE_QUOTE_STATUS: &str = "/v1/quotes/:id/status";
const ROUTE_QUOTE_CONVERT: &str = "/v1/quotes/:id/convert";

fn parse_items(body: &Value) -> Result<Vec<QuoteItem>, ApiError> {
    let Some(raw_items) = optional_array(body, "items")? else {
        return Ok(Vec::new());
    };
    let mut items = Vec::with_capacity(raw_items.len());
    for (index, raw) in raw_items.iter().enumerate() {
        if !raw.is_object() {
            return Err(ApiError::invalid_field(
                "items",
                "expected an array of objects",
            ));
        }
        let description = require_str(raw, "description")?.trim().to_string();
        let quantity = u32::try_from(require_i64(raw, "quantity")?).map_err(|_| {
            ApiError::invalid_field("items", &format!("quantity out of range at index {index}"))
        })?;
        let unit_price_cents = require_i64(raw, "unitPriceCents")?;
        items.push(QuoteItem {
            description,
            quantity,
            unit_price_cents,
        });
    }
    Ok(items)
}

fn client_id_field(body: &Value) -> Result<fieldline_model::DocumentId, ApiError> {
    parse_document_id(require_str(body, "clientId")?)
        .map_err(|e| ApiError::invalid_field("clientId", &e.0))
}

pub(crate) async fn create_quote_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = create_quote(&state, &context, &body).await;
    finish(&state, ROUTE_QUOTES, started, &request_id, out).await
}

async fn create_quote(
    state: &AppState,
    context: &AuthContext,
    raw: &Bytes,
) -> Result<Response, ApiError> {
    let body = parse_json_body(raw)?;
    let client_id = client_id_field(&body)?;
    let title = require_str(&body, "title")?;
    let items = parse_items(&body)?;
    let mut quote = Quote::new(context.company_id.clone(), client_id, title, items)
        .map_err(validation_error)?;
    apply_optional(&body, "notes", &mut quote.notes)?;
    state.store.put_quote(&quote).await.map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(quote)).into_response())
}

pub(crate) async fn list_quotes_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = list_quotes(&state, &context, &params).await;
    finish(&state, ROUTE_QUOTES, started, &request_id, out).await
}

async fn list_quotes(
    state: &AppState,
    context: &AuthContext,
    params: &BTreeMap<String, String>,
) -> Result<Response, ApiError> {
    let status = match optional_param(params, "status") {
        None => None,
        Some(raw) => Some(
            QuoteStatus::parse(raw).map_err(|e| ApiError::invalid_field("status", &e.0))?,
        ),
    };
    let quotes = state
        .store
        .list_quotes(&context.company_id, status.map(QuoteStatus::as_str))
        .await
        .map_err(store_error)?;
    Ok(Json(json!({"quotes": quotes})).into_response())
}

pub(crate) async fn get_quote_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = get_quote(&state, &context, &id).await;
    finish(&state, ROUTE_QUOTE, started, &request_id, out).await
}

async fn get_quote(
    state: &AppState,
    context: &AuthContext,
    raw_id: &str,
) -> Result<Response, ApiError> {
    let id = parse_doc_id(raw_id, "quote")?;
    let quote = state
        .store
        .get_quote(&context.company_id, &id)
        .await
        .map_err(store_error)?;
    Ok(Json(quote).into_response())
}

pub(crate) async fn update_quote_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = update_quote(&state, &context, &id, &body).await;
    finish(&state, ROUTE_QUOTE, started, &request_id, out).await
}

async fn update_quote(
    state: &AppState,
    context: &AuthContext,
    raw_id: &str,
    raw: &Bytes,
) -> Result<Response, ApiError> {
    let id = parse_doc_id(raw_id, "quote")?;
    let body = parse_json_body(raw)?;
    let mut quote = state
        .store
        .get_quote(&context.company_id, &id)
        .await
        .map_err(store_error)?;
    if body.get("title").is_some() {
        quote.title = parse_quote_title(require_str(&body, "title")?).map_err(validation_error)?;
    }
    if body.get("clientId").is_some() {
        quote.client_id = client_id_field(&body)?;
    }
    if body.get("items").is_some() {
        quote.items = parse_items(&body)?;
    }
    apply_optional(&body, "notes", &mut quote.notes)?;
    quote.validate().map_err(validation_error)?;
    quote.touch();
    state.store.put_quote(&quote).await.map_err(store_error)?;
    Ok(Json(quote).into_response())
}

pub(crate) async fn quote_status_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = quote_status(&state, &context, &id, &body).await;
    finish(&state, ROUTE_QUOTE_STATUS, started, &request_id, out).await
}

async fn quote_status(
    state: &AppState,
    context: &AuthContext,
    raw_id: &str,
    raw: &Bytes,
) -> Result<Response, ApiError> {
    let id = parse_doc_id(raw_id, "quote")?;
    let body = parse_json_body(raw)?;
    let status = QuoteStatus::parse(require_str(&body, "status")?)
        .map_err(|e| ApiError::invalid_field("status", &e.0))?;
    let mut quote = state
        .store
        .get_quote(&context.company_id, &id)
        .await
        .map_err(store_error)?;
    quote.status = status;
    quote.touch();
    state.store.put_quote(&quote).await.map_err(store_error)?;
    Ok(Json(quote).into_response())
}

pub(crate) async fn quote_convert_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = quote_convert(&state, &context, &id).await;
    finish(&state, ROUTE_QUOTE_CONVERT, started, &request_id, out).await
}

async fn quote_convert(
    state: &AppState,
    context: &AuthContext,
    raw_id: &str,
) -> Result<Response, ApiError> {
    let id = parse_doc_id(raw_id, "quote")?;
    let quote = state
        .store
        .get_quote(&context.company_id, &id)
        .await
        .map_err(store_error)?;
    let order = WorkOrder::from_quote(&quote).map_err(validation_error)?;
    state.store.put_work_order(&order).await.map_err(store_error)?;
    info!(
        company_id = %context.company_id,
        quote_id = %quote.id,
        work_order_id = %order.id,
        "quote converted to work order"
    );
    Ok((StatusCode::CREATED, Json(order)).into_response())
}

pub(crate) async fn delete_quote_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = delete_quote(&state, &context, &id).await;
    finish(&state, ROUTE_QUOTE, started, &request_id, out).await
}

async fn delete_quote(
    state: &AppState,
    context: &AuthContext,
    raw_id: &str,
) -> Result<Response, ApiError> {
    let id = parse_doc_id(raw_id, "quote")?;
    state
        .store
        .delete_quote(&context.company_id, &id)
        .await
        .map_err(store_error)?;
    Ok(Json(json!({"success": true})).into_response())
}
