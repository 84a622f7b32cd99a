// SPDX-License-Identifier: Apache-2.0

//! Invoices, expenses, and the finance summary. All amounts are integer
//! cents; status changes flow through [`Invoice::set_status`] so `paidOn`
//! stamping stays in one place.

use crate::auth::AuthContext;
use crate::http::handlers::{
    finish, parse_doc_id, parse_json_body, propagated_request_id, store_error, validation_error,
};
use crate::*;
use chrono::{NaiveDate, Utc};
use fieldline_api::body::{require_i64, require_str};
use fieldline_api::params::{optional_param, parse_date_window};
use fieldline_model::{
    parse_document_id, parse_expense_category, parse_expense_description, summarize_finances,
    Expense, Invoice, InvoiceStatus,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;

const ROUTE_INVOICES: &str = "/v1/invoices";
const ROUTE_INVOICE: &str = "/v1/invoices/:id";
const ROUTE_INVOICE_STATUS: &str = "/v1/invoices/:id/status";
const ROUTE_EXPENSES: &str = "/v1/expenses";
const ROUTE_EXPENSE: &str = "/v1/expenses/:id";
const ROUTE_SUMMARY: &str = "/v1/finance/summary";

fn require_date(body: &Value, name: &str) -> Result<NaiveDate, ApiError> {
    require_str(body, name)?
        .parse::<NaiveDate>()
        .map_err(|_| ApiError::invalid_field(name, "expected YYYY-MM-DD"))
}

pub(crate) async fn create_invoice_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = create_invoice(&state, &context, &body).await;
    finish(&state, ROUTE_INVOICES, started, &request_id, out).await
}

async fn create_invoice(
    state: &AppState,
    context: &AuthContext,
    raw: &Bytes,
) -> Result<Response, ApiError> {
    let body = parse_json_body(raw)?;
    let client_id = parse_document_id(require_str(&body, "clientId")?)
        .map_err(|e| ApiError::invalid_field("clientId", &e.0))?;
    let amount_cents = require_i64(&body, "amountCents")?;
    let issued_on = require_date(&body, "issuedOn")?;
    let mut invoice = Invoice::new(context.company_id.clone(), client_id, amount_cents, issued_on)
        .map_err(validation_error)?;
    if body.get("workOrderId").is_some() {
        invoice.work_order_id = Some(
            parse_document_id(require_str(&body, "workOrderId")?)
                .map_err(|e| ApiError::invalid_field("workOrderId", &e.0))?,
        );
    }
    state
        .store
        .put_invoice(&invoice)
        .await
        .map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(invoice)).into_response())
}

pub(crate) async fn list_invoices_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = list_invoices(&state, &context, &params).await;
    finish(&state, ROUTE_INVOICES, started, &request_id, out).await
}

async fn list_invoices(
    state: &AppState,
    context: &AuthContext,
    params: &BTreeMap<String, String>,
) -> Result<Response, ApiError> {
    let status = match optional_param(params, "status") {
        None => None,
        Some(raw) => Some(
            InvoiceStatus::parse(raw).map_err(|e| ApiError::invalid_field("status", &e.0))?,
        ),
    };
    let invoices = state
        .store
        .list_invoices(&context.company_id, status.map(InvoiceStatus::as_str))
        .await
        .map_err(store_error)?;
    Ok(Json(json!({"invoices": invoices})).into_response())
}

pub(crate) async fn get_invoice_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = get_invoice(&state, &context, &id).await;
    finish(&state, ROUTE_INVOICE, started, &request_id, out).await
}

async fn get_invoice(
    state: &AppState,
    context: &AuthContext,
    raw_id: &str,
) -> Result<Response, ApiError> {
    let id = parse_doc_id(raw_id, "invoice")?;
    let invoice = state
        .store
        .get_invoice(&context.company_id, &id)
        .await
        .map_err(store_error)?;
    Ok(Json(invoice).into_response())
}

pub(crate) async fn invoice_status_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = invoice_status(&state, &context, &id, &body).await;
    finish(&state, ROUTE_INVOICE_STATUS, started, &request_id, out).await
}

async fn invoice_status(
    state: &AppState,
    context: &AuthContext,
    raw_id: &str,
    raw: &Bytes,
) -> Result<Response, ApiError> {
    let id = parse_doc_id(raw_id, "invoice")?;
    let body = parse_json_body(raw)?;
    let status = InvoiceStatus::parse(require_str(&body, "status")?)
        .map_err(|e| ApiError::invalid_field("status", &e.0))?;
    let mut invoice = state
        .store
        .get_invoice(&context.company_id, &id)
        .await
        .map_err(store_error)?;
    invoice.set_status(status, Utc::now().date_naive());
    state
        .store
        .put_invoice(&invoice)
        .await
        .map_err(store_error)?;
    Ok(Json(invoice).into_response())
}

pub(crate) async fn delete_invoice_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = delete_invoice(&state, &context, &id).await;
    finish(&state, ROUTE_INVOICE, started, &request_id, out).await
}

async fn delete_invoice(
    state: &AppState,
    context: &AuthContext,
    raw_id: &str,
) -> Result<Response, ApiError> {
    let id = parse_doc_id(raw_id, "invoice")?;
    state
        .store
        .delete_invoice(&context.company_id, &id)
        .await
        .map_err(store_error)?;
    Ok(Json(json!({"success": true})).into_response())
}

pub(crate) async fn create_expense_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = create_expense(&state, &context, &body).await;
    finish(&state, ROUTE_EXPENSES, started, &request_id, out).await
}

async fn create_expense(
    state: &AppState,
    context: &AuthContext,
    raw: &Bytes,
) -> Result<Response, ApiError> {
    let body = parse_json_body(raw)?;
    let description = require_str(&body, "description")?;
    let category = require_str(&body, "category")?;
    let amount_cents = require_i64(&body, "amountCents")?;
    let incurred_on = require_date(&body, "incurredOn")?;
    let expense = Expense::new(
        context.company_id.clone(),
        description,
        category,
        amount_cents,
        incurred_on,
    )
    .map_err(validation_error)?;
    state
        .store
        .put_expense(&expense)
        .await
        .map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(expense)).into_response())
}

pub(crate) async fn list_expenses_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = list_expenses(&state, &context).await;
    finish(&state, ROUTE_EXPENSES, started, &request_id, out).await
}

async fn list_expenses(state: &AppState, context: &AuthContext) -> Result<Response, ApiError> {
    let expenses = state
        .store
        .list_expenses(&context.company_id)
        .await
        .map_err(store_error)?;
    Ok(Json(json!({"expenses": expenses})).into_response())
}

pub(crate) async fn update_expense_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = update_expense(&state, &context, &id, &body).await;
    finish(&state, ROUTE_EXPENSE, started, &request_id, out).await
}

async fn update_expense(
    state: &AppState,
    context: &AuthContext,
    raw_id: &str,
    raw: &Bytes,
) -> Result<Response, ApiError> {
    let id = parse_doc_id(raw_id, "expense")?;
    let body = parse_json_body(raw)?;
    let mut expense = state
        .store
        .get_expense(&context.company_id, &id)
        .await
        .map_err(store_error)?;
    if body.get("description").is_some() {
        expense.description =
            parse_expense_description(require_str(&body, "description")?)
                .map_err(validation_error)?;
    }
    if body.get("category").is_some() {
        expense.category =
            parse_expense_category(require_str(&body, "category")?).map_err(validation_error)?;
    }
    if body.get("amountCents").is_some() {
        expense.amount_cents = require_i64(&body, "amountCents")?;
    }
    if body.get("incurredOn").is_some() {
        expense.incurred_on = require_date(&body, "incurredOn")?;
    }
    expense.validate().map_err(validation_error)?;
    expense.touch();
    state
        .store
        .put_expense(&expense)
        .await
        .map_err(store_error)?;
    Ok(Json(expense).into_response())
}

pub(crate) async fn delete_expense_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = delete_expense(&state, &context, &id).await;
    finish(&state, ROUTE_EXPENSE, started, &request_id, out).await
}

async fn delete_expense(
    state: &AppState,
    context: &AuthContext,
    raw_id: &str,
) -> Result<Response, ApiError> {
    let id = parse_doc_id(raw_id, "expense")?;
    state
        .store
        .delete_expense(&context.company_id, &id)
        .await
        .map_err(store_error)?;
    Ok(Json(json!({"success": true})).into_response())
}

pub(crate) async fn finance_summary_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = finance_summary(&state, &context, &params).await;
    finish(&state, ROUTE_SUMMARY, started, &request_id, out).await
}

async fn finance_summary(
    state: &AppState,
    context: &AuthContext,
    params: &BTreeMap<String, String>,
) -> Result<Response, ApiError> {
    let window = parse_date_window(params)?;
    let invoices = state
        .store
        .list_invoices(&context.company_id, None)
        .await
        .map_err(store_error)?;
    let expenses = state
        .store
        .list_expenses(&context.company_id)
        .await
        .map_err(store_error)?;
    let summary = summarize_finances(&invoices, &expenses, window.from, window.to);
    Ok(Json(summary).into_response())
}
