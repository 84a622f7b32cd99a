// SPDX-License-Identifier: Apache-2.0

//! Billing routes. Paths and payloads mirror the hosted billing integration
//! these handlers replaced, so clients keep their `/api/stripe/*` calls.

use crate::http::handlers::{
    api_error_response, billing_error, finish, is_draining, parse_json_body,
    propagated_request_id, store_error, validation_error, with_request_id,
};
use crate::*;
use fieldline_api::{
    body::{optional_bool, require_str},
    params::optional_param,
    CancelSubscriptionResponse, CheckoutSessionResponse, CreateCustomerResponse,
    SubscriptionEnvelope,
};
use fieldline_billing::{CheckoutRequest, Customer};
use fieldline_model::{parse_company_id, parse_email, Company, CompanyId, Email};
use serde_json::Value;
use std::collections::BTreeMap;

const ROUTE_CREATE_CUSTOMER: &str = "/api/stripe/create-customer";
const ROUTE_CREATE_CHECKOUT: &str = "/api/stripe/create-checkout-session";
const ROUTE_GET_SUBSCRIPTION: &str = "/api/stripe/get-subscription";
const ROUTE_CANCEL_SUBSCRIPTION: &str = "/api/stripe/cancel-subscription";

fn draining_response() -> Response {
    api_error_response(
        StatusCode::SERVICE_UNAVAILABLE,
        ApiError::not_ready("server draining; refusing new requests"),
    )
}

pub(crate) async fn create_customer_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    if is_draining(&state) {
        let resp = draining_response();
        state
            .metrics
            .observe_request(
                ROUTE_CREATE_CUSTOMER,
                StatusCode::SERVICE_UNAVAILABLE,
                started.elapsed(),
            )
            .await;
        return with_request_id(resp, &request_id);
    }
    let out = create_customer(&state, &body).await;
    finish(&state, ROUTE_CREATE_CUSTOMER, started, &request_id, out).await
}

async fn create_customer(state: &AppState, raw: &Bytes) -> Result<Response, ApiError> {
    let body = parse_json_body(raw)?;
    let (company_id, email, name) = customer_fields(&body)?;
    let mut company = state
        .store
        .get_company(&company_id)
        .await
        .map_err(store_error)?;
    let (customer, is_new) = ensure_customer(state, &mut company, &email, &name).await?;
    info!(
        company_id = %company_id,
        customer_id = %customer.id,
        is_new,
        "billing customer resolved"
    );
    Ok(Json(CreateCustomerResponse {
        customer_id: customer.id,
        is_new,
    })
    .into_response())
}

pub(crate) async fn create_checkout_session_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    if is_draining(&state) {
        let resp = draining_response();
        state
            .metrics
            .observe_request(
                ROUTE_CREATE_CHECKOUT,
                StatusCode::SERVICE_UNAVAILABLE,
                started.elapsed(),
            )
            .await;
        return with_request_id(resp, &request_id);
    }
    let out = create_checkout_session(&state, &body).await;
    finish(&state, ROUTE_CREATE_CHECKOUT, started, &request_id, out).await
}

async fn create_checkout_session(state: &AppState, raw: &Bytes) -> Result<Response, ApiError> {
    let body = parse_json_body(raw)?;
    let (company_id, email, name) = customer_fields(&body)?;
    let mut company = state
        .store
        .get_company(&company_id)
        .await
        .map_err(store_error)?;
    let (customer, _) = ensure_customer(state, &mut company, &email, &name).await?;
    let request = CheckoutRequest {
        customer_id: customer.id,
        price_id: state.api.billing_price_id.clone(),
        success_url: state.api.checkout_success_url.clone(),
        cancel_url: state.api.checkout_cancel_url.clone(),
        trial_period_days: state.api.trial_period_days,
    };
    let session = provider_call(state, state.billing.create_checkout_session(&request)).await?;
    info!(company_id = %company_id, session_id = %session.id, "checkout session created");
    Ok(Json(CheckoutSessionResponse {
        session_id: session.id,
        url: session.url,
    })
    .into_response())
}

pub(crate) async fn get_subscription_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let out = get_subscription(&state, &params).await;
    finish(&state, ROUTE_GET_SUBSCRIPTION, started, &request_id, out).await
}

async fn get_subscription(
    state: &AppState,
    params: &BTreeMap<String, String>,
) -> Result<Response, ApiError> {
    let raw = optional_param(params, "companyId")
        .ok_or_else(|| ApiError::missing_field("companyId"))?;
    let company_id = parse_company_id(raw).map_err(validation_error)?;
    let company = state
        .store
        .get_company(&company_id)
        .await
        .map_err(store_error)?;
    let subscription = match company.billing_customer_id.as_deref() {
        None => Value::Null,
        Some(customer_id) => {
            match provider_call(state, state.billing.find_subscription_for_customer(customer_id))
                .await?
            {
                None => Value::Null,
                Some(subscription) => subscription_value(&subscription)?,
            }
        }
    };
    Ok(Json(SubscriptionEnvelope { subscription }).into_response())
}

pub(crate) async fn cancel_subscription_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    if is_draining(&state) {
        let resp = draining_response();
        state
            .metrics
            .observe_request(
                ROUTE_CANCEL_SUBSCRIPTION,
                StatusCode::SERVICE_UNAVAILABLE,
                started.elapsed(),
            )
            .await;
        return with_request_id(resp, &request_id);
    }
    let out = cancel_subscription(&state, &body).await;
    finish(&state, ROUTE_CANCEL_SUBSCRIPTION, started, &request_id, out).await
}

async fn cancel_subscription(state: &AppState, raw: &Bytes) -> Result<Response, ApiError> {
    let body = parse_json_body(raw)?;
    let raw_id = require_str(&body, "companyId")?;
    let company_id = parse_company_id(raw_id).map_err(validation_error)?;
    let cancel_immediately = optional_bool(&body, "cancelImmediately")?.unwrap_or(false);
    let company = state
        .store
        .get_company(&company_id)
        .await
        .map_err(store_error)?;
    let customer_id = company
        .billing_customer_id
        .as_deref()
        .ok_or_else(|| ApiError::not_found("subscription"))?;
    let current = provider_call(state, state.billing.find_subscription_for_customer(customer_id))
        .await?
        .ok_or_else(|| ApiError::not_found("subscription"))?;
    let updated = if cancel_immediately {
        provider_call(state, state.billing.cancel_subscription_now(&current.id)).await?
    } else {
        provider_call(state, state.billing.set_cancel_at_period_end(&current.id)).await?
    };
    info!(
        company_id = %company_id,
        subscription_id = %updated.id,
        cancel_immediately,
        "subscription cancellation requested"
    );
    Ok(Json(CancelSubscriptionResponse {
        success: true,
        subscription: subscription_value(&updated)?,
    })
    .into_response())
}

fn customer_fields(body: &Value) -> Result<(CompanyId, Email, String), ApiError> {
    let company_id = parse_company_id(require_str(body, "companyId")?).map_err(validation_error)?;
    let email = parse_email(require_str(body, "email")?).map_err(validation_error)?;
    let name = require_str(body, "name")?.trim().to_string();
    Ok((company_id, email, name))
}

fn subscription_value(subscription: &fieldline_billing::Subscription) -> Result<Value, ApiError> {
    serde_json::to_value(subscription)
        .map_err(|e| ApiError::internal(&format!("encode subscription: {e}")))
}

/// Provider calls share the configured request timeout; an elapsed timer
/// surfaces like any other provider failure.
async fn provider_call<T>(
    state: &AppState,
    call: impl std::future::Future<Output = Result<T, BillingError>>,
) -> Result<T, ApiError> {
    match tokio::time::timeout(state.api.request_timeout, call).await {
        Ok(result) => result.map_err(billing_error),
        Err(_) => Err(billing_error(BillingError(
            "billing request timed out".to_string(),
        ))),
    }
}

/// Resolves the provider customer for a company: the id already on the
/// company record wins, then a provider lookup by email, then a fresh
/// create. The resolved id is written back to the company record before
/// returning; `is_new` is true only for the create path.
async fn ensure_customer(
    state: &AppState,
    company: &mut Company,
    email: &Email,
    name: &str,
) -> Result<(Customer, bool), ApiError> {
    if let Some(existing) = company.billing_customer_id.clone() {
        return Ok((
            Customer {
                id: existing,
                email: email.as_str().to_string(),
                name: name.to_string(),
            },
            false,
        ));
    }
    if let Some(found) =
        provider_call(state, state.billing.find_customer_by_email(email.as_str())).await?
    {
        remember_customer(state, company, &found.id, email).await?;
        return Ok((found, false));
    }
    let created = provider_call(
        state,
        state
            .billing
            .create_customer(email.as_str(), name, company.id.as_str()),
    )
    .await?;
    remember_customer(state, company, &created.id, email).await?;
    Ok((created, true))
}

async fn remember_customer(
    state: &AppState,
    company: &mut Company,
    customer_id: &str,
    email: &Email,
) -> Result<(), ApiError> {
    company.billing_customer_id = Some(customer_id.to_string());
    company.billing_email = Some(email.clone());
    company.touch();
    state.store.put_company(company).await.map_err(store_error)
}
