#![forbid(unsafe_code)]

//! HTTP server wiring for Fieldline. Routes split into a public surface
//! (health, signup, login, billing) and a bearer-protected tenant surface;
//! every response carries an `x-request-id` header and is counted in the
//! request metrics exposed at `/metrics`.

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Extension, Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use fieldline_api::{ApiError, ApiErrorCode};
use fieldline_billing::{BillingError, BillingProvider};
use fieldline_store::{Store, StoreError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{error, info};

mod auth;
mod config;
mod http;
mod middleware;
mod telemetry;

pub const CRATE_NAME: &str = "fieldline-server";

pub use auth::AuthContext;
pub use config::{validate_startup_config_contract, ApiConfig, CONFIG_SCHEMA_VERSION};
pub use fieldline_billing::FakeBilling;

#[derive(Default)]
struct RequestMetrics {
    counts: Mutex<HashMap<(String, u16), u64>>,
    latency_ns: Mutex<HashMap<String, Vec<u64>>>,
}

impl RequestMetrics {
    async fn observe_request(&self, route: &str, status: StatusCode, latency: Duration) {
        let mut counts = self.counts.lock().await;
        *counts
            .entry((route.to_string(), status.as_u16()))
            .or_insert(0) += 1;
        drop(counts);
        let mut latency_map = self.latency_ns.lock().await;
        latency_map
            .entry(route.to_string())
            .or_insert_with(Vec::new)
            .push(latency.as_nanos() as u64);
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub billing: Arc<dyn BillingProvider>,
    pub api: ApiConfig,
    pub ready: Arc<AtomicBool>,
    pub accepting_requests: Arc<AtomicBool>,
    pub(crate) metrics: Arc<RequestMetrics>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Store, billing: Arc<dyn BillingProvider>) -> Self {
        Self::with_config(store, billing, ApiConfig::default())
    }

    #[must_use]
    pub fn with_config(store: Store, billing: Arc<dyn BillingProvider>, api: ApiConfig) -> Self {
        Self {
            store,
            billing,
            api,
            ready: Arc::new(AtomicBool::new(true)),
            accepting_requests: Arc::new(AtomicBool::new(true)),
            metrics: Arc::new(RequestMetrics::default()),
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/team/create", post(http::team::team_create_handler))
        .route("/v1/team", get(http::team::team_list_handler))
        .route(
            "/v1/clients",
            get(http::clients::list_clients_handler).post(http::clients::create_client_handler),
        )
        .route(
            "/v1/clients/:id",
            get(http::clients::get_client_handler)
                .put(http::clients::update_client_handler)
                .delete(http::clients::delete_client_handler),
        )
        .route(
            "/v1/quotes",
            get(http::quotes::list_quotes_handler).post(http::quotes::create_quote_handler),
        )
        .route(
            "/v1/quotes/:id",
            get(http::quotes::get_quote_handler)
                .put(http::quotes::update_quote_handler)
                .delete(http::quotes::delete_quote_handler),
        )
        .route(
            "/v1/quotes/:id/status",
            post(http::quotes::quote_status_handler),
        )
        .route(
            "/v1/quotes/:id/convert",
            post(http::quotes::quote_convert_handler),
        )
        .route(
            "/v1/work-orders",
            get(http::work_orders::list_work_orders_handler)
                .post(http::work_orders::create_work_order_handler),
        )
        .route(
            "/v1/work-orders/:id",
            get(http::work_orders::get_work_order_handler)
                .put(http::work_orders::update_work_order_handler)
                .delete(http::work_orders::delete_work_order_handler),
        )
        .route(
            "/v1/work-orders/:id/status",
            post(http::work_orders::work_order_status_handler),
        )
        .route(
            "/v1/invoices",
            get(http::finance::list_invoices_handler).post(http::finance::create_invoice_handler),
        )
        .route(
            "/v1/invoices/:id",
            get(http::finance::get_invoice_handler)
                .delete(http::finance::delete_invoice_handler),
        )
        .route(
            "/v1/invoices/:id/status",
            post(http::finance::invoice_status_handler),
        )
        .route(
            "/v1/expenses",
            get(http::finance::list_expenses_handler).post(http::finance::create_expense_handler),
        )
        .route(
            "/v1/expenses/:id",
            put(http::finance::update_expense_handler)
                .delete(http::finance::delete_expense_handler),
        )
        .route(
            "/v1/finance/summary",
            get(http::finance::finance_summary_handler),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::bearer_auth_middleware,
        ));

    Router::new()
        .route("/healthz", get(http::handlers::healthz_handler))
        .route("/readyz", get(http::handlers::readyz_handler))
        .route("/metrics", get(http::handlers::metrics_handler))
        .route("/v1/version", get(http::handlers::version_handler))
        .route("/v1/companies", post(http::team::signup_company_handler))
        .route("/v1/auth/login", post(http::team::login_handler))
        .route(
            "/api/stripe/create-customer",
            post(http::billing::create_customer_handler),
        )
        .route(
            "/api/stripe/create-checkout-session",
            post(http::billing::create_checkout_session_handler),
        )
        .route(
            "/api/stripe/get-subscription",
            get(http::billing::get_subscription_handler),
        )
        .route(
            "/api/stripe/cancel-subscription",
            post(http::billing::cancel_subscription_handler),
        )
        .route(
            "/debug/tenants",
            get(http::handlers::debug_tenants_handler),
        )
        .merge(protected)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::request_tracing::request_tracing_middleware,
        ))
        .layer(DefaultBodyLimit::max(state.api.max_body_bytes))
        .with_state(state)
}
