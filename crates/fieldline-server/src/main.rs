#![forbid(unsafe_code)]

use fieldline_billing::{BillingProvider, FakeBilling, HttpBillingProvider};
use fieldline_core::{resolve_fieldline_data_dir, ExitCode, ENV_FIELDLINE_LOG_LEVEL};
use fieldline_server::{build_router, validate_startup_config_contract, ApiConfig, AppState};
use fieldline_store::Store;
use std::env;
use std::process::ExitCode as ProcessExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_duration_ms(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_u64(name, default_ms))
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("register SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("register SIGINT");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(ENV_FIELDLINE_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool("FIELDLINE_LOG_JSON", true) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// A configured secret key selects the hosted provider; without one the
/// in-memory fake carries the same lifecycle, which keeps keyless
/// development and CI off the network.
fn billing_provider() -> Result<Arc<dyn BillingProvider>, String> {
    let secret = env::var("FIELDLINE_BILLING_SECRET_KEY").unwrap_or_default();
    if secret.trim().is_empty() {
        info!("no billing secret key configured; using in-memory billing fake");
        return Ok(Arc::new(FakeBilling::default()));
    }
    let base_url = env_string("FIELDLINE_BILLING_BASE_URL", "https://api.stripe.com");
    let provider = HttpBillingProvider::new(&base_url, &secret)
        .map_err(|e| format!("billing provider init failed: {e}"))?;
    info!("billing provider: hosted api at {base_url}");
    Ok(Arc::new(provider))
}

#[tokio::main]
async fn main() -> ProcessExitCode {
    init_tracing();
    match run().await {
        Ok(()) => ProcessExitCode::from(ExitCode::Success as u8),
        Err((code, message)) => {
            error!("{message}");
            ProcessExitCode::from(code as u8)
        }
    }
}

async fn run() -> Result<(), (ExitCode, String)> {
    let bind_addr = env_string("FIELDLINE_BIND", "0.0.0.0:8080");

    let api_cfg = ApiConfig {
        max_body_bytes: env_usize("FIELDLINE_MAX_BODY_BYTES", 256 * 1024),
        request_timeout: env_duration_ms("FIELDLINE_REQUEST_TIMEOUT_MS", 30_000),
        enable_debug_endpoints: env_bool("FIELDLINE_ENABLE_DEBUG_ENDPOINTS", false),
        trial_period_days: env_u64("FIELDLINE_TRIAL_PERIOD_DAYS", 14) as u32,
        billing_price_id: env_string("FIELDLINE_BILLING_PRICE_ID", "price_standard_monthly"),
        checkout_success_url: env_string(
            "FIELDLINE_CHECKOUT_SUCCESS_URL",
            "https://app.fieldline.example/billing/success",
        ),
        checkout_cancel_url: env_string(
            "FIELDLINE_CHECKOUT_CANCEL_URL",
            "https://app.fieldline.example/billing/cancelled",
        ),
    };
    validate_startup_config_contract(&api_cfg)
        .map_err(|e| (ExitCode::Usage, format!("startup config rejected: {e}")))?;

    let db_path = resolve_fieldline_data_dir().join("fieldline.db");
    let store = Store::open(&db_path).await.map_err(|e| {
        (
            ExitCode::DependencyFailure,
            format!("open store at {}: {e}", db_path.display()),
        )
    })?;
    let billing = billing_provider().map_err(|e| (ExitCode::DependencyFailure, e))?;

    let state = AppState::with_config(store, billing, api_cfg);
    let app = build_router(state.clone());

    let addr: std::net::SocketAddr = bind_addr
        .parse()
        .map_err(|e| (ExitCode::Usage, format!("invalid bind addr {bind_addr}: {e}")))?;
    let socket = if addr.is_ipv4() {
        tokio::net::TcpSocket::new_v4()
    } else {
        tokio::net::TcpSocket::new_v6()
    }
    .map_err(|e| (ExitCode::Internal, format!("socket failed: {e}")))?;
    socket
        .set_reuseaddr(true)
        .map_err(|e| (ExitCode::Internal, format!("set_reuseaddr failed: {e}")))?;
    socket
        .set_keepalive(env_bool("FIELDLINE_TCP_KEEPALIVE_ENABLED", true))
        .map_err(|e| (ExitCode::Internal, format!("set_keepalive failed: {e}")))?;
    socket
        .bind(addr)
        .map_err(|e| (ExitCode::Internal, format!("bind failed: {e}")))?;
    let listener: TcpListener = socket
        .listen(1024)
        .map_err(|e| (ExitCode::Internal, format!("listen failed: {e}")))?;
    info!("fieldline-server listening on {bind_addr}");

    let accepting = state.accepting_requests.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            // Flip readiness first so new billing writes are refused while
            // in-flight requests drain.
            accepting.store(false, Ordering::Relaxed);
            let drain_ms = env_u64("FIELDLINE_SHUTDOWN_DRAIN_MS", 5000);
            tokio::time::sleep(Duration::from_millis(drain_ms)).await;
        })
        .await
        .map_err(|e| (ExitCode::Internal, format!("server failed: {e}")))
}
