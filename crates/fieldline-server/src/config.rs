use serde::Serialize;
use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: &str = "1";

#[derive(Debug, Clone, Serialize)]
pub struct ApiConfig {
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
    pub enable_debug_endpoints: bool,
    pub trial_period_days: u32,
    pub billing_price_id: String,
    pub checkout_success_url: String,
    pub checkout_cancel_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 256 * 1024,
            request_timeout: Duration::from_secs(30),
            enable_debug_endpoints: false,
            trial_period_days: 14,
            billing_price_id: "price_standard_monthly".to_string(),
            checkout_success_url: "https://app.fieldline.example/billing/success".to_string(),
            checkout_cancel_url: "https://app.fieldline.example/billing/cancelled".to_string(),
        }
    }
}

pub fn validate_startup_config_contract(api: &ApiConfig) -> Result<(), String> {
    if api.max_body_bytes == 0 {
        return Err("api body limit must be > 0".to_string());
    }
    if api.request_timeout.is_zero() {
        return Err("request timeout must be > 0".to_string());
    }
    if api.trial_period_days == 0 {
        return Err("trial period must be at least 1 day".to_string());
    }
    if api.billing_price_id.trim().is_empty() {
        return Err("billing price id must not be empty".to_string());
    }
    for (name, url) in [
        ("checkout success url", api.checkout_success_url.as_str()),
        ("checkout cancel url", api.checkout_cancel_url.as_str()),
    ] {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(format!("{name} must be an absolute http(s) url"));
        }
    }
    Ok(())
}
