// SPDX-License-Identifier: Apache-2.0

use crate::{
    BillingError, BillingProvider, CheckoutRequest, CheckoutSession, Customer, Subscription,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

#[derive(Debug, Deserialize)]
struct ProviderList<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetail {
    message: String,
}

/// Thin client for the hosted billing API. Form-encoded writes, bearer
/// secret, one attempt per call.
pub struct HttpBillingProvider {
    base_url: String,
    secret_key: String,
    client: reqwest::Client,
}

impl HttpBillingProvider {
    pub fn new(base_url: &str, secret_key: &str) -> Result<Self, BillingError> {
        let parsed = reqwest::Url::parse(base_url)
            .map_err(|e| BillingError(format!("invalid billing base url: {e}")))?;
        if parsed.host_str().is_none() {
            return Err(BillingError("billing base url missing host".to_string()));
        }
        if secret_key.trim().is_empty() {
            return Err(BillingError("billing secret key must not be empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
            client,
        })
    }

    fn auth_headers(&self) -> Result<HeaderMap, BillingError> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {}", self.secret_key))
            .map_err(|e| BillingError(format!("invalid auth header: {e}")))?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Non-2xx answers surface the provider's own error message, unmodified.
    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BillingError> {
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BillingError(format!("billing response read failed: {e}")))?;
        if !status.is_success() {
            if let Ok(body) = serde_json::from_slice::<ProviderErrorBody>(&bytes) {
                return Err(BillingError(body.error.message));
            }
            let raw = String::from_utf8_lossy(&bytes);
            return Err(BillingError(format!(
                "billing provider returned {status}: {raw}"
            )));
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| BillingError(format!("billing response parse failed: {e}")))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, BillingError> {
        let response = self
            .client
            .get(self.url(path))
            .headers(self.auth_headers()?)
            .query(query)
            .send()
            .await
            .map_err(|e| BillingError(format!("billing request failed: {e}")))?;
        Self::decode(response).await
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<T, BillingError> {
        let response = self
            .client
            .post(self.url(path))
            .headers(self.auth_headers()?)
            .form(form)
            .send()
            .await
            .map_err(|e| BillingError(format!("billing request failed: {e}")))?;
        Self::decode(response).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, BillingError> {
        let response = self
            .client
            .delete(self.url(path))
            .headers(self.auth_headers()?)
            .send()
            .await
            .map_err(|e| BillingError(format!("billing request failed: {e}")))?;
        Self::decode(response).await
    }
}

#[async_trait]
impl BillingProvider for HttpBillingProvider {
    fn provider_tag(&self) -> &'static str {
        "http"
    }

    #[instrument(name = "billing_find_customer", skip(self))]
    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Customer>, BillingError> {
        let list: ProviderList<Customer> = self
            .get("/v1/customers", &[("email", email), ("limit", "1")])
            .await?;
        Ok(list.data.into_iter().next())
    }

    #[instrument(name = "billing_create_customer", skip(self))]
    async fn create_customer(
        &self,
        email: &str,
        name: &str,
        company_id: &str,
    ) -> Result<Customer, BillingError> {
        self.post_form(
            "/v1/customers",
            &[
                ("email", email.to_string()),
                ("name", name.to_string()),
                ("metadata[companyId]", company_id.to_string()),
            ],
        )
        .await
    }

    #[instrument(name = "billing_create_checkout", skip(self, request))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, BillingError> {
        self.post_form(
            "/v1/checkout/sessions",
            &[
                ("mode", "subscription".to_string()),
                ("customer", request.customer_id.clone()),
                ("success_url", request.success_url.clone()),
                ("cancel_url", request.cancel_url.clone()),
                ("line_items[0][price]", request.price_id.clone()),
                ("line_items[0][quantity]", "1".to_string()),
                (
                    "subscription_data[trial_period_days]",
                    request.trial_period_days.to_string(),
                ),
            ],
        )
        .await
    }

    #[instrument(name = "billing_find_subscription", skip(self))]
    async fn find_subscription_for_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<Subscription>, BillingError> {
        let list: ProviderList<Subscription> = self
            .get(
                "/v1/subscriptions",
                &[("customer", customer_id), ("status", "all"), ("limit", "1")],
            )
            .await?;
        Ok(list.data.into_iter().next())
    }

    #[instrument(name = "billing_cancel_now", skip(self))]
    async fn cancel_subscription_now(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, BillingError> {
        self.delete(&format!("/v1/subscriptions/{subscription_id}")).await
    }

    #[instrument(name = "billing_cancel_at_period_end", skip(self))]
    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, BillingError> {
        self.post_form(
            &format!("/v1/subscriptions/{subscription_id}"),
            &[("cancel_at_period_end", "true".to_string())],
        )
        .await
    }
}
