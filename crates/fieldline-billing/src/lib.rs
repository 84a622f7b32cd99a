#![forbid(unsafe_code)]

//! Billing provider seam. `HttpBillingProvider` talks to the real
//! subscription provider; `FakeBilling` carries the same lifecycle in memory
//! for tests and keyless development. Provider objects keep their native
//! snake_case field names end to end.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

mod fake;
mod http;

pub use fake::FakeBilling;
pub use http::HttpBillingProvider;

pub const CRATE_NAME: &str = "fieldline-billing";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingError(pub String);

impl Display for BillingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BillingError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Unknown => "unknown",
        }
    }
}

impl Display for SubscriptionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Provider subscription object, surfaced verbatim on the wire. Timestamps
/// are provider-native unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub customer: String,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub trial_end: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub customer_id: String,
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
    pub trial_period_days: u32,
}

/// One call per operation, no retries; a provider failure is surfaced with
/// the provider's own message.
#[async_trait]
pub trait BillingProvider: Send + Sync + 'static {
    fn provider_tag(&self) -> &'static str;

    async fn find_customer_by_email(&self, email: &str)
        -> Result<Option<Customer>, BillingError>;

    async fn create_customer(
        &self,
        email: &str,
        name: &str,
        company_id: &str,
    ) -> Result<Customer, BillingError>;

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, BillingError>;

    /// Newest subscription for the customer, if any.
    async fn find_subscription_for_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<Subscription>, BillingError>;

    async fn cancel_subscription_now(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, BillingError>;

    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, BillingError>;
}
