// SPDX-License-Identifier: Apache-2.0

use crate::{
    BillingError, BillingProvider, CheckoutRequest, CheckoutSession, Customer, Subscription,
    SubscriptionStatus,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// In-memory provider with the real lifecycle: checkout starts a trialing
/// subscription, immediate cancel flips it to `canceled`, flagged cancel
/// sets `cancel_at_period_end` and leaves the status alone.
pub struct FakeBilling {
    pub customers: Mutex<HashMap<String, Customer>>,
    pub subscriptions: Mutex<HashMap<String, Subscription>>,
    pub next_id: AtomicU64,
    /// When set, the next call fails with this message and the knob clears.
    pub fail_with: Mutex<Option<String>>,
}

impl Default for FakeBilling {
    fn default() -> Self {
        Self {
            customers: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            fail_with: Mutex::new(None),
        }
    }
}

impl FakeBilling {
    async fn maybe_fail(&self) -> Result<(), BillingError> {
        if let Some(message) = self.fail_with.lock().await.take() {
            return Err(BillingError(message));
        }
        Ok(())
    }

    fn next(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}_{n}")
    }

    /// Seeds an active-state subscription directly, bypassing checkout.
    pub async fn seed_subscription(&self, customer_id: &str, status: SubscriptionStatus) -> String {
        let id = self.next("sub");
        let now = chrono::Utc::now().timestamp();
        self.subscriptions.lock().await.insert(
            id.clone(),
            Subscription {
                id: id.clone(),
                customer: customer_id.to_string(),
                status,
                cancel_at_period_end: false,
                current_period_end: Some(now + 30 * 86_400),
                trial_end: None,
            },
        );
        id
    }
}

#[async_trait]
impl BillingProvider for FakeBilling {
    fn provider_tag(&self) -> &'static str {
        "fake"
    }

    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Customer>, BillingError> {
        self.maybe_fail().await?;
        Ok(self
            .customers
            .lock()
            .await
            .values()
            .find(|c| c.email == email)
            .cloned())
    }

    async fn create_customer(
        &self,
        email: &str,
        name: &str,
        _company_id: &str,
    ) -> Result<Customer, BillingError> {
        self.maybe_fail().await?;
        let customer = Customer {
            id: self.next("cus"),
            email: email.to_string(),
            name: name.to_string(),
        };
        self.customers
            .lock()
            .await
            .insert(customer.id.clone(), customer.clone());
        Ok(customer)
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, BillingError> {
        self.maybe_fail().await?;
        if !self
            .customers
            .lock()
            .await
            .contains_key(&request.customer_id)
        {
            return Err(BillingError(format!(
                "No such customer: {}",
                request.customer_id
            )));
        }
        let now = chrono::Utc::now().timestamp();
        let sub_id = self.next("sub");
        self.subscriptions.lock().await.insert(
            sub_id.clone(),
            Subscription {
                id: sub_id.clone(),
                customer: request.customer_id.clone(),
                status: SubscriptionStatus::Trialing,
                cancel_at_period_end: false,
                current_period_end: Some(
                    now + i64::from(request.trial_period_days) * 86_400,
                ),
                trial_end: Some(now + i64::from(request.trial_period_days) * 86_400),
            },
        );
        let session_id = self.next("cs");
        Ok(CheckoutSession {
            id: session_id.clone(),
            url: format!("https://billing.example/checkout/{session_id}"),
        })
    }

    async fn find_subscription_for_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<Subscription>, BillingError> {
        self.maybe_fail().await?;
        let subs = self.subscriptions.lock().await;
        let mut matching: Vec<&Subscription> = subs
            .values()
            .filter(|s| s.customer == customer_id)
            .collect();
        matching.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matching.last().map(|s| (*s).clone()))
    }

    async fn cancel_subscription_now(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, BillingError> {
        self.maybe_fail().await?;
        let mut subs = self.subscriptions.lock().await;
        let sub = subs
            .get_mut(subscription_id)
            .ok_or_else(|| BillingError(format!("No such subscription: {subscription_id}")))?;
        sub.status = SubscriptionStatus::Canceled;
        Ok(sub.clone())
    }

    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, BillingError> {
        self.maybe_fail().await?;
        let mut subs = self.subscriptions.lock().await;
        let sub = subs
            .get_mut(subscription_id)
            .ok_or_else(|| BillingError(format!("No such subscription: {subscription_id}")))?;
        sub.cancel_at_period_end = true;
        Ok(sub.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkout(customer_id: &str) -> CheckoutRequest {
        CheckoutRequest {
            customer_id: customer_id.to_string(),
            price_id: "price_basic".to_string(),
            success_url: "https://app.example/billing/success".to_string(),
            cancel_url: "https://app.example/billing/cancel".to_string(),
            trial_period_days: 14,
        }
    }

    #[tokio::test]
    async fn checkout_starts_a_trialing_subscription() {
        let fake = FakeBilling::default();
        let customer = fake
            .create_customer("ana@example.com", "Ana", "comp_1")
            .await
            .unwrap();
        let session = fake.create_checkout_session(&checkout(&customer.id)).await.unwrap();
        assert!(session.url.contains(&session.id));

        let sub = fake
            .find_subscription_for_customer(&customer.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Trialing);
        assert!(!sub.cancel_at_period_end);
        assert!(sub.trial_end.is_some());
    }

    #[tokio::test]
    async fn immediate_cancel_flips_status_to_canceled() {
        let fake = FakeBilling::default();
        let customer = fake
            .create_customer("ana@example.com", "Ana", "comp_1")
            .await
            .unwrap();
        let sub_id = fake
            .seed_subscription(&customer.id, SubscriptionStatus::Active)
            .await;

        let sub = fake.cancel_subscription_now(&sub_id).await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Canceled);
    }

    #[tokio::test]
    async fn flagged_cancel_leaves_status_unchanged() {
        let fake = FakeBilling::default();
        let customer = fake
            .create_customer("ana@example.com", "Ana", "comp_1")
            .await
            .unwrap();
        let sub_id = fake
            .seed_subscription(&customer.id, SubscriptionStatus::Active)
            .await;

        let sub = fake.set_cancel_at_period_end(&sub_id).await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(sub.cancel_at_period_end);
    }

    #[tokio::test]
    async fn customer_search_matches_on_email() {
        let fake = FakeBilling::default();
        let created = fake
            .create_customer("ana@example.com", "Ana", "comp_1")
            .await
            .unwrap();
        let found = fake
            .find_customer_by_email("ana@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
        assert!(fake
            .find_customer_by_email("nobody@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn failure_knob_fires_once_with_the_given_message() {
        let fake = FakeBilling::default();
        *fake.fail_with.lock().await = Some("provider melted".to_string());
        let err = fake
            .find_customer_by_email("ana@example.com")
            .await
            .unwrap_err();
        assert_eq!(err.0, "provider melted");
        // Knob cleared; next call succeeds.
        assert!(fake
            .find_customer_by_email("ana@example.com")
            .await
            .unwrap()
            .is_none());
    }
}
