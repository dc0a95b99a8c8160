// Billing stubs: seeded plans, webhook handling, subscription status.
//
// Providers are never called. Webhook payloads are taken at face value
// (placeholder credentials, no signature verification) and only move local
// subscription and client state.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::json;
use tracing::info;

use crate::{
    db::DbPool,
    models::{
        client::{STATUS_ACTIVE, STATUS_CANCELLED, STATUS_PAYMENT_FAILED},
        payment::{
            CreateSubscriptionRequest, CreateSubscriptionResponse, NewPaymentPlan,
            NewPaymentTransaction, NewSubscription, PaymentPlan, PaymentTransaction,
            Subscription, SubscriptionStatus, WebhookEvent, PROVIDER_PAYPAL, PROVIDER_STRIPE,
        },
    },
    schema::{clients, payment_plans, payment_transactions, subscriptions},
    utils::{generate_subscription_id, generate_transaction_id, ServiceError},
};

/// What a webhook event did to local state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    PaymentSucceeded,
    PaymentFailed,
    SubscriptionCancelled,
    Ignored,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::PaymentSucceeded => "payment_succeeded",
            WebhookOutcome::PaymentFailed => "payment_failed",
            WebhookOutcome::SubscriptionCancelled => "subscription_cancelled",
            WebhookOutcome::Ignored => "ignored",
        }
    }
}

/// Map a provider event type onto a local outcome
pub fn classify_event(provider: &str, event_type: &str) -> WebhookOutcome {
    match (provider, event_type) {
        ("stripe", "invoice.payment_succeeded") => WebhookOutcome::PaymentSucceeded,
        ("stripe", "invoice.payment_failed") => WebhookOutcome::PaymentFailed,
        ("stripe", "customer.subscription.deleted") => WebhookOutcome::SubscriptionCancelled,
        ("paypal", "BILLING.SUBSCRIPTION.ACTIVATED")
        | ("paypal", "PAYMENT.SALE.COMPLETED") => WebhookOutcome::PaymentSucceeded,
        ("paypal", "BILLING.SUBSCRIPTION.PAYMENT.FAILED") => WebhookOutcome::PaymentFailed,
        ("paypal", "BILLING.SUBSCRIPTION.CANCELLED") => WebhookOutcome::SubscriptionCancelled,
        _ => WebhookOutcome::Ignored,
    }
}

pub struct PaymentService {
    pool: DbPool,
}

impl PaymentService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Idempotently seed the three standard plans. Called at startup.
    pub async fn seed_plans(&self) -> Result<(), ServiceError> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now().naive_utc();

        let plans = vec![
            NewPaymentPlan {
                plan_id: "basic".to_string(),
                name: "Basic Plan".to_string(),
                description: Some("Perfect for small businesses".to_string()),
                price_monthly: 29.99,
                price_yearly: 299.99,
                max_users: 5,
                max_websites: 1,
                features: json!([
                    "Up to 5 users",
                    "1 website tracking",
                    "Basic visitor analytics",
                    "Email support",
                    "CSV export"
                ])
                .to_string(),
                is_active: true,
                created_at: now,
            },
            NewPaymentPlan {
                plan_id: "professional".to_string(),
                name: "Professional Plan".to_string(),
                description: Some("For growing businesses".to_string()),
                price_monthly: 79.99,
                price_yearly: 799.99,
                max_users: 15,
                max_websites: 5,
                features: json!([
                    "Up to 15 users",
                    "5 websites tracking",
                    "Advanced analytics",
                    "Priority support",
                    "CSV export",
                    "API access",
                    "Custom reports"
                ])
                .to_string(),
                is_active: true,
                created_at: now,
            },
            NewPaymentPlan {
                plan_id: "enterprise".to_string(),
                name: "Enterprise Plan".to_string(),
                description: Some("For large organizations".to_string()),
                price_monthly: 199.99,
                price_yearly: 1999.99,
                max_users: 50,
                max_websites: 25,
                features: json!([
                    "Up to 50 users",
                    "25 websites tracking",
                    "Enterprise analytics",
                    "Dedicated support",
                    "All export formats",
                    "Full API access",
                    "Custom integrations",
                    "White-label options"
                ])
                .to_string(),
                is_active: true,
                created_at: now,
            },
        ];

        for plan in plans {
            diesel::insert_into(payment_plans::table)
                .values(&plan)
                .on_conflict(payment_plans::plan_id)
                .do_nothing()
                .execute(&mut conn)
                .await?;
        }

        Ok(())
    }

    pub async fn list_plans(&self) -> Result<Vec<PaymentPlan>, ServiceError> {
        let mut conn = self.pool.get().await?;
        let plans = payment_plans::table
            .filter(payment_plans::is_active.eq(true))
            .order(payment_plans::price_monthly.asc())
            .select(PaymentPlan::as_select())
            .load(&mut conn)
            .await?;
        Ok(plans)
    }

    /// Record a pending subscription for a client. No provider checkout is
    /// started; the matching webhook later flips it active.
    pub async fn create_subscription(
        &self,
        client_id: &str,
        req: CreateSubscriptionRequest,
    ) -> Result<CreateSubscriptionResponse, ServiceError> {
        if req.provider != PROVIDER_STRIPE && req.provider != PROVIDER_PAYPAL {
            return Err(ServiceError::ValidationError(format!(
                "unknown payment provider: {}",
                req.provider
            )));
        }

        let mut conn = self.pool.get().await?;
        let now = Utc::now().naive_utc();

        let exists: i64 = clients::table
            .filter(clients::client_id.eq(client_id))
            .count()
            .get_result(&mut conn)
            .await?;
        if exists == 0 {
            return Err(ServiceError::NotFound);
        }

        let plan: PaymentPlan = payment_plans::table
            .filter(payment_plans::plan_id.eq(&req.plan_id))
            .filter(payment_plans::is_active.eq(true))
            .select(PaymentPlan::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .ok_or(ServiceError::NotFound)?;

        let amount = if req.billing_cycle == "yearly" {
            plan.price_yearly
        } else {
            plan.price_monthly
        };

        let subscription_id = generate_subscription_id();
        let subscription = NewSubscription {
            subscription_id: subscription_id.clone(),
            client_id: client_id.to_string(),
            plan_id: plan.plan_id,
            payment_provider: req.provider.clone(),
            provider_subscription_id: None,
            status: "pending".to_string(),
            billing_cycle: req.billing_cycle.clone(),
            amount,
            currency: "USD".to_string(),
            current_period_start: None,
            current_period_end: None,
            created_at: now,
            updated_at: now,
        };
        diesel::insert_into(subscriptions::table)
            .values(&subscription)
            .execute(&mut conn)
            .await?;

        info!(
            client_id = %client_id,
            subscription_id = %subscription_id,
            provider = %req.provider,
            "subscription created"
        );

        Ok(CreateSubscriptionResponse {
            success: true,
            subscription_id,
            status: "pending".to_string(),
            amount,
            billing_cycle: req.billing_cycle,
        })
    }

    /// Apply one provider event: record a transaction and move subscription
    /// and client status for the events we act on.
    pub async fn handle_webhook(
        &self,
        provider: &str,
        event: WebhookEvent,
    ) -> Result<WebhookOutcome, ServiceError> {
        let outcome = classify_event(provider, &event.event_type);
        if outcome == WebhookOutcome::Ignored {
            info!(provider, event_type = %event.event_type, "webhook event ignored");
            return Ok(outcome);
        }

        let mut conn = self.pool.get().await?;
        let now = Utc::now().naive_utc();

        // Resolve the client via the subscription when the payload has one
        let subscription: Option<Subscription> = match &event.subscription_id {
            Some(sub_id) => {
                subscriptions::table
                    .filter(
                        subscriptions::subscription_id
                            .eq(sub_id)
                            .or(subscriptions::provider_subscription_id.eq(sub_id)),
                    )
                    .filter(subscriptions::payment_provider.eq(provider))
                    .select(Subscription::as_select())
                    .first(&mut conn)
                    .await
                    .optional()?
            }
            None => None,
        };

        let client_id = event
            .client_id
            .clone()
            .or_else(|| subscription.as_ref().map(|s| s.client_id.clone()))
            .ok_or_else(|| {
                ServiceError::ValidationError(
                    "webhook event references no known client or subscription".to_string(),
                )
            })?;

        let (sub_status, client_status, txn_status) = match outcome {
            WebhookOutcome::PaymentSucceeded => ("active", STATUS_ACTIVE, "completed"),
            WebhookOutcome::PaymentFailed => ("past_due", STATUS_PAYMENT_FAILED, "failed"),
            WebhookOutcome::SubscriptionCancelled => {
                ("cancelled", STATUS_CANCELLED, "cancelled")
            }
            WebhookOutcome::Ignored => unreachable!(),
        };

        if let Some(sub) = &subscription {
            diesel::update(
                subscriptions::table.filter(subscriptions::subscription_id.eq(&sub.subscription_id)),
            )
            .set((
                subscriptions::status.eq(sub_status),
                subscriptions::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await?;
        }

        diesel::update(clients::table.filter(clients::client_id.eq(&client_id)))
            .set(clients::subscription_status.eq(client_status))
            .execute(&mut conn)
            .await?;

        let txn = NewPaymentTransaction {
            transaction_id: generate_transaction_id(),
            client_id: client_id.clone(),
            subscription_id: subscription.as_ref().map(|s| s.subscription_id.clone()),
            payment_provider: provider.to_string(),
            provider_transaction_id: event.provider_transaction_id.clone(),
            amount: event.amount.unwrap_or(0.0),
            currency: event.currency.clone().unwrap_or_else(|| "USD".to_string()),
            status: txn_status.to_string(),
            description: Some(event.event_type.clone()),
            created_at: now,
            processed_at: Some(now),
        };
        diesel::insert_into(payment_transactions::table)
            .values(&txn)
            .execute(&mut conn)
            .await?;

        info!(
            provider,
            client_id = %client_id,
            outcome = outcome.as_str(),
            "webhook event applied"
        );
        Ok(outcome)
    }

    /// Subscription snapshot for one client
    pub async fn subscription_status(
        &self,
        client_id: &str,
    ) -> Result<SubscriptionStatus, ServiceError> {
        let mut conn = self.pool.get().await?;

        let (subscription_status, account_type, plan_type): (String, String, String) =
            clients::table
                .filter(clients::client_id.eq(client_id))
                .select((
                    clients::subscription_status,
                    clients::account_type,
                    clients::plan_type,
                ))
                .first(&mut conn)
                .await
                .optional()?
                .ok_or(ServiceError::NotFound)?;

        let subscription: Option<Subscription> = subscriptions::table
            .filter(subscriptions::client_id.eq(client_id))
            .order(subscriptions::created_at.desc())
            .select(Subscription::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        let recent_transactions: Vec<PaymentTransaction> = payment_transactions::table
            .filter(payment_transactions::client_id.eq(client_id))
            .order(payment_transactions::created_at.desc())
            .limit(10)
            .select(PaymentTransaction::as_select())
            .load(&mut conn)
            .await?;

        Ok(SubscriptionStatus {
            client_id: client_id.to_string(),
            subscription_status,
            account_type,
            plan_type,
            subscription,
            recent_transactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stripe_events_map_to_outcomes() {
        assert_eq!(
            classify_event("stripe", "invoice.payment_succeeded"),
            WebhookOutcome::PaymentSucceeded
        );
        assert_eq!(
            classify_event("stripe", "invoice.payment_failed"),
            WebhookOutcome::PaymentFailed
        );
        assert_eq!(
            classify_event("stripe", "customer.subscription.deleted"),
            WebhookOutcome::SubscriptionCancelled
        );
        assert_eq!(
            classify_event("stripe", "customer.created"),
            WebhookOutcome::Ignored
        );
    }

    #[test]
    fn paypal_events_map_to_outcomes() {
        assert_eq!(
            classify_event("paypal", "BILLING.SUBSCRIPTION.ACTIVATED"),
            WebhookOutcome::PaymentSucceeded
        );
        assert_eq!(
            classify_event("paypal", "BILLING.SUBSCRIPTION.PAYMENT.FAILED"),
            WebhookOutcome::PaymentFailed
        );
        assert_eq!(
            classify_event("paypal", "BILLING.SUBSCRIPTION.CANCELLED"),
            WebhookOutcome::SubscriptionCancelled
        );
    }

    #[test]
    fn providers_do_not_share_event_names() {
        assert_eq!(
            classify_event("paypal", "invoice.payment_succeeded"),
            WebhookOutcome::Ignored
        );
        assert_eq!(
            classify_event("stripe", "BILLING.SUBSCRIPTION.CANCELLED"),
            WebhookOutcome::Ignored
        );
    }
}
