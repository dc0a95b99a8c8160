// Billing stubs: plans, subscriptions, transactions. Providers are never
// contacted; webhook payloads are trusted as-is (demo system, placeholder
// credentials only).

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{payment_plans, payment_transactions, subscriptions};

pub const PROVIDER_STRIPE: &str = "stripe";
pub const PROVIDER_PAYPAL: &str = "paypal";

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = payment_plans)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PaymentPlan {
    pub id: i32,
    pub plan_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_monthly: f64,
    pub price_yearly: f64,
    pub max_users: i32,
    pub max_websites: i32,
    pub features: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payment_plans)]
pub struct NewPaymentPlan {
    pub plan_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_monthly: f64,
    pub price_yearly: f64,
    pub max_users: i32,
    pub max_websites: i32,
    pub features: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = subscriptions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Subscription {
    pub id: i32,
    pub subscription_id: String,
    pub client_id: String,
    pub plan_id: String,
    pub payment_provider: String,
    pub provider_subscription_id: Option<String>,
    pub status: String,
    pub billing_cycle: String,
    pub amount: f64,
    pub currency: String,
    pub current_period_start: Option<NaiveDateTime>,
    pub current_period_end: Option<NaiveDateTime>,
    pub cancel_at_period_end: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct NewSubscription {
    pub subscription_id: String,
    pub client_id: String,
    pub plan_id: String,
    pub payment_provider: String,
    pub provider_subscription_id: Option<String>,
    pub status: String,
    pub billing_cycle: String,
    pub amount: f64,
    pub currency: String,
    pub current_period_start: Option<NaiveDateTime>,
    pub current_period_end: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = payment_transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PaymentTransaction {
    pub id: i32,
    pub transaction_id: String,
    pub client_id: String,
    pub subscription_id: Option<String>,
    pub payment_provider: String,
    pub provider_transaction_id: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub processed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payment_transactions)]
pub struct NewPaymentTransaction {
    pub transaction_id: String,
    pub client_id: String,
    pub subscription_id: Option<String>,
    pub payment_provider: String,
    pub provider_transaction_id: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub processed_at: Option<NaiveDateTime>,
}

// =============================================================================
// WEBHOOK TYPES
// =============================================================================

/// Checkout stub: records a pending subscription that a later provider
/// webhook activates.
#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub plan_id: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_billing_cycle")]
    pub billing_cycle: String,
}

fn default_provider() -> String {
    PROVIDER_STRIPE.to_string()
}

fn default_billing_cycle() -> String {
    "monthly".to_string()
}

#[derive(Debug, Serialize)]
pub struct CreateSubscriptionResponse {
    pub success: bool,
    pub subscription_id: String,
    pub status: String,
    pub amount: f64,
    pub billing_cycle: String,
}

/// Minimal webhook envelope accepted from either provider stub
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(alias = "type", alias = "event_type")]
    pub event_type: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub provider_transaction_id: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionStatus {
    pub client_id: String,
    pub subscription_status: String,
    pub account_type: String,
    pub plan_type: String,
    pub subscription: Option<Subscription>,
    pub recent_transactions: Vec<PaymentTransaction>,
}
