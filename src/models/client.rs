// Client (tenant) model and admin-facing DTOs

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schema::clients;

/// Subscription plan tiers and the user caps that come with them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Basic,
    Professional,
    Enterprise,
}

impl PlanType {
    pub fn max_users(&self) -> i32 {
        match self {
            PlanType::Basic => 5,
            PlanType::Professional => 15,
            PlanType::Enterprise => 50,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Basic => "basic",
            PlanType::Professional => "professional",
            PlanType::Enterprise => "enterprise",
        }
    }
}

impl std::str::FromStr for PlanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(PlanType::Basic),
            "professional" => Ok(PlanType::Professional),
            "enterprise" => Ok(PlanType::Enterprise),
            other => Err(format!("unknown plan type: {}", other)),
        }
    }
}

// Subscription status values stored on `clients.subscription_status`
pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_TRIAL: &str = "trial";
pub const STATUS_TRIAL_EXPIRED: &str = "trial_expired";
pub const STATUS_CANCELLED: &str = "cancelled";
pub const STATUS_PAYMENT_FAILED: &str = "payment_failed";

// Account types stored on `clients.account_type`
pub const ACCOUNT_FULL: &str = "full";
pub const ACCOUNT_TRIAL: &str = "trial";

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = clients)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Client {
    pub id: i32,
    pub client_id: String,
    pub business_name: String,
    pub contact_email: String,
    pub website_url: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    pub subscription_status: String,
    pub account_type: String,
    pub plan_type: String,
    pub billing_cycle: String,
    pub max_users: i32,
    pub owner_user_id: Option<String>,
    pub trial_start_time: Option<NaiveDateTime>,
    pub trial_end_time: Option<NaiveDateTime>,
    pub trial_duration_hours: Option<i32>,
    pub trial_extended_count: i32,
    pub auto_restricted_at: Option<NaiveDateTime>,
    pub conversion_date: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub last_access: Option<NaiveDateTime>,
}

impl Client {
    pub fn is_trial(&self) -> bool {
        self.account_type == ACCOUNT_TRIAL
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = clients)]
pub struct NewClient {
    pub client_id: String,
    pub business_name: String,
    pub contact_email: String,
    pub website_url: String,
    pub access_token: String,
    pub subscription_status: String,
    pub account_type: String,
    pub plan_type: String,
    pub max_users: i32,
    pub owner_user_id: Option<String>,
    pub trial_start_time: Option<NaiveDateTime>,
    pub trial_end_time: Option<NaiveDateTime>,
    pub trial_duration_hours: Option<i32>,
    pub created_at: NaiveDateTime,
}

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 255, message = "Business name is required"))]
    pub business_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub contact_email: String,

    #[validate(url(message = "Invalid website URL"))]
    pub website_url: String,

    #[serde(default)]
    pub plan_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateClientResponse {
    pub success: bool,
    pub client_id: String,
    pub dashboard_url: String,
    pub access_token: String,
    pub message: String,
}

/// Admin listing row: client plus its active-user count
#[derive(Debug, Serialize)]
pub struct ClientSummary {
    pub client_id: String,
    pub business_name: String,
    pub contact_email: String,
    pub website_url: String,
    pub subscription_status: String,
    pub plan_type: String,
    pub max_users: i32,
    pub current_users: i64,
    pub created_at: NaiveDateTime,
    pub last_access: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn plan_user_caps() {
        assert_eq!(PlanType::Basic.max_users(), 5);
        assert_eq!(PlanType::Professional.max_users(), 15);
        assert_eq!(PlanType::Enterprise.max_users(), 50);
    }

    #[test]
    fn plan_type_round_trips() {
        for plan in [PlanType::Basic, PlanType::Professional, PlanType::Enterprise] {
            assert_eq!(PlanType::from_str(plan.as_str()).unwrap(), plan);
        }
        assert!(PlanType::from_str("platinum").is_err());
    }
}
