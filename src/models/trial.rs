// Trial lifecycle records, scheduled notifications, and the task queue

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schema::{automated_tasks, trial_notifications, trials};

// Trial status values
pub const TRIAL_ACTIVE: &str = "active";
pub const TRIAL_EXPIRED: &str = "expired";
pub const TRIAL_CONVERTED: &str = "converted";
pub const TRIAL_MANUALLY_RESTRICTED: &str = "manually_restricted";

// Notification types
pub const NOTIFY_REMINDER: &str = "trial_reminder";
pub const NOTIFY_EXPIRING: &str = "trial_expiring";
pub const NOTIFY_EXPIRED: &str = "trial_expired";

// Notification / task status values
pub const PENDING: &str = "pending";
pub const SENT: &str = "sent";
pub const COMPLETED: &str = "completed";
pub const FAILED: &str = "failed";

// Task types handled by the background executor
pub const TASK_GENERATE_DEMO_DATA: &str = "generate_demo_data";
pub const TASK_RESTRICT_TRIAL: &str = "restrict_trial_access";

/// Trial durations are bounded to one hour..one year
pub const MIN_TRIAL_HOURS: i64 = 1;
pub const MAX_TRIAL_HOURS: i64 = 8760;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = trials)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Trial {
    pub id: i32,
    pub trial_id: String,
    pub client_id: String,
    pub granted_by: Option<String>,
    pub trial_type: String,
    pub duration_hours: i32,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub status: String,
    pub reminder_sent: bool,
    pub expiration_warning_sent: bool,
    pub auto_restricted_at: Option<NaiveDateTime>,
    pub extension_count: i32,
    pub conversion_attempted: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = trials)]
pub struct NewTrial {
    pub trial_id: String,
    pub client_id: String,
    pub granted_by: Option<String>,
    pub trial_type: String,
    pub duration_hours: i32,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = trial_notifications)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TrialNotification {
    pub id: i32,
    pub notification_id: String,
    pub client_id: String,
    pub notification_type: String,
    pub scheduled_time: NaiveDateTime,
    pub sent_time: Option<NaiveDateTime>,
    pub status: String,
    pub retry_count: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = trial_notifications)]
pub struct NewTrialNotification {
    pub notification_id: String,
    pub client_id: String,
    pub notification_type: String,
    pub scheduled_time: NaiveDateTime,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = automated_tasks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AutomatedTask {
    pub id: i32,
    pub task_id: String,
    pub task_type: String,
    pub client_id: Option<String>,
    pub trial_id: Option<String>,
    pub status: String,
    pub scheduled_at: NaiveDateTime,
    pub executed_at: Option<NaiveDateTime>,
    pub result: Option<String>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub task_data: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = automated_tasks)]
pub struct NewAutomatedTask {
    pub task_id: String,
    pub task_type: String,
    pub client_id: Option<String>,
    pub trial_id: Option<String>,
    pub status: String,
    pub scheduled_at: NaiveDateTime,
    pub task_data: Option<String>,
}

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTrialRequest {
    #[validate(length(min = 1, max = 255, message = "Business name is required"))]
    pub business_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub contact_email: String,

    #[validate(url(message = "Invalid website URL"))]
    pub website_url: String,

    #[serde(default = "default_trial_hours")]
    pub duration_hours: i64,

    #[serde(default)]
    pub trial_type: Option<String>,

    #[serde(default)]
    pub granted_by: Option<String>,
}

fn default_trial_hours() -> i64 {
    24
}

#[derive(Debug, Serialize)]
pub struct CreateTrialResponse {
    pub success: bool,
    pub client_id: String,
    pub trial_id: String,
    pub dashboard_url: String,
    pub access_token: String,
    pub trial_end_time: NaiveDateTime,
    pub duration_hours: i64,
}

#[derive(Debug, Deserialize)]
pub struct ExtendTrialRequest {
    #[serde(default = "default_trial_hours")]
    pub additional_hours: i64,
    #[serde(default)]
    pub extended_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConvertTrialRequest {
    #[serde(default)]
    pub plan_type: Option<String>,
}

/// Trial listing row with derived expiry info
#[derive(Debug, Serialize)]
pub struct TrialSummary {
    pub client_id: String,
    pub business_name: String,
    pub contact_email: String,
    pub website_url: String,
    pub trial_id: String,
    pub trial_type: String,
    pub granted_by: Option<String>,
    pub status: String,
    pub subscription_status: String,
    pub trial_start_time: Option<NaiveDateTime>,
    pub trial_end_time: Option<NaiveDateTime>,
    pub trial_duration_hours: Option<i32>,
    pub extension_count: i32,
    pub auto_restricted_at: Option<NaiveDateTime>,
    pub conversion_date: Option<NaiveDateTime>,
    pub time_remaining_hours: Option<i64>,
    pub is_expired: bool,
}
