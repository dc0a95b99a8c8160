// Audit trail rows. One row per granted or denied action.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::schema::access_logs;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = access_logs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AccessLog {
    pub id: i32,
    pub user_id: Option<String>,
    pub client_id: Option<String>,
    pub action: String,
    pub resource: Option<String>,
    pub ip_address: Option<String>,
    pub country_code: Option<String>,
    pub is_vpn: bool,
    pub user_agent: Option<String>,
    pub success: bool,
    pub details: Option<String>,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = access_logs)]
pub struct NewAccessLog {
    pub user_id: Option<String>,
    pub client_id: Option<String>,
    pub action: String,
    pub resource: Option<String>,
    pub ip_address: Option<String>,
    pub country_code: Option<String>,
    pub is_vpn: bool,
    pub user_agent: Option<String>,
    pub success: bool,
    pub details: Option<String>,
    pub timestamp: NaiveDateTime,
}

impl NewAccessLog {
    /// Start a log entry for an action; the rest of the fields are optional
    /// context filled in by the caller.
    pub fn action(action: &str) -> Self {
        Self {
            user_id: None,
            client_id: None,
            action: action.to_string(),
            resource: None,
            ip_address: None,
            country_code: None,
            is_vpn: false,
            user_agent: None,
            success: true,
            details: None,
            timestamp: chrono::Utc::now().naive_utc(),
        }
    }
}
