// Token-derived user sessions

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::schema::user_sessions;

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_sessions)]
pub struct NewUserSession {
    pub session_id: String,
    pub user_id: String,
    pub client_id: String,
    pub ip_address: Option<String>,
    pub country_code: Option<String>,
    pub is_vpn: bool,
    pub user_agent: Option<String>,
    pub expires_at: NaiveDateTime,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub last_activity: NaiveDateTime,
}
