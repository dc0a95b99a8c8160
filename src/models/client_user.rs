// Per-tenant users, roles, permission lattice, and access restrictions

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use crate::schema::client_users;

// User status values
pub const USER_ACTIVE: &str = "active";
pub const USER_RESTRICTED: &str = "restricted";
pub const USER_TRIAL_EXPIRED: &str = "trial_expired";

/// Roles, from most to least privileged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Owner,
    Manager,
    Viewer,
    #[serde(rename = "readonly")]
    ReadOnly,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Owner => "owner",
            Role::Manager => "manager",
            Role::Viewer => "viewer",
            Role::ReadOnly => "readonly",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            "manager" => Ok(Role::Manager),
            "viewer" => Ok(Role::Viewer),
            "readonly" | "read_only" => Ok(Role::ReadOnly),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Role-based permission check with per-user JSON overrides.
///
/// The lattice: admin gets everything; owner defaults to everything but any
/// permission can be explicitly revoked (trial owners carry revocations
/// until conversion restores the full set); manager loses `manage_users` and
/// `delete_data` unless granted; viewer keeps only the view set by default;
/// readonly can only view visitors.
pub fn has_permission(role: Role, overrides: &Map<String, Value>, permission: &str) -> bool {
    let granted = |key: &str, default: bool| -> bool {
        overrides
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    };

    match role {
        Role::Admin => true,
        Role::Owner => granted(permission, true),
        Role::Manager => {
            if permission == "manage_users" || permission == "delete_data" {
                granted(permission, false)
            } else {
                true
            }
        },
        Role::Viewer => {
            if permission == "view_visitors" || permission == "view_basic_info" {
                granted(permission, true)
            } else {
                granted(permission, false)
            }
        },
        Role::ReadOnly => permission == "view_visitors" && granted(permission, true),
    }
}

/// Default permission set granted to the owner of a paid client
pub fn full_permissions() -> Value {
    serde_json::json!({
        "view_visitors": true,
        "view_contact_info": true,
        "view_email": true,
        "view_phone": true,
        "view_company": true,
        "export_data": true,
        "manage_users": true,
        "view_audit_logs": true
    })
}

/// Trial owners get a reduced set: no phone numbers, no export, no audit log
pub fn trial_permissions() -> Value {
    serde_json::json!({
        "view_visitors": true,
        "view_contact_info": true,
        "view_email": true,
        "view_phone": false,
        "view_company": true,
        "export_data": false,
        "manage_users": true,
        "view_audit_logs": false
    })
}

/// Country restriction blob stored on `client_users.country_restrictions`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountryRestrictions {
    /// "allow" (must match the lists) or "block" (must not)
    #[serde(rename = "type", default = "default_restriction_type")]
    pub restriction_type: String,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub continents: Vec<String>,
}

fn default_restriction_type() -> String {
    "allow".to_string()
}

impl CountryRestrictions {
    pub fn is_empty(&self) -> bool {
        self.countries.is_empty() && self.continents.is_empty()
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = client_users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ClientUser {
    pub id: i32,
    pub user_id: String,
    pub client_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    pub status: String,
    pub created_by: Option<String>,
    pub access_expires_at: Option<NaiveDateTime>,
    pub trial_restricted: bool,
    pub allowed_ips: Option<String>,
    pub country_restrictions: Option<String>,
    pub block_vpn: bool,
    pub permissions: Option<String>,
    pub session_limit: i32,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub last_access: Option<NaiveDateTime>,
}

impl ClientUser {
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or(Role::Viewer)
    }

    pub fn permission_overrides(&self) -> Map<String, Value> {
        self.permissions
            .as_deref()
            .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default()
    }

    pub fn allowed_ip_list(&self) -> Vec<String> {
        self.allowed_ips
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }

    pub fn country_restriction_rules(&self) -> Option<CountryRestrictions> {
        self.country_restrictions
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = client_users)]
pub struct NewClientUser {
    pub user_id: String,
    pub client_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub access_token: String,
    pub status: String,
    pub created_by: Option<String>,
    pub access_expires_at: Option<NaiveDateTime>,
    pub allowed_ips: Option<String>,
    pub country_restrictions: Option<String>,
    pub block_vpn: bool,
    pub permissions: Option<String>,
    pub session_limit: i32,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(default)]
    pub role: Option<String>,

    /// Hours until the token stops working; None means no expiry
    pub access_expires_hours: Option<i64>,

    /// Exact IPs or CIDR blocks; empty means unrestricted
    #[serde(default)]
    pub allowed_ips: Vec<String>,

    pub country_restrictions: Option<CountryRestrictions>,

    #[serde(default)]
    pub block_vpn: bool,

    pub permissions: Option<Value>,

    #[serde(default = "default_session_limit")]
    pub session_limit: i32,

    pub notes: Option<String>,
}

fn default_session_limit() -> i32 {
    1
}

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub success: bool,
    pub user_id: String,
    pub access_token: String,
    pub dashboard_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(json: Value) -> Map<String, Value> {
        json.as_object().cloned().unwrap()
    }

    #[test]
    fn admin_gets_everything() {
        let empty = Map::new();
        assert!(has_permission(Role::Admin, &empty, "delete_data"));
        assert!(has_permission(Role::Admin, &empty, "manage_users"));
    }

    #[test]
    fn owner_manage_users_is_overridable() {
        let empty = Map::new();
        assert!(has_permission(Role::Owner, &empty, "manage_users"));

        let revoked = overrides(serde_json::json!({"manage_users": false}));
        assert!(!has_permission(Role::Owner, &revoked, "manage_users"));
        assert!(has_permission(Role::Owner, &revoked, "export_data"));
    }

    #[test]
    fn trial_owner_revocations_hold_until_converted() {
        let trial = overrides(trial_permissions());
        assert!(!has_permission(Role::Owner, &trial, "export_data"));
        assert!(!has_permission(Role::Owner, &trial, "view_phone"));
        assert!(!has_permission(Role::Owner, &trial, "view_audit_logs"));
        assert!(has_permission(Role::Owner, &trial, "view_visitors"));
        assert!(has_permission(Role::Owner, &trial, "manage_users"));

        // conversion writes the full set back
        let full = overrides(full_permissions());
        assert!(has_permission(Role::Owner, &full, "export_data"));
        assert!(has_permission(Role::Owner, &full, "view_phone"));
    }

    #[test]
    fn manager_needs_explicit_grant_for_restricted_perms() {
        let empty = Map::new();
        assert!(!has_permission(Role::Manager, &empty, "manage_users"));
        assert!(!has_permission(Role::Manager, &empty, "delete_data"));
        assert!(has_permission(Role::Manager, &empty, "export_data"));

        let granted = overrides(serde_json::json!({"manage_users": true}));
        assert!(has_permission(Role::Manager, &granted, "manage_users"));
    }

    #[test]
    fn viewer_defaults_to_view_only() {
        let empty = Map::new();
        assert!(has_permission(Role::Viewer, &empty, "view_visitors"));
        assert!(!has_permission(Role::Viewer, &empty, "export_data"));

        let granted = overrides(serde_json::json!({"export_data": true}));
        assert!(has_permission(Role::Viewer, &granted, "export_data"));
    }

    #[test]
    fn readonly_only_views_visitors() {
        let empty = Map::new();
        assert!(has_permission(Role::ReadOnly, &empty, "view_visitors"));
        assert!(!has_permission(Role::ReadOnly, &empty, "view_contact_info"));

        // even an explicit grant cannot widen readonly
        let granted = overrides(serde_json::json!({"export_data": true}));
        assert!(!has_permission(Role::ReadOnly, &granted, "export_data"));
    }

    #[test]
    fn country_restrictions_default_to_allow() {
        let rules: CountryRestrictions =
            serde_json::from_str(r#"{"countries": ["US", "CA"]}"#).unwrap();
        assert_eq!(rules.restriction_type, "allow");
        assert!(!rules.is_empty());
    }
}
