// Token verification: the one routine every token-gated route goes
// through. Checks run in a fixed order (token -> trial expiry -> token
// expiry -> VPN -> country -> IP -> session limit) and every denial leaves
// an audit row behind.

use chrono::{Duration, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use ipnetwork::IpNetwork;
use serde::Serialize;
use serde_json::{Map, Value};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::warn;

use crate::{
    app::AppState,
    db::DbPool,
    models::{
        access_log::{AccessLog, NewAccessLog},
        client::{Client, STATUS_ACTIVE, STATUS_TRIAL},
        client_user::{
            has_permission, ClientUser, CountryRestrictions, Role, USER_TRIAL_EXPIRED,
        },
        session::NewUserSession,
    },
    schema::{access_logs, client_users, clients, user_sessions},
    services::geo::{country_in_continents, country_name, GeoInfo, GeoProvider},
    utils::{generate_session_id, ServiceError},
};

/// Resolved caller context handed to handlers after a successful check
#[derive(Debug, Clone, Serialize)]
pub struct UserContext {
    pub user_id: String,
    pub client_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub business_name: String,
    pub website_url: String,
    pub subscription_status: String,
    pub plan_type: String,
    pub account_type: String,
    pub is_trial: bool,
    pub trial_end_time: Option<NaiveDateTime>,
    pub trial_hours_remaining: Option<i64>,
    pub current_country: Option<String>,
    pub current_country_name: Option<String>,
    pub is_vpn: bool,
    #[serde(skip_serializing)]
    pub permissions: Map<String, Value>,
    #[serde(skip_serializing)]
    pub session_limit: i32,
}

impl UserContext {
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or(Role::Viewer)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        has_permission(self.role(), &self.permissions, permission)
    }
}

/// IP allow-list check. Entries are exact addresses or CIDR blocks; an
/// empty list means no restriction.
pub fn ip_allowed(allowed: &[String], ip: IpAddr) -> bool {
    if allowed.is_empty() {
        return true;
    }

    allowed.iter().any(|entry| {
        if entry.contains('/') {
            entry
                .parse::<IpNetwork>()
                .map(|network| network.contains(ip))
                .unwrap_or(false)
        } else {
            entry
                .parse::<IpAddr>()
                .map(|allowed_ip| allowed_ip == ip)
                .unwrap_or(false)
        }
    })
}

/// Country restriction check against allow/block rules over country codes
/// and continent groups. Missing or empty rules allow everyone.
pub fn country_allowed(rules: Option<&CountryRestrictions>, country_code: &str) -> bool {
    let Some(rules) = rules else {
        return true;
    };
    if rules.is_empty() {
        return true;
    }

    let listed = rules.countries.iter().any(|c| c == country_code)
        || country_in_continents(country_code, &rules.continents);

    match rules.restriction_type.as_str() {
        "block" => !listed,
        _ => listed,
    }
}

pub struct AccessService {
    pool: DbPool,
    geo: Arc<dyn GeoProvider>,
    session_ttl_hours: i64,
}

impl AccessService {
    pub fn new(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
            geo: state.geo.clone(),
            session_ttl_hours: state.config.session_ttl_hours,
        }
    }

    /// Verify an access token and return the caller context, or AccessDenied.
    pub async fn verify(
        &self,
        access_token: &str,
        ip: Option<IpAddr>,
        user_agent: Option<&str>,
    ) -> Result<UserContext, ServiceError> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now().naive_utc();

        let row: Option<(ClientUser, Client)> = client_users::table
            .inner_join(clients::table.on(clients::client_id.eq(client_users::client_id)))
            .filter(client_users::access_token.eq(access_token))
            .filter(client_users::status.eq("active"))
            .filter(clients::subscription_status.eq_any([STATUS_ACTIVE, STATUS_TRIAL]))
            .select((ClientUser::as_select(), Client::as_select()))
            .first(&mut conn)
            .await
            .optional()?;

        let Some((user, client)) = row else {
            // Unknown token: nothing to attribute the audit row to
            self.log(NewAccessLog {
                details: Some("Invalid or inactive token".to_string()),
                success: false,
                ip_address: ip.map(|i| i.to_string()),
                user_agent: user_agent.map(str::to_string),
                ..NewAccessLog::action("access_denied")
            })
            .await;
            return Err(ServiceError::AccessDenied);
        };

        let mut denial = NewAccessLog {
            user_id: Some(user.user_id.clone()),
            client_id: Some(user.client_id.clone()),
            success: false,
            ip_address: ip.map(|i| i.to_string()),
            user_agent: user_agent.map(str::to_string),
            ..NewAccessLog::action("access_denied")
        };

        // Trial expiry: restrict on the spot rather than waiting for the sweep
        if client.is_trial() {
            if let Some(trial_end) = client.trial_end_time {
                if now >= trial_end {
                    diesel::update(
                        client_users::table.filter(client_users::user_id.eq(&user.user_id)),
                    )
                    .set((
                        client_users::status.eq(USER_TRIAL_EXPIRED),
                        client_users::trial_restricted.eq(true),
                    ))
                    .execute(&mut conn)
                    .await?;

                    denial.details = Some("Trial expired".to_string());
                    self.log(denial).await;
                    return Err(ServiceError::AccessDenied);
                }
            }
        }

        // Per-user token expiry
        if let Some(expires_at) = user.access_expires_at {
            if now > expires_at {
                denial.details = Some("Access expired".to_string());
                self.log(denial).await;
                return Err(ServiceError::AccessDenied);
            }
        }

        // Geo-dependent checks share one lookup
        let geo = match ip {
            Some(ip) => Some(self.geo.lookup(ip).await),
            None => None,
        };
        if let Some(info) = &geo {
            denial.country_code = Some(info.country_code.clone());
            denial.is_vpn = info.is_proxy;
        }

        if user.block_vpn && geo.as_ref().map(|g| g.is_proxy).unwrap_or(false) {
            denial.details = Some("VPN/Proxy blocked".to_string());
            self.log(denial).await;
            return Err(ServiceError::AccessDenied);
        }

        if let Some(info) = &geo {
            let rules = user.country_restriction_rules();
            if !country_allowed(rules.as_ref(), &info.country_code) {
                denial.details = Some(format!("Country not allowed: {}", info.country_code));
                self.log(denial).await;
                return Err(ServiceError::AccessDenied);
            }
        }

        if let Some(ip) = ip {
            if !ip_allowed(&user.allowed_ip_list(), ip) {
                denial.details = Some(format!("IP not allowed: {}", ip));
                self.log(denial).await;
                return Err(ServiceError::AccessDenied);
            }
        }

        // Session limit: live sessions must stay below the configured cap
        let active_sessions: i64 = user_sessions::table
            .filter(user_sessions::user_id.eq(&user.user_id))
            .filter(user_sessions::is_active.eq(true))
            .filter(user_sessions::expires_at.gt(now))
            .count()
            .get_result(&mut conn)
            .await?;

        if active_sessions >= user.session_limit as i64 {
            denial.details = Some("Session limit exceeded".to_string());
            self.log(denial).await;
            return Err(ServiceError::AccessDenied);
        }

        diesel::update(client_users::table.filter(client_users::user_id.eq(&user.user_id)))
            .set(client_users::last_access.eq(now))
            .execute(&mut conn)
            .await?;

        let trial_hours_remaining = if client.is_trial() {
            client
                .trial_end_time
                .map(|end| ((end - now).num_seconds().max(0)) / 3600)
        } else {
            None
        };

        Ok(UserContext {
            user_id: user.user_id.clone(),
            client_id: user.client_id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            business_name: client.business_name,
            website_url: client.website_url,
            subscription_status: client.subscription_status,
            plan_type: client.plan_type,
            account_type: client.account_type.clone(),
            is_trial: client.account_type == "trial",
            trial_end_time: client.trial_end_time,
            trial_hours_remaining,
            current_country: geo.as_ref().map(|g| g.country_code.clone()),
            current_country_name: geo.as_ref().map(|g| country_name(&g.country_code)),
            is_vpn: geo.as_ref().map(|g| g.is_proxy).unwrap_or(false),
            permissions: user.permission_overrides(),
            session_limit: user.session_limit,
        })
    }

    /// Open a session for a verified user (dashboard access)
    pub async fn create_session(
        &self,
        ctx: &UserContext,
        ip: Option<IpAddr>,
        user_agent: Option<&str>,
        geo: Option<&GeoInfo>,
    ) -> Result<String, ServiceError> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now().naive_utc();
        let session_id = generate_session_id();

        let session = NewUserSession {
            session_id: session_id.clone(),
            user_id: ctx.user_id.clone(),
            client_id: ctx.client_id.clone(),
            ip_address: ip.map(|i| i.to_string()),
            country_code: geo.map(|g| g.country_code.clone()),
            is_vpn: geo.map(|g| g.is_proxy).unwrap_or(false),
            user_agent: user_agent.map(str::to_string),
            expires_at: now + Duration::hours(self.session_ttl_hours),
            is_active: true,
            created_at: now,
            last_activity: now,
        };

        diesel::insert_into(user_sessions::table)
            .values(&session)
            .execute(&mut conn)
            .await?;

        Ok(session_id)
    }

    /// Deactivate sessions past their expiry. Returns rows touched.
    pub async fn cleanup_expired_sessions(&self) -> Result<usize, ServiceError> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now().naive_utc();

        let updated = diesel::update(
            user_sessions::table
                .filter(user_sessions::is_active.eq(true))
                .filter(user_sessions::expires_at.le(now)),
        )
        .set(user_sessions::is_active.eq(false))
        .execute(&mut conn)
        .await?;

        Ok(updated)
    }

    /// Write an audit row; failures are logged and swallowed so auditing
    /// can never turn a deny into a 500.
    pub async fn log(&self, entry: NewAccessLog) {
        let result = async {
            let mut conn = self.pool.get().await?;
            diesel::insert_into(access_logs::table)
                .values(&entry)
                .execute(&mut conn)
                .await?;
            Ok::<_, ServiceError>(())
        }
        .await;

        if let Err(e) = result {
            warn!("failed to write access log: {}", e);
        }
    }

    /// Convenience wrapper for successful actions
    pub async fn log_action(
        &self,
        ctx: &UserContext,
        action: &str,
        resource: Option<&str>,
        ip: Option<IpAddr>,
    ) {
        self.log(NewAccessLog {
            user_id: Some(ctx.user_id.clone()),
            client_id: Some(ctx.client_id.clone()),
            resource: resource.map(str::to_string),
            ip_address: ip.map(|i| i.to_string()),
            country_code: ctx.current_country.clone(),
            is_vpn: ctx.is_vpn,
            ..NewAccessLog::action(action)
        })
        .await;
    }

    /// Recent audit rows for one client, newest first
    pub async fn recent_logs(
        &self,
        client_id: &str,
        limit: i64,
    ) -> Result<Vec<AccessLog>, ServiceError> {
        let mut conn = self.pool.get().await?;

        let logs = access_logs::table
            .filter(access_logs::client_id.eq(client_id))
            .order(access_logs::timestamp.desc())
            .limit(limit)
            .select(AccessLog::as_select())
            .load(&mut conn)
            .await?;

        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(json: &str) -> CountryRestrictions {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn empty_allow_list_allows_everything() {
        assert!(ip_allowed(&[], "203.0.113.1".parse().unwrap()));
    }

    #[test]
    fn exact_ip_match() {
        let allowed = vec!["203.0.113.1".to_string()];
        assert!(ip_allowed(&allowed, "203.0.113.1".parse().unwrap()));
        assert!(!ip_allowed(&allowed, "203.0.113.2".parse().unwrap()));
    }

    #[test]
    fn cidr_match() {
        let allowed = vec!["10.0.0.0/8".to_string()];
        assert!(ip_allowed(&allowed, "10.42.0.7".parse().unwrap()));
        assert!(!ip_allowed(&allowed, "192.168.1.1".parse().unwrap()));
    }

    #[test]
    fn malformed_entries_never_match() {
        let allowed = vec!["not-an-ip".to_string(), "300.0.0.0/8".to_string()];
        assert!(!ip_allowed(&allowed, "10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn mixed_exact_and_cidr() {
        let allowed = vec!["192.168.1.5".to_string(), "10.0.0.0/24".to_string()];
        assert!(ip_allowed(&allowed, "192.168.1.5".parse().unwrap()));
        assert!(ip_allowed(&allowed, "10.0.0.200".parse().unwrap()));
        assert!(!ip_allowed(&allowed, "10.0.1.1".parse().unwrap()));
    }

    #[test]
    fn no_rules_allows_all_countries() {
        assert!(country_allowed(None, "US"));
        assert!(country_allowed(
            Some(&rules(r#"{"type": "allow", "countries": []}"#)),
            "US"
        ));
    }

    #[test]
    fn allow_list_requires_membership() {
        let r = rules(r#"{"type": "allow", "countries": ["US", "CA"]}"#);
        assert!(country_allowed(Some(&r), "US"));
        assert!(!country_allowed(Some(&r), "DE"));
    }

    #[test]
    fn block_list_inverts() {
        let r = rules(r#"{"type": "block", "countries": ["CN"]}"#);
        assert!(!country_allowed(Some(&r), "CN"));
        assert!(country_allowed(Some(&r), "US"));
    }

    #[test]
    fn continent_rules_expand_to_members() {
        let r = rules(r#"{"type": "allow", "continents": ["EU"]}"#);
        assert!(country_allowed(Some(&r), "DE"));
        assert!(country_allowed(Some(&r), "FR"));
        assert!(!country_allowed(Some(&r), "US"));

        let r = rules(r#"{"type": "block", "continents": ["EU"], "countries": ["US"]}"#);
        assert!(!country_allowed(Some(&r), "DE"));
        assert!(!country_allowed(Some(&r), "US"));
        assert!(country_allowed(Some(&r), "JP"));
    }
}
