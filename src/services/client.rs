// Client (tenant) provisioning and per-client user management

use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::info;
use validator::Validate;

use crate::{
    db::DbPool,
    models::{
        client::{
            Client, ClientSummary, CreateClientRequest, CreateClientResponse, NewClient,
            PlanType, ACCOUNT_FULL, STATUS_ACTIVE,
        },
        client_user::{
            full_permissions, ClientUser, CreateUserRequest, CreateUserResponse, NewClientUser,
            Role, USER_ACTIVE, USER_RESTRICTED,
        },
    },
    schema::{client_users, clients, user_sessions},
    services::access::UserContext,
    utils::{
        generate_access_token, generate_client_id, generate_user_id, trim_and_validate_field,
        trim_optional_field, ServiceError,
    },
};

pub struct ClientService {
    pool: DbPool,
    dashboard_base_url: String,
}

impl ClientService {
    pub fn new(pool: DbPool, dashboard_base_url: String) -> Self {
        Self {
            pool,
            dashboard_base_url,
        }
    }

    fn dashboard_url(&self, token: &str) -> String {
        format!("{}/dashboard/{}", self.dashboard_base_url, token)
    }

    /// Provision a paid client with an owner user holding full permissions
    pub async fn create_client(
        &self,
        req: CreateClientRequest,
    ) -> Result<CreateClientResponse, ServiceError> {
        req.validate()?;

        let plan: PlanType = req
            .plan_type
            .as_deref()
            .unwrap_or("basic")
            .parse()
            .map_err(ServiceError::ValidationError)?;

        let business_name = trim_and_validate_field(&req.business_name, "business_name")
            .map_err(ServiceError::ValidationError)?;

        let mut conn = self.pool.get().await?;
        let now = Utc::now().naive_utc();

        let client_id = generate_client_id();
        let owner_user_id = generate_user_id();
        let owner_token = generate_access_token();

        let client = NewClient {
            client_id: client_id.clone(),
            business_name: business_name.clone(),
            contact_email: req.contact_email.trim().to_lowercase(),
            website_url: req.website_url.trim().to_string(),
            access_token: generate_access_token(),
            subscription_status: STATUS_ACTIVE.to_string(),
            account_type: ACCOUNT_FULL.to_string(),
            plan_type: plan.as_str().to_string(),
            max_users: plan.max_users(),
            owner_user_id: Some(owner_user_id.clone()),
            trial_start_time: None,
            trial_end_time: None,
            trial_duration_hours: None,
            created_at: now,
        };
        diesel::insert_into(clients::table)
            .values(&client)
            .execute(&mut conn)
            .await?;

        let owner = NewClientUser {
            user_id: owner_user_id,
            client_id: client_id.clone(),
            name: business_name,
            email: req.contact_email.trim().to_lowercase(),
            role: Role::Owner.as_str().to_string(),
            access_token: owner_token.clone(),
            status: USER_ACTIVE.to_string(),
            created_by: None,
            access_expires_at: None,
            allowed_ips: None,
            country_restrictions: None,
            block_vpn: false,
            permissions: Some(full_permissions().to_string()),
            session_limit: 3,
            notes: None,
            created_at: now,
        };
        diesel::insert_into(client_users::table)
            .values(&owner)
            .execute(&mut conn)
            .await?;

        info!(client_id = %client_id, plan = plan.as_str(), "client created");

        Ok(CreateClientResponse {
            success: true,
            client_id,
            dashboard_url: self.dashboard_url(&owner_token),
            access_token: owner_token,
            message: "Client created successfully".to_string(),
        })
    }

    /// Admin listing: every client with its active-user count
    pub async fn list_clients(&self) -> Result<Vec<ClientSummary>, ServiceError> {
        let mut conn = self.pool.get().await?;

        let all_clients: Vec<Client> = clients::table
            .order(clients::created_at.desc())
            .select(Client::as_select())
            .load(&mut conn)
            .await?;

        let counts: Vec<(String, i64)> = client_users::table
            .filter(client_users::status.eq(USER_ACTIVE))
            .group_by(client_users::client_id)
            .select((client_users::client_id, diesel::dsl::count_star()))
            .load(&mut conn)
            .await?;

        Ok(all_clients
            .into_iter()
            .map(|c| {
                let current_users = counts
                    .iter()
                    .find(|(id, _)| id == &c.client_id)
                    .map(|(_, n)| *n)
                    .unwrap_or(0);
                ClientSummary {
                    client_id: c.client_id,
                    business_name: c.business_name,
                    contact_email: c.contact_email,
                    website_url: c.website_url,
                    subscription_status: c.subscription_status,
                    plan_type: c.plan_type,
                    max_users: c.max_users,
                    current_users,
                    created_at: c.created_at,
                    last_access: c.last_access,
                }
            })
            .collect())
    }

    /// Add a user to the caller's client, enforcing the plan's seat cap
    pub async fn create_user(
        &self,
        ctx: &UserContext,
        req: CreateUserRequest,
    ) -> Result<CreateUserResponse, ServiceError> {
        if !ctx.has_permission("manage_users") {
            return Err(ServiceError::PermissionDenied);
        }
        req.validate()?;

        let role: Role = req
            .role
            .as_deref()
            .unwrap_or("viewer")
            .parse()
            .map_err(ServiceError::ValidationError)?;

        let mut conn = self.pool.get().await?;
        let now = Utc::now().naive_utc();

        let max_users: i32 = clients::table
            .filter(clients::client_id.eq(&ctx.client_id))
            .select(clients::max_users)
            .first(&mut conn)
            .await?;
        let current: i64 = client_users::table
            .filter(client_users::client_id.eq(&ctx.client_id))
            .filter(client_users::status.eq(USER_ACTIVE))
            .count()
            .get_result(&mut conn)
            .await?;
        if current >= max_users as i64 {
            return Err(ServiceError::UserLimitReached);
        }

        let user_id = generate_user_id();
        let token = generate_access_token();

        let user = NewClientUser {
            user_id: user_id.clone(),
            client_id: ctx.client_id.clone(),
            name: req.name.trim().to_string(),
            email: req.email.trim().to_lowercase(),
            role: role.as_str().to_string(),
            access_token: token.clone(),
            status: USER_ACTIVE.to_string(),
            created_by: Some(ctx.user_id.clone()),
            access_expires_at: req
                .access_expires_hours
                .map(|hours| now + Duration::hours(hours)),
            allowed_ips: if req.allowed_ips.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&req.allowed_ips)?)
            },
            country_restrictions: match &req.country_restrictions {
                Some(rules) => Some(serde_json::to_string(rules)?),
                None => None,
            },
            block_vpn: req.block_vpn,
            permissions: req.permissions.as_ref().map(|p| p.to_string()),
            session_limit: req.session_limit.max(1),
            notes: trim_optional_field(req.notes.as_deref()),
            created_at: now,
        };
        diesel::insert_into(client_users::table)
            .values(&user)
            .execute(&mut conn)
            .await?;

        info!(client_id = %ctx.client_id, user_id = %user_id, role = role.as_str(), "user created");

        Ok(CreateUserResponse {
            success: true,
            user_id,
            access_token: token.clone(),
            dashboard_url: self.dashboard_url(&token),
        })
    }

    /// Users of the caller's client
    pub async fn list_users(&self, ctx: &UserContext) -> Result<Vec<ClientUser>, ServiceError> {
        if !ctx.has_permission("manage_users") {
            return Err(ServiceError::PermissionDenied);
        }

        let mut conn = self.pool.get().await?;
        let users = client_users::table
            .filter(client_users::client_id.eq(&ctx.client_id))
            .order(client_users::created_at.asc())
            .select(ClientUser::as_select())
            .load(&mut conn)
            .await?;
        Ok(users)
    }

    /// Toggle a user between active and restricted. Restricting also kills
    /// the user's live sessions. Returns the new status.
    pub async fn set_user_restricted(
        &self,
        ctx: &UserContext,
        target_user_id: &str,
        restricted: bool,
    ) -> Result<&'static str, ServiceError> {
        if !ctx.has_permission("manage_users") {
            return Err(ServiceError::PermissionDenied);
        }

        let mut conn = self.pool.get().await?;

        let target: ClientUser = client_users::table
            .filter(client_users::user_id.eq(target_user_id))
            .filter(client_users::client_id.eq(&ctx.client_id))
            .select(ClientUser::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .ok_or(ServiceError::NotFound)?;

        let new_status = if restricted {
            USER_RESTRICTED
        } else {
            USER_ACTIVE
        };
        diesel::update(client_users::table.filter(client_users::user_id.eq(&target.user_id)))
            .set(client_users::status.eq(new_status))
            .execute(&mut conn)
            .await?;

        if restricted {
            diesel::update(
                user_sessions::table
                    .filter(user_sessions::user_id.eq(&target.user_id))
                    .filter(user_sessions::is_active.eq(true)),
            )
            .set(user_sessions::is_active.eq(false))
            .execute(&mut conn)
            .await?;
        }

        info!(
            client_id = %ctx.client_id,
            user_id = %target.user_id,
            status = new_status,
            "user status changed"
        );
        Ok(new_status)
    }
}
