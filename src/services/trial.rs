// Trial lifecycle: creation, extension, conversion, restriction, and the
// expiry sweep. Restriction is idempotent so the sweep, the task executor,
// and the manual endpoint can all hit the same client without double
// counting.

use chrono::{Duration, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::{info, warn};

use crate::{
    db::DbPool,
    models::{
        client::{
            Client, NewClient, PlanType, ACCOUNT_FULL, ACCOUNT_TRIAL, STATUS_ACTIVE,
            STATUS_TRIAL, STATUS_TRIAL_EXPIRED,
        },
        client_user::{full_permissions, trial_permissions, NewClientUser, Role, USER_ACTIVE, USER_TRIAL_EXPIRED},
        trial::{
            CreateTrialRequest, CreateTrialResponse, NewAutomatedTask, NewTrial,
            NewTrialNotification, Trial, TrialSummary, MAX_TRIAL_HOURS, MIN_TRIAL_HOURS,
            NOTIFY_EXPIRED, NOTIFY_EXPIRING, NOTIFY_REMINDER, PENDING, TASK_GENERATE_DEMO_DATA,
            TASK_RESTRICT_TRIAL, TRIAL_ACTIVE, TRIAL_CONVERTED, TRIAL_EXPIRED,
            TRIAL_MANUALLY_RESTRICTED,
        },
    },
    schema::{automated_tasks, client_users, clients, trial_notifications, trials, user_sessions},
    utils::{
        generate_access_token, generate_client_id, generate_notification_id, generate_task_id,
        generate_trial_id, generate_user_id, trim_and_validate_field, ServiceError,
    },
};

/// Trial users get a lower seat cap than any paid plan
const TRIAL_MAX_USERS: i32 = 3;
const TRIAL_SESSION_LIMIT: i32 = 2;

pub struct TrialService {
    pool: DbPool,
    dashboard_base_url: String,
}

impl TrialService {
    pub fn new(pool: DbPool, dashboard_base_url: String) -> Self {
        Self {
            pool,
            dashboard_base_url,
        }
    }

    fn dashboard_url(&self, token: &str) -> String {
        format!("{}/dashboard/{}", self.dashboard_base_url, token)
    }

    /// Provision a trial: client, owner user with trial-limited permissions,
    /// trial record, scheduled notifications, and queued automation.
    pub async fn create_trial(
        &self,
        req: CreateTrialRequest,
    ) -> Result<CreateTrialResponse, ServiceError> {
        if !(MIN_TRIAL_HOURS..=MAX_TRIAL_HOURS).contains(&req.duration_hours) {
            return Err(ServiceError::ValidationError(format!(
                "duration_hours must be between {} and {}",
                MIN_TRIAL_HOURS, MAX_TRIAL_HOURS
            )));
        }

        let business_name = trim_and_validate_field(&req.business_name, "business_name")
            .map_err(ServiceError::ValidationError)?;

        let mut conn = self.pool.get().await?;
        let now = Utc::now().naive_utc();
        let end_time = now + Duration::hours(req.duration_hours);

        let client_id = generate_client_id();
        let trial_id = generate_trial_id();
        let owner_user_id = generate_user_id();
        let owner_token = generate_access_token();

        let client = NewClient {
            client_id: client_id.clone(),
            business_name: business_name.clone(),
            contact_email: req.contact_email.trim().to_lowercase(),
            website_url: req.website_url.trim().to_string(),
            access_token: generate_access_token(),
            subscription_status: STATUS_TRIAL.to_string(),
            account_type: ACCOUNT_TRIAL.to_string(),
            plan_type: PlanType::Basic.as_str().to_string(),
            max_users: TRIAL_MAX_USERS,
            owner_user_id: Some(owner_user_id.clone()),
            trial_start_time: Some(now),
            trial_end_time: Some(end_time),
            trial_duration_hours: Some(req.duration_hours as i32),
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
            created_by: req.granted_by.clone(),
            access_expires_at: Some(end_time),
            allowed_ips: None,
            country_restrictions: None,
            block_vpn: false,
            permissions: Some(trial_permissions().to_string()),
            session_limit: TRIAL_SESSION_LIMIT,
            notes: None,
            created_at: now,
        };
        diesel::insert_into(client_users::table)
            .values(&owner)
            .execute(&mut conn)
            .await?;

        let trial = NewTrial {
            trial_id: trial_id.clone(),
            client_id: client_id.clone(),
            granted_by: req.granted_by,
            trial_type: req.trial_type.unwrap_or_else(|| "standard".to_string()),
            duration_hours: req.duration_hours as i32,
            start_time: now,
            end_time,
            status: TRIAL_ACTIVE.to_string(),
        };
        diesel::insert_into(trials::table)
            .values(&trial)
            .execute(&mut conn)
            .await?;

        self.schedule_notifications(&mut *conn, &client_id, now, end_time, req.duration_hours)
            .await?;

        let restrict = NewAutomatedTask {
            task_id: generate_task_id(),
            task_type: TASK_RESTRICT_TRIAL.to_string(),
            client_id: Some(client_id.clone()),
            trial_id: Some(trial_id.clone()),
            status: PENDING.to_string(),
            scheduled_at: end_time,
            task_data: None,
        };
        let demo_data = NewAutomatedTask {
            task_id: generate_task_id(),
            task_type: TASK_GENERATE_DEMO_DATA.to_string(),
            client_id: Some(client_id.clone()),
            trial_id: Some(trial_id.clone()),
            status: PENDING.to_string(),
            scheduled_at: now,
            task_data: None,
        };
        // diesel-async has no batch insert on SQLite; insert row by row
        for task in [restrict, demo_data] {
            diesel::insert_into(automated_tasks::table)
                .values(&task)
                .execute(&mut conn)
                .await?;
        }

        info!(
            client_id = %client_id,
            trial_id = %trial_id,
            hours = req.duration_hours,
            "trial created"
        );

        Ok(CreateTrialResponse {
            success: true,
            client_id,
            trial_id,
            dashboard_url: self.dashboard_url(&owner_token),
            access_token: owner_token,
            trial_end_time: end_time,
            duration_hours: req.duration_hours,
        })
    }

    /// Replace any pending notifications for the client with a fresh
    /// schedule: reminder at 75% of the period, expiry warning (1h before
    /// for short trials, 24h otherwise), expired notice at the end.
    async fn schedule_notifications(
        &self,
        conn: &mut crate::db::DbConnection,
        client_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        duration_hours: i64,
    ) -> Result<(), ServiceError> {
        diesel::delete(
            trial_notifications::table
                .filter(trial_notifications::client_id.eq(client_id))
                .filter(trial_notifications::status.eq(PENDING)),
        )
        .execute(conn)
        .await?;

        let reminder_at = start + Duration::seconds((end - start).num_seconds() * 3 / 4);
        let warning_lead = if duration_hours <= 24 {
            Duration::hours(1)
        } else {
            Duration::hours(24)
        };

        let rows = vec![
            NewTrialNotification {
                notification_id: generate_notification_id("reminder"),
                client_id: client_id.to_string(),
                notification_type: NOTIFY_REMINDER.to_string(),
                scheduled_time: reminder_at,
                status: PENDING.to_string(),
            },
            NewTrialNotification {
                notification_id: generate_notification_id("expiring"),
                client_id: client_id.to_string(),
                notification_type: NOTIFY_EXPIRING.to_string(),
                scheduled_time: end - warning_lead,
                status: PENDING.to_string(),
            },
            NewTrialNotification {
                notification_id: generate_notification_id("expired"),
                client_id: client_id.to_string(),
                notification_type: NOTIFY_EXPIRED.to_string(),
                scheduled_time: end,
                status: PENDING.to_string(),
            },
        ];
        // diesel-async has no batch insert on SQLite; insert row by row
        for row in rows {
            diesel::insert_into(trial_notifications::table)
                .values(&row)
                .execute(&mut *conn)
                .await?;
        }

        Ok(())
    }

    /// All trials with derived time-remaining, newest first
    pub async fn list_trials(&self) -> Result<Vec<TrialSummary>, ServiceError> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now().naive_utc();

        let rows: Vec<(Trial, Client)> = trials::table
            .inner_join(clients::table.on(clients::client_id.eq(trials::client_id)))
            .order(trials::start_time.desc())
            .select((Trial::as_select(), Client::as_select()))
            .load(&mut conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(trial, client)| {
                // clients.trial_end_time is what access checks and the sweep
                // consult, so the listing derives expiry from it too
                let end_time = client.trial_end_time.unwrap_or(trial.end_time);
                let remaining = (end_time - now).num_seconds();
                TrialSummary {
                    client_id: client.client_id,
                    business_name: client.business_name,
                    contact_email: client.contact_email,
                    website_url: client.website_url,
                    trial_id: trial.trial_id,
                    trial_type: trial.trial_type,
                    granted_by: trial.granted_by,
                    status: trial.status,
                    subscription_status: client.subscription_status,
                    trial_start_time: client.trial_start_time,
                    trial_end_time: client.trial_end_time,
                    trial_duration_hours: client.trial_duration_hours,
                    extension_count: trial.extension_count,
                    auto_restricted_at: trial.auto_restricted_at,
                    conversion_date: client.conversion_date,
                    time_remaining_hours: if remaining > 0 {
                        Some(remaining / 3600)
                    } else {
                        None
                    },
                    is_expired: remaining <= 0,
                }
            })
            .collect())
    }

    /// Extend a trial; also lifts any expiry restriction already applied.
    pub async fn extend_trial(
        &self,
        client_id: &str,
        additional_hours: i64,
    ) -> Result<NaiveDateTime, ServiceError> {
        if !(MIN_TRIAL_HOURS..=MAX_TRIAL_HOURS).contains(&additional_hours) {
            return Err(ServiceError::ValidationError(format!(
                "additional_hours must be between {} and {}",
                MIN_TRIAL_HOURS, MAX_TRIAL_HOURS
            )));
        }

        let mut conn = self.pool.get().await?;
        let now = Utc::now().naive_utc();

        let client: Client = clients::table
            .filter(clients::client_id.eq(client_id))
            .filter(clients::account_type.eq(ACCOUNT_TRIAL))
            .select(Client::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .ok_or(ServiceError::NotFound)?;

        // Expired trials resume from now, live ones from their current end
        let base = client.trial_end_time.map(|end| end.max(now)).unwrap_or(now);
        let new_end = base + Duration::hours(additional_hours);

        diesel::update(clients::table.filter(clients::client_id.eq(client_id)))
            .set((
                clients::trial_end_time.eq(new_end),
                clients::subscription_status.eq(STATUS_TRIAL),
                clients::trial_extended_count.eq(clients::trial_extended_count + 1),
                clients::auto_restricted_at.eq(None::<NaiveDateTime>),
            ))
            .execute(&mut conn)
            .await?;

        diesel::update(trials::table.filter(trials::client_id.eq(client_id)))
            .set((
                trials::end_time.eq(new_end),
                trials::status.eq(TRIAL_ACTIVE),
                trials::extension_count.eq(trials::extension_count + 1),
                trials::reminder_sent.eq(false),
                trials::expiration_warning_sent.eq(false),
                trials::auto_restricted_at.eq(None::<NaiveDateTime>),
            ))
            .execute(&mut conn)
            .await?;

        // Restore users the expiry restricted and push their token expiry out
        diesel::update(
            client_users::table
                .filter(client_users::client_id.eq(client_id))
                .filter(client_users::trial_restricted.eq(true)),
        )
        .set((
            client_users::status.eq(USER_ACTIVE),
            client_users::trial_restricted.eq(false),
        ))
        .execute(&mut conn)
        .await?;
        diesel::update(client_users::table.filter(client_users::client_id.eq(client_id)))
            .set(client_users::access_expires_at.eq(new_end))
            .execute(&mut conn)
            .await?;

        let duration_hours = (new_end - now).num_seconds() / 3600;
        self.schedule_notifications(&mut *conn, client_id, now, new_end, duration_hours)
            .await?;

        // A fresh restriction task for the new end time
        let restrict = NewAutomatedTask {
            task_id: generate_task_id(),
            task_type: TASK_RESTRICT_TRIAL.to_string(),
            client_id: Some(client_id.to_string()),
            trial_id: None,
            status: PENDING.to_string(),
            scheduled_at: new_end,
            task_data: None,
        };
        diesel::insert_into(automated_tasks::table)
            .values(&restrict)
            .execute(&mut conn)
            .await?;

        info!(client_id = %client_id, hours = additional_hours, "trial extended");
        Ok(new_end)
    }

    /// Convert a trial to a paid plan
    pub async fn convert_trial(
        &self,
        client_id: &str,
        plan: PlanType,
    ) -> Result<(), ServiceError> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now().naive_utc();

        let client: Client = clients::table
            .filter(clients::client_id.eq(client_id))
            .filter(clients::account_type.eq(ACCOUNT_TRIAL))
            .select(Client::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .ok_or(ServiceError::NotFound)?;

        diesel::update(clients::table.filter(clients::client_id.eq(client_id)))
            .set((
                clients::account_type.eq(ACCOUNT_FULL),
                clients::subscription_status.eq(STATUS_ACTIVE),
                clients::plan_type.eq(plan.as_str()),
                clients::max_users.eq(plan.max_users()),
                clients::conversion_date.eq(now),
                clients::auto_restricted_at.eq(None::<NaiveDateTime>),
            ))
            .execute(&mut conn)
            .await?;

        diesel::update(trials::table.filter(trials::client_id.eq(client_id)))
            .set((
                trials::status.eq(TRIAL_CONVERTED),
                trials::conversion_attempted.eq(true),
            ))
            .execute(&mut conn)
            .await?;

        // Everyone comes back, the owner gets the full permission set and
        // tokens stop expiring with the trial clock
        diesel::update(client_users::table.filter(client_users::client_id.eq(client_id)))
            .set((
                client_users::status.eq(USER_ACTIVE),
                client_users::trial_restricted.eq(false),
                client_users::access_expires_at.eq(None::<NaiveDateTime>),
            ))
            .execute(&mut conn)
            .await?;
        if let Some(owner_id) = &client.owner_user_id {
            diesel::update(client_users::table.filter(client_users::user_id.eq(owner_id)))
                .set(client_users::permissions.eq(full_permissions().to_string()))
                .execute(&mut conn)
                .await?;
        }

        // The pending schedule no longer applies
        diesel::delete(
            trial_notifications::table
                .filter(trial_notifications::client_id.eq(client_id))
                .filter(trial_notifications::status.eq(PENDING)),
        )
        .execute(&mut conn)
        .await?;
        diesel::delete(
            automated_tasks::table
                .filter(automated_tasks::client_id.eq(client_id))
                .filter(automated_tasks::task_type.eq(TASK_RESTRICT_TRIAL))
                .filter(automated_tasks::status.eq(PENDING)),
        )
        .execute(&mut conn)
        .await?;

        info!(client_id = %client_id, plan = plan.as_str(), "trial converted");
        Ok(())
    }

    /// Restrict a trial client: lock out its users, kill its sessions, mark
    /// the trial over. Returns false when the client was already restricted.
    pub async fn restrict_trial(
        &self,
        client_id: &str,
        manual: bool,
    ) -> Result<bool, ServiceError> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now().naive_utc();

        let client: Client = clients::table
            .filter(clients::client_id.eq(client_id))
            .select(Client::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .ok_or(ServiceError::NotFound)?;

        if client.subscription_status == STATUS_TRIAL_EXPIRED {
            return Ok(false);
        }

        diesel::update(clients::table.filter(clients::client_id.eq(client_id)))
            .set((
                clients::subscription_status.eq(STATUS_TRIAL_EXPIRED),
                clients::auto_restricted_at.eq(now),
            ))
            .execute(&mut conn)
            .await?;

        diesel::update(client_users::table.filter(client_users::client_id.eq(client_id)))
            .set((
                client_users::status.eq(USER_TRIAL_EXPIRED),
                client_users::trial_restricted.eq(true),
            ))
            .execute(&mut conn)
            .await?;

        diesel::update(
            user_sessions::table
                .filter(user_sessions::client_id.eq(client_id))
                .filter(user_sessions::is_active.eq(true)),
        )
        .set(user_sessions::is_active.eq(false))
        .execute(&mut conn)
        .await?;

        let trial_status = if manual {
            TRIAL_MANUALLY_RESTRICTED
        } else {
            TRIAL_EXPIRED
        };
        diesel::update(
            trials::table
                .filter(trials::client_id.eq(client_id))
                .filter(trials::status.eq(TRIAL_ACTIVE)),
        )
        .set((
            trials::status.eq(trial_status),
            trials::auto_restricted_at.eq(now),
        ))
        .execute(&mut conn)
        .await?;

        info!(client_id = %client_id, manual, "trial restricted");
        Ok(true)
    }

    /// Find trials past their end time and restrict them. Returns how many
    /// clients were newly restricted.
    pub async fn sweep_expired(&self) -> Result<usize, ServiceError> {
        let now = Utc::now().naive_utc();

        let expired: Vec<String> = {
            let mut conn = self.pool.get().await?;
            clients::table
                .filter(clients::account_type.eq(ACCOUNT_TRIAL))
                .filter(clients::subscription_status.eq_any([STATUS_ACTIVE, STATUS_TRIAL]))
                .filter(clients::trial_end_time.le(now))
                .select(clients::client_id)
                .load(&mut conn)
                .await?
        };

        let mut restricted = 0;
        for client_id in expired {
            match self.restrict_trial(&client_id, false).await {
                Ok(true) => restricted += 1,
                Ok(false) => {}
                Err(e) => warn!(client_id = %client_id, "failed to restrict expired trial: {}", e),
            }
        }

        Ok(restricted)
    }
}
