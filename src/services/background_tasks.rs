// Periodic maintenance: trial expiry sweep, session cleanup, notification
// dispatch, and the automated task queue. The same cycle backs both the
// interval loop and the /health endpoint.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::{
    app::AppState,
    models::trial::{
        AutomatedTask, TrialNotification, COMPLETED, FAILED, NOTIFY_EXPIRING, NOTIFY_REMINDER,
        PENDING, SENT, TASK_GENERATE_DEMO_DATA, TASK_RESTRICT_TRIAL,
    },
    schema::{automated_tasks, trial_notifications, trials},
    services::{
        access::AccessService, demo_data::DemoDataService, trial::TrialService,
    },
    utils::ServiceError,
};

/// What one maintenance cycle did
#[derive(Debug, Default, Clone, Serialize)]
pub struct MaintenanceReport {
    pub restricted_trials: usize,
    pub sessions_closed: usize,
    pub notifications_sent: usize,
    pub tasks_executed: usize,
}

/// One pass over everything due: expired trials, stale sessions, due
/// notifications, due tasks.
pub async fn run_maintenance_cycle(state: &AppState) -> Result<MaintenanceReport, ServiceError> {
    let trials = TrialService::new(state.pool.clone(), state.config.dashboard_base_url.clone());
    let access = AccessService::new(state);

    let mut report = MaintenanceReport {
        restricted_trials: trials.sweep_expired().await?,
        sessions_closed: access.cleanup_expired_sessions().await?,
        ..MaintenanceReport::default()
    };
    report.notifications_sent = dispatch_due_notifications(state).await?;
    report.tasks_executed = execute_due_tasks(state).await?;

    Ok(report)
}

/// Mark due notifications sent. Delivery is a structured log line; an
/// email integration can hook in here later.
async fn dispatch_due_notifications(state: &AppState) -> Result<usize, ServiceError> {
    let mut conn = state.pool.get().await?;
    let now = Utc::now().naive_utc();

    let due: Vec<TrialNotification> = trial_notifications::table
        .filter(trial_notifications::status.eq(PENDING))
        .filter(trial_notifications::scheduled_time.le(now))
        .select(TrialNotification::as_select())
        .load(&mut conn)
        .await?;

    for notification in &due {
        info!(
            notification_id = %notification.notification_id,
            client_id = %notification.client_id,
            notification_type = %notification.notification_type,
            "trial notification sent"
        );
        diesel::update(
            trial_notifications::table
                .filter(trial_notifications::notification_id.eq(&notification.notification_id)),
        )
        .set((
            trial_notifications::status.eq(SENT),
            trial_notifications::sent_time.eq(now),
        ))
        .execute(&mut conn)
        .await?;

        // the trial row mirrors which milestones went out
        match notification.notification_type.as_str() {
            NOTIFY_REMINDER => {
                diesel::update(
                    trials::table.filter(trials::client_id.eq(&notification.client_id)),
                )
                .set(trials::reminder_sent.eq(true))
                .execute(&mut conn)
                .await?;
            }
            NOTIFY_EXPIRING => {
                diesel::update(
                    trials::table.filter(trials::client_id.eq(&notification.client_id)),
                )
                .set(trials::expiration_warning_sent.eq(true))
                .execute(&mut conn)
                .await?;
            }
            _ => {}
        }
    }

    Ok(due.len())
}

/// Run every due pending task, with retry accounting up to max_retries
async fn execute_due_tasks(state: &AppState) -> Result<usize, ServiceError> {
    let due: Vec<AutomatedTask> = {
        let mut conn = state.pool.get().await?;
        automated_tasks::table
            .filter(automated_tasks::status.eq(PENDING))
            .filter(automated_tasks::scheduled_at.le(Utc::now().naive_utc()))
            .select(AutomatedTask::as_select())
            .load(&mut conn)
            .await?
    };

    let mut executed = 0;
    for task in due {
        match execute_task(state, &task).await {
            Ok(result) => {
                let mut conn = state.pool.get().await?;
                diesel::update(
                    automated_tasks::table.filter(automated_tasks::task_id.eq(&task.task_id)),
                )
                .set((
                    automated_tasks::status.eq(COMPLETED),
                    automated_tasks::executed_at.eq(Utc::now().naive_utc()),
                    automated_tasks::result.eq(result),
                ))
                .execute(&mut conn)
                .await?;
                executed += 1;
            }
            Err(e) => {
                warn!(task_id = %task.task_id, task_type = %task.task_type, "task failed: {}", e);
                let retries = task.retry_count + 1;
                let status = if retries >= task.max_retries {
                    FAILED
                } else {
                    PENDING
                };
                let mut conn = state.pool.get().await?;
                diesel::update(
                    automated_tasks::table.filter(automated_tasks::task_id.eq(&task.task_id)),
                )
                .set((
                    automated_tasks::retry_count.eq(retries),
                    automated_tasks::status.eq(status),
                    automated_tasks::error_message.eq(e.to_string()),
                ))
                .execute(&mut conn)
                .await?;
            }
        }
    }

    Ok(executed)
}

async fn execute_task(state: &AppState, task: &AutomatedTask) -> Result<String, ServiceError> {
    let client_id = task.client_id.as_deref().ok_or_else(|| {
        ServiceError::ValidationError(format!("task {} has no client_id", task.task_id))
    })?;

    match task.task_type.as_str() {
        TASK_GENERATE_DEMO_DATA => {
            let count = task
                .task_data
                .as_deref()
                .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
                .and_then(|v| v.get("count").and_then(|c| c.as_u64()))
                .map(|c| c as usize)
                .unwrap_or(crate::services::demo_data::DEFAULT_VISITOR_COUNT);
            let generated = DemoDataService::new(state.pool.clone())
                .generate_visitors(client_id, count)
                .await?;
            Ok(format!("generated {} visitors", generated))
        }
        TASK_RESTRICT_TRIAL => {
            let trials =
                TrialService::new(state.pool.clone(), state.config.dashboard_base_url.clone());
            let restricted = trials.restrict_trial(client_id, false).await?;
            Ok(if restricted {
                "client restricted".to_string()
            } else {
                "already restricted".to_string()
            })
        }
        other => Err(ServiceError::ValidationError(format!(
            "unknown task type: {}",
            other
        ))),
    }
}

pub struct BackgroundTaskManager {
    state: AppState,
}

impl BackgroundTaskManager {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Spawn the maintenance loop
    pub fn start_all_tasks(&self) {
        let state = self.state.clone();
        let interval = Duration::from_secs(state.config.trial_sweep_interval_secs);
        info!(interval_secs = interval.as_secs(), "starting maintenance loop");

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // the immediate first tick would race startup seeding
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match run_maintenance_cycle(&state).await {
                    Ok(report) => {
                        if report.restricted_trials > 0
                            || report.notifications_sent > 0
                            || report.tasks_executed > 0
                        {
                            info!(
                                restricted = report.restricted_trials,
                                sessions_closed = report.sessions_closed,
                                notifications = report.notifications_sent,
                                tasks = report.tasks_executed,
                                "maintenance cycle complete"
                            );
                        }
                    }
                    Err(e) => error!("maintenance cycle failed: {}", e),
                }
            }
        });
    }
}

/// Initialize background tasks (call this in main.rs)
pub fn initialize_background_tasks(state: AppState) {
    BackgroundTaskManager::new(state).start_all_tasks();
}
