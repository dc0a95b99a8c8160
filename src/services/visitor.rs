// Visitor listing, permission filtering, and CSV export

use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::Integer;
use diesel_async::RunQueryDsl;
use serde::Serialize;
use serde_json::Value;

use crate::{
    db::DbPool,
    models::visitor::{Pagination, Visitor, VisitorView},
    schema::visitor_investigations,
    services::access::UserContext,
    utils::ServiceError,
};

pub const VISITORS_PER_PAGE: i64 = 50;

const HIDDEN: &str = "Hidden";

// Dashboard sort: interest level high-to-low, then dwell time
const INTEREST_ORDER_SQL: &str =
    "CASE interest_level WHEN 'high' THEN 1 WHEN 'medium' THEN 2 WHEN 'low' THEN 3 ELSE 4 END";

/// Blank out contact fields the caller is not allowed to see. Full
/// `view_contact_info` short-circuits the field-level checks.
pub fn filter_visitor(view: &mut VisitorView, ctx: &UserContext) {
    if ctx.has_permission("view_contact_info") {
        return;
    }

    if !ctx.has_permission("view_email") {
        view.email = view.email.as_ref().map(|_| HIDDEN.to_string());
    }
    if !ctx.has_permission("view_phone") {
        view.phone = view.phone.as_ref().map(|_| HIDDEN.to_string());
    }
    if !ctx.has_permission("view_company") {
        view.company = view.company.as_ref().map(|_| HIDDEN.to_string());
        view.job_title = view.job_title.as_ref().map(|_| HIDDEN.to_string());
    }
}

/// Interest levels the caller may see. None means unrestricted; a user
/// without `view_all_interest_levels` can be pinned to a subset through
/// the `allowed_interest_levels` override.
pub fn allowed_interest_levels(ctx: &UserContext) -> Option<Vec<String>> {
    if ctx.has_permission("view_all_interest_levels") {
        return None;
    }

    let levels: Vec<String> = ctx
        .permissions
        .get("allowed_interest_levels")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_lowercase)
                .collect()
        })
        .unwrap_or_default();

    if levels.is_empty() {
        None
    } else {
        Some(levels)
    }
}

#[derive(Debug, Serialize)]
pub struct VisitorPage {
    pub visitors: Vec<VisitorView>,
    pub pagination: Pagination,
}

pub struct VisitorService {
    pool: DbPool,
}

impl VisitorService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// One page of a client's visitors, filtered to what the caller may see
    pub async fn list_page(
        &self,
        ctx: &UserContext,
        page: i64,
    ) -> Result<VisitorPage, ServiceError> {
        if !ctx.has_permission("view_visitors") {
            return Err(ServiceError::PermissionDenied);
        }

        let mut conn = self.pool.get().await?;
        let page = page.max(1);
        let level_filter = allowed_interest_levels(ctx);

        let mut count_query = visitor_investigations::table
            .filter(visitor_investigations::client_id.eq(&ctx.client_id))
            .select(diesel::dsl::count_star())
            .into_boxed();
        if let Some(levels) = &level_filter {
            count_query = count_query
                .filter(visitor_investigations::interest_level.eq_any(levels.clone()));
        }
        let total: i64 = count_query.get_result(&mut conn).await?;

        let mut query = visitor_investigations::table
            .filter(visitor_investigations::client_id.eq(&ctx.client_id))
            .select(Visitor::as_select())
            .into_boxed();
        if let Some(levels) = &level_filter {
            query = query.filter(visitor_investigations::interest_level.eq_any(levels.clone()));
        }
        let visitors: Vec<Visitor> = query
            .order((
                sql::<Integer>(INTEREST_ORDER_SQL).asc(),
                visitor_investigations::time_on_site_seconds.desc(),
            ))
            .limit(VISITORS_PER_PAGE)
            .offset((page - 1) * VISITORS_PER_PAGE)
            .load(&mut conn)
            .await?;

        let visitors = visitors
            .iter()
            .map(|v| {
                let mut view = VisitorView::from(v);
                filter_visitor(&mut view, ctx);
                view
            })
            .collect();

        Ok(VisitorPage {
            visitors,
            pagination: Pagination::new(page, VISITORS_PER_PAGE, total),
        })
    }

    /// The client's full visitor set as CSV, same filtering as the listing
    pub async fn export_csv(&self, ctx: &UserContext) -> Result<String, ServiceError> {
        if !ctx.has_permission("export_data") {
            return Err(ServiceError::PermissionDenied);
        }

        let mut conn = self.pool.get().await?;

        let mut query = visitor_investigations::table
            .filter(visitor_investigations::client_id.eq(&ctx.client_id))
            .select(Visitor::as_select())
            .into_boxed();
        if let Some(levels) = allowed_interest_levels(ctx) {
            query = query.filter(visitor_investigations::interest_level.eq_any(levels));
        }
        let visitors: Vec<Visitor> = query
            .order((
                sql::<Integer>(INTEREST_ORDER_SQL).asc(),
                visitor_investigations::time_on_site_seconds.desc(),
            ))
            .load(&mut conn)
            .await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record([
                "visitor_id",
                "name",
                "email",
                "phone",
                "company",
                "job_title",
                "location",
                "interest_level",
                "time_on_site_seconds",
                "total_page_views",
                "traffic_source",
                "device_type",
                "browser",
                "first_visit",
                "last_activity",
            ])
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        for visitor in &visitors {
            let mut view = VisitorView::from(visitor);
            filter_visitor(&mut view, ctx);
            writer
                .write_record([
                    view.visitor_id.as_str(),
                    view.name.as_deref().unwrap_or(""),
                    view.email.as_deref().unwrap_or(""),
                    view.phone.as_deref().unwrap_or(""),
                    view.company.as_deref().unwrap_or(""),
                    view.job_title.as_deref().unwrap_or(""),
                    view.location.as_deref().unwrap_or(""),
                    view.interest_level.as_str(),
                    &view.time_on_site_seconds.to_string(),
                    &view.total_page_views.to_string(),
                    view.traffic_source.as_deref().unwrap_or(""),
                    view.device_type.as_deref().unwrap_or(""),
                    view.browser.as_deref().unwrap_or(""),
                    &view.first_visit.to_string(),
                    &view.last_activity.to_string(),
                ])
                .map_err(|e| ServiceError::InternalError(e.to_string()))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| ServiceError::InternalError(e.to_string()))
    }
}
