// Visitor investigation records: the fabricated "leads" served to dashboards

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::visitor_investigations;

/// Interest levels, in dashboard sort order (high first)
pub const INTEREST_LEVELS: [&str; 3] = ["high", "medium", "low"];

/// Sort weight used for the interest-level ordering
pub fn interest_rank(level: &str) -> i32 {
    match level {
        "high" => 1,
        "medium" => 2,
        "low" => 3,
        _ => 4,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = visitor_investigations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Visitor {
    pub id: i32,
    pub visitor_id: String,
    pub client_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub location: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub current_page: Option<String>,
    pub pages_visited: Option<String>,
    pub time_on_site_seconds: i32,
    pub interest_level: String,
    pub traffic_source: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub operating_system: Option<String>,
    pub session_count: i32,
    pub total_page_views: i32,
    pub is_active: bool,
    pub first_visit: NaiveDateTime,
    pub last_activity: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = visitor_investigations)]
pub struct NewVisitor {
    pub visitor_id: String,
    pub client_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub location: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub current_page: Option<String>,
    pub pages_visited: Option<String>,
    pub time_on_site_seconds: i32,
    pub interest_level: String,
    pub traffic_source: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub operating_system: Option<String>,
    pub session_count: i32,
    pub total_page_views: i32,
    pub is_active: bool,
    pub first_visit: NaiveDateTime,
    pub last_activity: NaiveDateTime,
}

// =============================================================================
// RESPONSE TYPES
// =============================================================================

/// Visitor payload after permission filtering. Hidden fields are replaced
/// rather than omitted so dashboard columns stay stable.
#[derive(Debug, Clone, Serialize)]
pub struct VisitorView {
    pub visitor_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub location: Option<String>,
    pub current_page: Option<String>,
    pub pages_visited: Vec<String>,
    pub time_on_site_seconds: i32,
    pub interest_level: String,
    pub traffic_source: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub first_visit: NaiveDateTime,
    pub last_activity: NaiveDateTime,
    pub session_count: i32,
    pub total_page_views: i32,
    pub is_active: bool,
}

impl From<&Visitor> for VisitorView {
    fn from(v: &Visitor) -> Self {
        let pages_visited = v
            .pages_visited
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();

        Self {
            visitor_id: v.visitor_id.clone(),
            name: v.name.clone(),
            email: v.email.clone(),
            phone: v.phone.clone(),
            company: v.company.clone(),
            job_title: v.job_title.clone(),
            location: v.location.clone(),
            current_page: v.current_page.clone(),
            pages_visited,
            time_on_site_seconds: v.time_on_site_seconds,
            interest_level: v.interest_level.clone(),
            traffic_source: v.traffic_source.clone(),
            device_type: v.device_type.clone(),
            browser: v.browser.clone(),
            first_visit: v.first_visit,
            last_activity: v.last_activity,
            session_count: v.session_count,
            total_page_views: v.total_page_views,
            is_active: v.is_active,
        }
    }
}

/// Pagination block returned alongside visitor pages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_visitors: i64,
    pub per_page: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let page = page.max(1);
        let total_pages = (total + per_page - 1) / per_page;
        Self {
            current_page: page,
            total_pages,
            total_visitors: total,
            per_page,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    pub page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_math_is_consistent() {
        let p = Pagination::new(1, 50, 75);
        assert_eq!(p.total_pages, 2);
        assert!(p.has_next);
        assert!(!p.has_prev);

        let p = Pagination::new(2, 50, 75);
        assert!(!p.has_next);
        assert!(p.has_prev);

        let p = Pagination::new(1, 50, 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next);

        // exact multiple has no phantom page
        let p = Pagination::new(2, 50, 100);
        assert_eq!(p.total_pages, 2);
        assert!(!p.has_next);
    }

    #[test]
    fn page_numbers_clamp_to_one() {
        let p = Pagination::new(0, 50, 10);
        assert_eq!(p.current_page, 1);
        let p = Pagination::new(-3, 50, 10);
        assert_eq!(p.current_page, 1);
    }

    #[test]
    fn interest_rank_orders_high_first() {
        assert!(interest_rank("high") < interest_rank("medium"));
        assert!(interest_rank("medium") < interest_rank("low"));
        assert!(interest_rank("low") < interest_rank("unknown"));
    }
}
