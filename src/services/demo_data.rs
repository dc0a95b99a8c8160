// Fabricated visitor generator for trial dashboards.
//
// Distribution targets: 20/50/30 interest split, 30% of visitors carry
// contact info, 40% a company affiliation, dwell times of 30s to an hour.

use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use crate::{
    db::DbPool,
    models::visitor::NewVisitor,
    schema::visitor_investigations,
    utils::{generate_visitor_id, ServiceError},
};

pub const DEFAULT_VISITOR_COUNT: usize = 75;

const COMPANIES: [&str; 5] = [
    "Acme Corp",
    "TechStart Inc",
    "Global Solutions",
    "Innovation Labs",
    "Digital Dynamics",
];
const JOB_TITLES: [&str; 6] = [
    "Marketing Director",
    "Sales Manager",
    "CEO",
    "Procurement Lead",
    "Product Manager",
    "Operations Manager",
];
const PAGES: [&str; 8] = [
    "/home", "/about", "/services", "/contact", "/pricing", "/blog", "/products", "/support",
];
const LOCATIONS: [&str; 5] = [
    "New York, United States",
    "Toronto, Canada",
    "London, United Kingdom",
    "Berlin, Germany",
    "Sydney, Australia",
];
const BROWSERS: [&str; 4] = ["Chrome", "Firefox", "Safari", "Edge"];
const DEVICES: [&str; 3] = ["Desktop", "Mobile", "Tablet"];
const OPERATING_SYSTEMS: [&str; 5] = ["Windows", "macOS", "Linux", "iOS", "Android"];
const TRAFFIC_SOURCES: [&str; 4] = ["Google", "Direct", "Social Media", "Email"];
const UA_PLATFORMS: [&str; 3] = ["Windows NT 10.0", "Macintosh", "X11; Linux x86_64"];
const FIRST_NAMES: [&str; 8] = [
    "Alex", "Jordan", "Taylor", "Morgan", "Casey", "Riley", "Jamie", "Quinn",
];
const LAST_NAMES: [&str; 8] = [
    "Smith", "Johnson", "Lee", "Patel", "Garcia", "Murphy", "Chen", "Novak",
];

fn weighted_interest<R: Rng>(rng: &mut R) -> &'static str {
    match rng.gen_range(0..10) {
        0..=1 => "high",
        2..=6 => "medium",
        _ => "low",
    }
}

pub struct DemoDataService {
    pool: DbPool,
}

impl DemoDataService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert `count` fabricated visitors for the client. Returns the number
    /// inserted.
    pub async fn generate_visitors(
        &self,
        client_id: &str,
        count: usize,
    ) -> Result<usize, ServiceError> {
        let rows = build_visitors(client_id, count);

        let mut conn = self.pool.get().await?;
        // diesel-async has no batch insert on SQLite; insert row by row
        for row in &rows {
            diesel::insert_into(visitor_investigations::table)
                .values(row)
                .execute(&mut conn)
                .await?;
        }

        info!(client_id = %client_id, count, "demo visitors generated");
        Ok(rows.len())
    }
}

fn build_visitors(client_id: &str, count: usize) -> Vec<NewVisitor> {
    let mut rng = rand::thread_rng();
    let now = Utc::now().naive_utc();

    (0..count)
        .map(|i| {
            let page_count = rng.gen_range(1..=PAGES.len());
            let mut pages: Vec<&str> = PAGES
                .choose_multiple(&mut rng, page_count)
                .copied()
                .collect();
            pages.shuffle(&mut rng);

            let interest_level = weighted_interest(&mut rng);
            let company = *COMPANIES.choose(&mut rng).unwrap_or(&COMPANIES[0]);
            let has_contact = rng.gen_bool(0.3);
            let has_company = rng.gen_bool(0.4);

            let name = if has_contact {
                Some(format!(
                    "{} {}",
                    FIRST_NAMES.choose(&mut rng).unwrap_or(&FIRST_NAMES[0]),
                    LAST_NAMES.choose(&mut rng).unwrap_or(&LAST_NAMES[0]),
                ))
            } else {
                None
            };
            let email = if has_contact {
                Some(format!(
                    "visitor{}@{}.com",
                    i,
                    company.to_lowercase().replace(' ', "")
                ))
            } else {
                None
            };
            let phone = if has_contact {
                Some(format!(
                    "+1-555-{}-{}",
                    rng.gen_range(100..1000),
                    rng.gen_range(1000..10000)
                ))
            } else {
                None
            };

            let session_count = rng.gen_range(1..=5);
            let first_visit = now - Duration::minutes(rng.gen_range(60..60 * 24 * 7));
            let last_activity = now - Duration::minutes(rng.gen_range(0..60));

            NewVisitor {
                visitor_id: generate_visitor_id(),
                client_id: client_id.to_string(),
                name,
                email,
                phone,
                company: has_company.then(|| company.to_string()),
                job_title: has_company
                    .then(|| JOB_TITLES.choose(&mut rng).unwrap_or(&JOB_TITLES[0]).to_string()),
                location: LOCATIONS.choose(&mut rng).map(|l| l.to_string()),
                ip_address: Some(format!(
                    "192.168.{}.{}",
                    rng.gen_range(1..=255),
                    rng.gen_range(1..=255)
                )),
                user_agent: UA_PLATFORMS
                    .choose(&mut rng)
                    .map(|p| format!("Mozilla/5.0 ({})", p)),
                current_page: pages.last().map(|p| p.to_string()),
                pages_visited: serde_json::to_string(&pages).ok(),
                time_on_site_seconds: rng.gen_range(30..=3600),
                interest_level: interest_level.to_string(),
                traffic_source: TRAFFIC_SOURCES.choose(&mut rng).map(|s| s.to_string()),
                device_type: DEVICES.choose(&mut rng).map(|d| d.to_string()),
                browser: BROWSERS.choose(&mut rng).map(|b| b.to_string()),
                operating_system: OPERATING_SYSTEMS.choose(&mut rng).map(|o| o.to_string()),
                session_count,
                total_page_views: pages.len() as i32 * session_count,
                is_active: rng.gen_bool(0.2),
                first_visit,
                last_activity,
            }
        })
        .collect()
}
