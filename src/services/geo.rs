// IP geolocation and VPN/proxy detection.
//
// Lookups are best-effort: a provider failure degrades to "Unknown" /
// not-a-proxy instead of denying access, so a geolocation outage cannot
// lock every user out of their dashboard.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

/// Result of a lookup for one address
#[derive(Debug, Clone, PartialEq)]
pub struct GeoInfo {
    pub country_code: String,
    pub is_proxy: bool,
}

impl GeoInfo {
    pub fn unknown() -> Self {
        Self {
            country_code: "Unknown".to_string(),
            is_proxy: false,
        }
    }
}

#[async_trait]
pub trait GeoProvider: Send + Sync {
    async fn lookup(&self, ip: IpAddr) -> GeoInfo;
}

// =============================================================================
// HTTP PROVIDER
// =============================================================================

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    #[serde(rename = "countryCode")]
    country_code: Option<String>,
    #[serde(default)]
    proxy: bool,
}

/// ip-api.com primary, ipinfo.io country fallback. Both are free tiers
/// that need no API key.
pub struct HttpGeoProvider {
    client: reqwest::Client,
}

impl HttpGeoProvider {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    async fn query_ip_api(&self, ip: IpAddr) -> Option<GeoInfo> {
        let url = format!("http://ip-api.com/json/{}?fields=countryCode,proxy", ip);
        let response = self.client.get(&url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let body: IpApiResponse = response.json().await.ok()?;
        Some(GeoInfo {
            country_code: body.country_code.unwrap_or_else(|| "Unknown".to_string()),
            is_proxy: body.proxy,
        })
    }

    async fn query_ipinfo(&self, ip: IpAddr) -> Option<GeoInfo> {
        let url = format!("https://ipinfo.io/{}/country", ip);
        let response = self.client.get(&url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let country = response.text().await.ok()?.trim().to_string();
        if country.is_empty() {
            return None;
        }
        Some(GeoInfo {
            country_code: country,
            // fallback service has no proxy signal
            is_proxy: false,
        })
    }
}

#[async_trait]
impl GeoProvider for HttpGeoProvider {
    async fn lookup(&self, ip: IpAddr) -> GeoInfo {
        if ip.is_loopback() {
            // Local development default
            return GeoInfo {
                country_code: "US".to_string(),
                is_proxy: false,
            };
        }

        if let Some(info) = self.query_ip_api(ip).await {
            return info;
        }
        if let Some(info) = self.query_ipinfo(ip).await {
            return info;
        }

        debug!("geo lookup failed for {}, treating as Unknown", ip);
        GeoInfo::unknown()
    }
}

/// No-network provider used when lookups are disabled by config
pub struct DisabledGeoProvider;

#[async_trait]
impl GeoProvider for DisabledGeoProvider {
    async fn lookup(&self, ip: IpAddr) -> GeoInfo {
        if ip.is_loopback() {
            GeoInfo {
                country_code: "US".to_string(),
                is_proxy: false,
            }
        } else {
            GeoInfo::unknown()
        }
    }
}

/// Fixed-answer provider for tests
pub struct StaticGeoProvider {
    pub info: GeoInfo,
}

#[async_trait]
impl GeoProvider for StaticGeoProvider {
    async fn lookup(&self, _ip: IpAddr) -> GeoInfo {
        self.info.clone()
    }
}

// =============================================================================
// COUNTRY / CONTINENT TABLES
// =============================================================================

pub static COUNTRIES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("US", "United States"),
        ("CA", "Canada"),
        ("MX", "Mexico"),
        ("GB", "United Kingdom"),
        ("DE", "Germany"),
        ("FR", "France"),
        ("IT", "Italy"),
        ("ES", "Spain"),
        ("NL", "Netherlands"),
        ("SE", "Sweden"),
        ("NO", "Norway"),
        ("DK", "Denmark"),
        ("FI", "Finland"),
        ("CH", "Switzerland"),
        ("AT", "Austria"),
        ("BE", "Belgium"),
        ("IE", "Ireland"),
        ("PT", "Portugal"),
        ("PL", "Poland"),
        ("CZ", "Czech Republic"),
        ("HU", "Hungary"),
        ("RO", "Romania"),
        ("GR", "Greece"),
        ("JP", "Japan"),
        ("KR", "South Korea"),
        ("SG", "Singapore"),
        ("HK", "Hong Kong"),
        ("TW", "Taiwan"),
        ("IN", "India"),
        ("CN", "China"),
        ("TH", "Thailand"),
        ("MY", "Malaysia"),
        ("ID", "Indonesia"),
        ("PH", "Philippines"),
        ("VN", "Vietnam"),
        ("PK", "Pakistan"),
        ("BD", "Bangladesh"),
        ("LK", "Sri Lanka"),
        ("BR", "Brazil"),
        ("AR", "Argentina"),
        ("CL", "Chile"),
        ("CO", "Colombia"),
        ("PE", "Peru"),
        ("ZA", "South Africa"),
        ("EG", "Egypt"),
        ("NG", "Nigeria"),
        ("KE", "Kenya"),
        ("MA", "Morocco"),
        ("AU", "Australia"),
        ("NZ", "New Zealand"),
    ])
});

pub static CONTINENTS: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    HashMap::from([
        (
            "NA",
            vec!["US", "CA", "MX", "GT", "BZ", "SV", "HN", "NI", "CR", "PA"],
        ),
        (
            "EU",
            vec![
                "GB", "DE", "FR", "IT", "ES", "NL", "SE", "NO", "DK", "FI", "CH", "AT", "BE",
                "IE", "PT", "LU", "PL", "CZ", "HU", "RO", "BG", "HR", "SI", "SK", "LT", "LV",
                "EE", "GR", "CY", "MT", "IS",
            ],
        ),
        (
            "AS",
            vec![
                "JP", "KR", "SG", "HK", "TW", "IN", "CN", "TH", "MY", "ID", "PH", "VN", "BD",
                "PK", "LK", "MM",
            ],
        ),
        (
            "SA",
            vec![
                "BR", "AR", "CL", "CO", "PE", "VE", "UY", "PY", "BO", "EC", "GY", "SR", "GF",
            ],
        ),
        (
            "AF",
            vec![
                "ZA", "EG", "NG", "KE", "MA", "GH", "TZ", "UG", "MZ", "MG", "CM", "CI", "SN",
                "TN", "RW",
            ],
        ),
        (
            "OC",
            vec!["AU", "NZ", "FJ", "PG", "NC", "SB", "VU", "WS"],
        ),
    ])
});

/// True when `country_code` belongs to any of the named continent groups
pub fn country_in_continents(country_code: &str, continents: &[String]) -> bool {
    continents.iter().any(|continent| {
        CONTINENTS
            .get(continent.as_str())
            .map(|codes| codes.contains(&country_code))
            .unwrap_or(false)
    })
}

pub fn country_name(country_code: &str) -> String {
    COUNTRIES
        .get(country_code)
        .map(|name| name.to_string())
        .unwrap_or_else(|| country_code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continent_membership() {
        assert!(country_in_continents("DE", &["EU".to_string()]));
        assert!(country_in_continents("JP", &["EU".to_string(), "AS".to_string()]));
        assert!(!country_in_continents("US", &["EU".to_string()]));
        assert!(!country_in_continents("US", &["XX".to_string()]));
    }

    #[test]
    fn unknown_country_code_echoes_back() {
        assert_eq!(country_name("US"), "United States");
        assert_eq!(country_name("ZZ"), "ZZ");
    }

    #[tokio::test]
    async fn disabled_provider_defaults_localhost_to_us() {
        let provider = DisabledGeoProvider;
        let info = provider.lookup("127.0.0.1".parse().unwrap()).await;
        assert_eq!(info.country_code, "US");
        assert!(!info.is_proxy);

        let info = provider.lookup("203.0.113.9".parse().unwrap()).await;
        assert_eq!(info.country_code, "Unknown");
    }
}
