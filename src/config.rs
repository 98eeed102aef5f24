use std::time::Duration;

use crate::location::{Coordinates, Location};
use crate::logging::{obj, v_str, warn, Domain};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_CITY: &str = "Белгород";
pub const UNKNOWN_CITY: &str = "Неизвестно";
pub const DEFAULT_LATITUDE: f64 = 50.6167;
pub const DEFAULT_LONGITUDE: f64 = 36.5833;
/// Size of the `/speed` payload served by the backend.
pub const SPEED_PAYLOAD_BYTES: usize = 50 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub fallback_location: Location,
    pub unknown_city: String,
    /// Used only when the `/speed` response reports no body length.
    pub speed_payload_bytes: usize,
    pub clock_tick: Duration,
    pub weather_every: Duration,
    pub network_every: Duration,
    pub geolocation_timeout: Duration,
    pub http_timeout: Duration,
    pub reverse_geocode_url: String,
    pub ip_geolocation_url: String,
    pub locality_language: String,
    pub search_engine_url: String,
    pub show_network: bool,
    /// Fix reported by the device locator; `None` means no capability.
    pub device_coords: Option<Coordinates>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            fallback_location: Location::new(
                Coordinates::new(DEFAULT_LATITUDE, DEFAULT_LONGITUDE),
                DEFAULT_CITY,
            ),
            unknown_city: UNKNOWN_CITY.to_string(),
            speed_payload_bytes: SPEED_PAYLOAD_BYTES,
            clock_tick: Duration::from_secs(1),
            weather_every: Duration::from_secs(600),
            network_every: Duration::from_secs(5),
            geolocation_timeout: Duration::from_secs(10),
            http_timeout: Duration::from_secs(30),
            reverse_geocode_url: "https://api.bigdatacloud.net/data/reverse-geocode-client"
                .to_string(),
            ip_geolocation_url: "https://ipapi.co/json/".to_string(),
            locality_language: "ru".to_string(),
            search_engine_url: "https://www.google.com/search?q=".to_string(),
            show_network: true,
            device_coords: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        let device_coords = match (env_parse::<f64>("TABDASH_DEVICE_LAT"), env_parse::<f64>("TABDASH_DEVICE_LON")) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        };
        Self {
            backend_url: std::env::var("TABDASH_BACKEND_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(d.backend_url),
            fallback_location: Location::new(
                Coordinates::new(
                    env_parse("TABDASH_FALLBACK_LAT").unwrap_or(d.fallback_location.coords.latitude),
                    env_parse("TABDASH_FALLBACK_LON").unwrap_or(d.fallback_location.coords.longitude),
                ),
                std::env::var("TABDASH_FALLBACK_CITY").unwrap_or(d.fallback_location.city),
            ),
            unknown_city: std::env::var("TABDASH_UNKNOWN_CITY").unwrap_or(d.unknown_city),
            speed_payload_bytes: env_parse("TABDASH_SPEED_PAYLOAD_BYTES").unwrap_or(d.speed_payload_bytes),
            clock_tick: env_secs("TABDASH_CLOCK_SECS").unwrap_or(d.clock_tick),
            weather_every: env_secs("TABDASH_WEATHER_SECS").unwrap_or(d.weather_every),
            network_every: env_secs("TABDASH_NETWORK_SECS").unwrap_or(d.network_every),
            geolocation_timeout: env_secs("TABDASH_GEO_TIMEOUT_SECS").unwrap_or(d.geolocation_timeout),
            http_timeout: env_secs("TABDASH_HTTP_TIMEOUT_SECS").unwrap_or(d.http_timeout),
            reverse_geocode_url: std::env::var("TABDASH_REVERSE_GEOCODE_URL").unwrap_or(d.reverse_geocode_url),
            ip_geolocation_url: std::env::var("TABDASH_IP_GEO_URL").unwrap_or(d.ip_geolocation_url),
            locality_language: std::env::var("TABDASH_LOCALITY_LANG").unwrap_or(d.locality_language),
            search_engine_url: std::env::var("TABDASH_SEARCH_URL").unwrap_or(d.search_engine_url),
            show_network: std::env::var("TABDASH_SHOW_NETWORK")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(d.show_network),
            device_coords,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key).ok().and_then(|raw| parse_secs(key, &raw))
}

/// Whole seconds, strictly positive; timers cannot run on a zero period.
fn parse_secs(key: &str, raw: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
            warn(
                Domain::System,
                "config_rejected",
                obj(&[("key", v_str(key)), ("value", v_str(raw))]),
            );
            None
        }
    }
}
