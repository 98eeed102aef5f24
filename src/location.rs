//! Location resolution: device fix, then IP geolocation, then the configured default.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::http::{build_client, get_json, FetchError};
use crate::logging::{info, obj, v_num, v_str, warn, Domain};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub coords: Coordinates,
    pub city: String,
}

impl Location {
    pub fn new(coords: Coordinates, city: impl Into<String>) -> Self {
        Self {
            coords,
            city: city.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("geolocation is not supported")]
    Unavailable,

    #[error("geolocation denied: {0}")]
    Denied(String),

    #[error("geolocation timed out after {0:?}")]
    Timeout(Duration),
}

/// One-shot, high-accuracy position fix with no cached result.
#[async_trait]
pub trait DeviceLocator: Send + Sync {
    async fn locate(&self) -> Result<Coordinates, GeoError>;
}

/// No geolocation capability on this host.
pub struct NoDeviceLocator;

#[async_trait]
impl DeviceLocator for NoDeviceLocator {
    async fn locate(&self) -> Result<Coordinates, GeoError> {
        Err(GeoError::Unavailable)
    }
}

/// Reports a position supplied up front (e.g. from configuration).
pub struct FixedLocator(pub Coordinates);

#[async_trait]
impl DeviceLocator for FixedLocator {
    async fn locate(&self) -> Result<Coordinates, GeoError> {
        Ok(self.0)
    }
}

pub fn device_locator(cfg: &Config) -> Arc<dyn DeviceLocator> {
    match cfg.device_coords {
        Some(coords) => Arc::new(FixedLocator(coords)),
        None => Arc::new(NoDeviceLocator),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReverseGeocode {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub locality: Option<String>,
}

impl ReverseGeocode {
    /// City, else locality; blank names count as missing.
    pub fn place_name(&self) -> Option<&str> {
        [self.city.as_deref(), self.locality.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IpLocation {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub city: Option<String>,
}

#[async_trait]
pub trait LocationLookup: Send + Sync {
    async fn reverse_geocode(&self, coords: Coordinates) -> Result<ReverseGeocode, FetchError>;
    async fn ip_lookup(&self) -> Result<IpLocation, FetchError>;
}

/// bigdatacloud reverse geocoding plus ipapi.co IP geolocation.
pub struct HttpLocationLookup {
    client: Client,
    reverse_url: String,
    ip_url: String,
    language: String,
}

impl HttpLocationLookup {
    pub fn new(cfg: &Config) -> Self {
        Self {
            client: build_client(cfg.http_timeout),
            reverse_url: cfg.reverse_geocode_url.clone(),
            ip_url: cfg.ip_geolocation_url.clone(),
            language: cfg.locality_language.clone(),
        }
    }
}

#[async_trait]
impl LocationLookup for HttpLocationLookup {
    async fn reverse_geocode(&self, coords: Coordinates) -> Result<ReverseGeocode, FetchError> {
        let url = url::Url::parse_with_params(
            &self.reverse_url,
            &[
                ("latitude", coords.latitude.to_string()),
                ("longitude", coords.longitude.to_string()),
                ("localityLanguage", self.language.clone()),
            ],
        )?;
        get_json(&self.client, url.as_str()).await
    }

    async fn ip_lookup(&self) -> Result<IpLocation, FetchError> {
        get_json(&self.client, &self.ip_url).await
    }
}

pub struct LocationResolver {
    locator: Arc<dyn DeviceLocator>,
    lookup: Arc<dyn LocationLookup>,
    fallback: Location,
    unknown_city: String,
    timeout: Duration,
}

impl LocationResolver {
    pub fn new(cfg: &Config, locator: Arc<dyn DeviceLocator>, lookup: Arc<dyn LocationLookup>) -> Self {
        Self {
            locator,
            lookup,
            fallback: cfg.fallback_location.clone(),
            unknown_city: cfg.unknown_city.clone(),
            timeout: cfg.geolocation_timeout,
        }
    }

    /// Runs the fallback chain once. `publish` sees the coordinates as soon as
    /// a device fix arrives and again with the final city; the returned value
    /// is the final location. Never fails.
    pub async fn resolve<F>(&self, mut publish: F) -> Location
    where
        F: FnMut(&Location) + Send,
    {
        let fix = match tokio::time::timeout(self.timeout, self.locator.locate()).await {
            Ok(result) => result,
            Err(_) => Err(GeoError::Timeout(self.timeout)),
        };

        let location = match fix {
            Ok(coords) => {
                publish(&Location::new(coords, self.fallback.city.clone()));
                let city = self.city_for(coords).await;
                Location::new(coords, city)
            }
            Err(err) => {
                let event = match err {
                    GeoError::Unavailable => "device_unavailable",
                    _ => "device_denied",
                };
                warn(Domain::Geo, event, obj(&[("msg", v_str(&err.to_string()))]));
                self.locate_by_ip().await
            }
        };

        info(
            Domain::Geo,
            "resolved",
            obj(&[
                ("city", v_str(&location.city)),
                ("lat", v_num(location.coords.latitude)),
                ("lon", v_num(location.coords.longitude)),
            ]),
        );
        publish(&location);
        location
    }

    async fn city_for(&self, coords: Coordinates) -> String {
        match self.lookup.reverse_geocode(coords).await {
            Ok(place) => place
                .place_name()
                .map(str::to_string)
                .unwrap_or_else(|| self.unknown_city.clone()),
            Err(err) => {
                warn(
                    Domain::Geo,
                    "reverse_geocode_failed",
                    obj(&[("msg", v_str(&err.to_string()))]),
                );
                self.unknown_city.clone()
            }
        }
    }

    async fn locate_by_ip(&self) -> Location {
        match self.lookup.ip_lookup().await {
            Ok(ip) => {
                let city = ip
                    .city
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| self.fallback.city.clone());
                Location::new(
                    Coordinates::new(
                        ip.latitude.unwrap_or(self.fallback.coords.latitude),
                        ip.longitude.unwrap_or(self.fallback.coords.longitude),
                    ),
                    city,
                )
            }
            Err(err) => {
                warn(
                    Domain::Geo,
                    "ip_lookup_failed",
                    obj(&[("msg", v_str(&err.to_string()))]),
                );
                self.fallback.clone()
            }
        }
    }
}
