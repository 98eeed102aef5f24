use async_trait::async_trait;
use reqwest::Client;

use crate::config::Config;
use crate::http::{build_client, ensure_ok, FetchError};
use crate::location::Coordinates;
use crate::weather::WeatherSnapshot;

/// The dashboard backend: forecast proxy plus ping/speed probe targets.
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn weather(&self, coords: Coordinates) -> Result<WeatherSnapshot, FetchError>;
    async fn ping(&self) -> Result<(), FetchError>;
    /// Downloads the speed payload and returns the number of bytes received.
    async fn speed(&self) -> Result<usize, FetchError>;
}

pub struct HttpBackend {
    client: Client,
    base: String,
}

impl HttpBackend {
    pub fn new(cfg: &Config) -> Self {
        Self {
            client: build_client(cfg.http_timeout),
            base: cfg.backend_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn weather(&self, coords: Coordinates) -> Result<WeatherSnapshot, FetchError> {
        let url = url::Url::parse_with_params(
            &self.endpoint("/weather"),
            &[
                ("lat", coords.latitude.to_string()),
                ("lon", coords.longitude.to_string()),
            ],
        )?;
        let res = ensure_ok(self.client.get(url).send().await?)?;
        Ok(res.json::<WeatherSnapshot>().await?)
    }

    async fn ping(&self) -> Result<(), FetchError> {
        // Any response counts; only the round trip matters.
        self.client.get(self.endpoint("/ping")).send().await?;
        Ok(())
    }

    async fn speed(&self) -> Result<usize, FetchError> {
        let res = ensure_ok(self.client.get(self.endpoint("/speed")).send().await?)?;
        let body = res.bytes().await?;
        Ok(body.len())
    }
}
