use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl FetchError {
    /// True when the server answered but not with 2xx.
    pub fn is_status(&self) -> bool {
        matches!(self, FetchError::Status(_))
    }
}

pub fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

pub fn ensure_ok(res: Response) -> Result<Response, FetchError> {
    let status = res.status();
    if status.is_success() {
        Ok(res)
    } else {
        Err(FetchError::Status(status.as_u16()))
    }
}

pub async fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T, FetchError> {
    let res = ensure_ok(client.get(url).send().await?)?;
    Ok(res.json::<T>().await?)
}
