use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{PostalLocation, RequestContext, WeatherReading, provider::truncate_body};

use super::WeatherResolver;

pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1";

/// Current conditions from WeatherAPI.com, queried by locality name.
#[derive(Debug, Clone)]
pub struct WeatherApiResolver {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiResolver {
    pub fn new(api_key: String, base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), api_key, base_url.into())
    }

    pub fn with_client(http: Client, api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    async fn fetch_current(&self, location: &PostalLocation) -> Result<WeatherReading> {
        let url = format!("{}/current.json", self.base_url);

        // reqwest percent-encodes the query, so "São Paulo" goes out as S%C3%A3o+Paulo.
        let res = self
            .http
            .get(url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", location.locality_name.as_str()),
                ("aqi", "no"),
            ])
            .send()
            .await
            .context("Failed to send request to WeatherAPI.com (current)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read WeatherAPI current response body")?;

        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "WeatherAPI current request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: Option<WaResponse> =
            serde_json::from_str(&body).context("Failed to parse WeatherAPI current JSON")?;

        let current = parsed.and_then(|r| r.current).unwrap_or_default();
        Ok(WeatherReading::raw(
            current.temp_c.unwrap_or_default(),
            current.temp_f.unwrap_or_default(),
        ))
    }
}

// Every level may be missing or null; whatever is absent reads as 0.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaCurrent {
    temp_c: Option<f64>,
    temp_f: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaResponse {
    current: Option<WaCurrent>,
}

#[async_trait]
impl WeatherResolver for WeatherApiResolver {
    async fn resolve(
        &self,
        ctx: &RequestContext,
        location: &PostalLocation,
    ) -> Result<WeatherReading> {
        ctx.run("WeatherAPI lookup", self.fetch_current(location))
            .await
    }
}
