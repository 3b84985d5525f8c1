use crate::{
    Config, PostalLocation, RequestContext, WeatherReading,
    provider::{viacep::ViaCepResolver, weatherapi::WeatherApiResolver},
};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use std::{fmt::Debug, sync::Arc, time::Duration};

pub mod viacep;
pub mod weatherapi;

/// Maps a postal code to the locality it belongs to.
#[async_trait]
pub trait LocalityResolver: Send + Sync + Debug {
    /// An unknown code is not an error: it yields an empty locality name.
    async fn resolve(&self, ctx: &RequestContext, code: &str) -> anyhow::Result<PostalLocation>;
}

/// Maps a locality to its current temperature in Celsius and Fahrenheit.
#[async_trait]
pub trait WeatherResolver: Send + Sync + Debug {
    /// Kelvin is left unset. A body without temperature data yields the all-zero
    /// sentinel reading instead of an error.
    async fn resolve(
        &self,
        ctx: &RequestContext,
        location: &PostalLocation,
    ) -> anyhow::Result<WeatherReading>;
}

/// Both resolvers, ready to be handed to [`crate::WeatherUseCase`].
#[derive(Debug, Clone)]
pub struct Resolvers {
    pub locality: Arc<dyn LocalityResolver>,
    pub weather: Arc<dyn WeatherResolver>,
}

/// Construct the ViaCEP and WeatherAPI resolvers from config, sharing one HTTP client.
pub fn resolvers_from_config(config: &Config) -> anyhow::Result<Resolvers> {
    let api_key = config.weather_api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for WeatherAPI.\n\
                 Hint: set WEATHER_API_KEY or `weather_api_key` in the config file."
        )
    })?;

    let http = build_http_client(config.request_timeout())?;

    Ok(Resolvers {
        locality: Arc::new(ViaCepResolver::with_client(
            http.clone(),
            config.locality_base_url.clone(),
        )),
        weather: Arc::new(WeatherApiResolver::with_client(
            http,
            api_key.to_owned(),
            config.weather_base_url.clone(),
        )),
    })
}

/// The per-request context normally ends first; the client timeout only guards
/// callers that pass a context without a deadline.
pub fn build_http_client(timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("weather-core/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
