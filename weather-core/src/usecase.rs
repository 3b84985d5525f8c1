use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    RequestContext, WeatherReading,
    provider::{LocalityResolver, Resolvers, WeatherResolver},
    validator::is_valid_postal_code,
};

/// Why a postal-code weather lookup failed. Upstream transport details are logged,
/// never carried here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WeatherError {
    #[error("invalid postal code")]
    InvalidInput,
    #[error("could not fetch postal code information")]
    UpstreamLocalityFailure,
    #[error("postal code not found")]
    LocationNotFound,
    #[error("could not fetch weather information")]
    UpstreamWeatherFailure,
    #[error("weather information not found")]
    WeatherDataNotFound,
}

/// Postal code → locality → current temperature.
#[derive(Debug, Clone)]
pub struct WeatherUseCase {
    locality: Arc<dyn LocalityResolver>,
    weather: Arc<dyn WeatherResolver>,
}

impl WeatherUseCase {
    pub fn new(locality: Arc<dyn LocalityResolver>, weather: Arc<dyn WeatherResolver>) -> Self {
        Self { locality, weather }
    }

    pub async fn get_weather_by_postal_code(
        &self,
        ctx: &RequestContext,
        code: &str,
    ) -> Result<WeatherReading, WeatherError> {
        if !is_valid_postal_code(code) {
            return Err(WeatherError::InvalidInput);
        }

        if ctx.is_done() {
            return Err(WeatherError::UpstreamLocalityFailure);
        }
        let location = self.locality.resolve(ctx, code).await.map_err(|err| {
            warn!(code, "locality lookup failed: {err:#}");
            WeatherError::UpstreamLocalityFailure
        })?;

        if location.is_empty() {
            return Err(WeatherError::LocationNotFound);
        }
        debug!(code, locality = %location.locality_name, "resolved locality");

        if ctx.is_done() {
            return Err(WeatherError::UpstreamWeatherFailure);
        }
        let reading = self.weather.resolve(ctx, &location).await.map_err(|err| {
            warn!(locality = %location.locality_name, "weather lookup failed: {err:#}");
            WeatherError::UpstreamWeatherFailure
        })?;

        if reading.is_sentinel() {
            return Err(WeatherError::WeatherDataNotFound);
        }

        Ok(WeatherReading::from_scales(reading.celsius, reading.fahrenheit))
    }
}

impl From<Resolvers> for WeatherUseCase {
    fn from(resolvers: Resolvers) -> Self {
        Self::new(resolvers.locality, resolvers.weather)
    }
}
