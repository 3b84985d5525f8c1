use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State, rejection::PathRejection},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{any::Any, time::Duration};
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};
use weather_core::{RequestContext, WeatherError, WeatherReading, WeatherUseCase};

/// Shared by every handler. Cloning is cheap: the resolvers sit behind `Arc`s.
#[derive(Debug, Clone)]
pub struct AppState {
    pub use_case: WeatherUseCase,
    pub request_timeout: Duration,
}

#[derive(Debug, Serialize)]
pub struct TemperatureResponse {
    #[serde(rename = "temp_C")]
    pub celsius: f64,
    #[serde(rename = "temp_F")]
    pub fahrenheit: f64,
    #[serde(rename = "temp_K")]
    pub kelvin: f64,
}

impl From<WeatherReading> for TemperatureResponse {
    fn from(reading: WeatherReading) -> Self {
        Self {
            celsius: reading.celsius,
            fahrenheit: reading.fahrenheit,
            kelvin: reading.kelvin,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub time: DateTime<Utc>,
}

/// HTTP face of [`WeatherError`].
#[derive(Debug)]
pub struct ApiError(pub WeatherError);

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self.0 {
            WeatherError::InvalidInput => (StatusCode::UNPROCESSABLE_ENTITY, "invalid zipcode"),
            WeatherError::LocationNotFound => (StatusCode::NOT_FOUND, "can not find zipcode"),
            WeatherError::UpstreamLocalityFailure
            | WeatherError::UpstreamWeatherFailure
            | WeatherError::WeatherDataNotFound => {
                (StatusCode::INTERNAL_SERVER_ERROR, "An unexpected error occurred")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(ErrorResponse { message })).into_response()
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/weather/{code}", get(get_weather_by_postal_code))
        .fallback(not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// One INFO span per request, tagged with the id set by `SetRequestIdLayer`.
fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id,
    )
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP",
        time: Utc::now(),
    })
}

async fn get_weather_by_postal_code(
    State(state): State<AppState>,
    code: Result<Path<String>, PathRejection>,
) -> Result<Json<TemperatureResponse>, ApiError> {
    // A segment that does not decode to UTF-8 is just another malformed code.
    let Path(code) = code.map_err(|rejection| {
        tracing::info!(error = %rejection, "weather lookup rejected");
        ApiError(WeatherError::InvalidInput)
    })?;

    let ctx = RequestContext::new().with_timeout(state.request_timeout);
    // Dropping the handler (client gone) cancels whatever lookup is still running.
    let _guard = ctx.token().clone().drop_guard();

    match state.use_case.get_weather_by_postal_code(&ctx, &code).await {
        Ok(reading) => Ok(Json(reading.into())),
        Err(err) => {
            tracing::info!(code = %code, error = %err, "weather lookup rejected");
            Err(ApiError(err))
        }
    }
}

async fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            message: "not found",
        }),
    )
}

fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            message: "An unexpected error occurred",
        }),
    )
        .into_response()
}
