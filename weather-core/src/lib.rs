//! Core library for the postal-code weather service.
//!
//! This crate defines:
//! - Postal code (CEP) validation
//! - Locality and weather resolver abstractions, with ViaCEP and WeatherAPI clients
//! - The use case chaining them into a three-scale temperature reading
//! - Configuration shared by the binaries
//!
//! It is used by `weather-server`, but can also be reused by other binaries or services.

pub mod config;
pub mod context;
pub mod model;
pub mod provider;
pub mod usecase;
pub mod validator;

pub use config::Config;
pub use context::RequestContext;
pub use model::{PostalLocation, WeatherReading};
pub use provider::{LocalityResolver, Resolvers, WeatherResolver, resolvers_from_config};
pub use usecase::{WeatherError, WeatherUseCase};
pub use validator::is_valid_postal_code;
