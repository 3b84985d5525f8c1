use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use weather_core::{Config, RequestContext, WeatherUseCase, resolvers_from_config};

use crate::{routes, server};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-server", version, about = "Current temperature by Brazilian postal code")]
pub struct Cli {
    /// TOML config file; environment variables override its values.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default).
    Serve {
        /// Port to listen on; overrides PORT.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Look up one postal code and print the temperatures.
    Lookup {
        /// Eight-digit CEP, e.g. 01310930.
        code: String,
    },
}

impl Cli {
    /// Resolve the effective configuration: file, then environment, then flags.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?.with_overrides(Config::env_lookup()?)?,
            None => Config::from_env()?,
        };

        if let Some(Command::Serve { port: Some(port) }) = &self.command {
            config.port = *port;
        }

        Ok(config)
    }

    pub async fn run(self, config: Config) -> anyhow::Result<()> {
        let use_case = WeatherUseCase::from(resolvers_from_config(&config)?);

        match self.command.unwrap_or(Command::Serve { port: None }) {
            Command::Serve { .. } => {
                tracing::info!(
                    port = config.port,
                    request_timeout_secs = config.request_timeout_secs,
                    shutdown_timeout_secs = config.shutdown_timeout_secs,
                    "Starting weather server"
                );
                let app = routes::create_router(routes::AppState {
                    use_case,
                    request_timeout: config.request_timeout(),
                });
                server::run(config.port, app, config.shutdown_timeout()).await
            }
            Command::Lookup { code } => {
                let ctx = RequestContext::new().with_timeout(config.request_timeout());
                let reading = use_case
                    .get_weather_by_postal_code(&ctx, &code)
                    .await
                    .with_context(|| format!("Lookup for {code} failed"))?;

                println!("Temperature for {code}:");
                println!("  {:.1} °C", reading.celsius);
                println!("  {:.1} °F", reading.fahrenheit);
                println!("  {:.2} K", reading.kelvin);
                Ok(())
            }
        }
    }
}
