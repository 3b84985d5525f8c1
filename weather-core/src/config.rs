use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path, str::FromStr, time::Duration};

use crate::provider::{viacep, weatherapi};

/// Environment variable naming an optional TOML config file.
pub const CONFIG_PATH_ENV: &str = "WEATHER_CONFIG";

/// Dotenv file read from the working directory. Real environment variables win.
pub const DOTENV_FILE: &str = ".env";

/// Process-wide settings, loaded once at startup and handed to constructors.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port the HTTP server listens on.
    pub port: u16,

    /// WeatherAPI.com key. Required to build the resolvers.
    pub weather_api_key: Option<String>,

    /// Example TOML:
    /// locality_base_url = "https://viacep.com.br/ws"
    pub locality_base_url: String,

    pub weather_base_url: String,

    /// Upper bound for one `/weather/{code}` request, both lookups included.
    pub request_timeout_secs: u64,

    /// How long in-flight requests may drain after a termination signal.
    pub shutdown_timeout_secs: u64,

    /// Emit JSON log lines instead of the human-readable format.
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            weather_api_key: None,
            locality_base_url: viacep::DEFAULT_BASE_URL.to_string(),
            weather_base_url: weatherapi::DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 5,
            shutdown_timeout_secs: 5,
            log_json: false,
        }
    }
}

impl Config {
    /// Load from the process environment (plus `.env`), starting from the file
    /// named by `WEATHER_CONFIG` when set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(Self::env_lookup()?)
    }

    /// Variable lookup over the process environment, falling back to `.env`.
    pub fn env_lookup() -> Result<impl Fn(&str) -> Option<String>> {
        let dotenv = read_dotenv(DOTENV_FILE)?;
        Ok(move |key: &str| std::env::var(key).ok().or_else(|| dotenv.get(key).cloned()))
    }

    /// Same as [`Self::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base = match lookup(CONFIG_PATH_ENV) {
            Some(path) if !path.is_empty() => Self::load(&path)?,
            _ => Self::default(),
        };
        base.with_overrides(lookup)
    }

    /// Load config from a TOML file. Missing keys fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Apply environment overrides on top of `self`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(port) = parse_var(&lookup, "PORT")? {
            self.port = port;
        }
        if let Some(key) = lookup("WEATHER_API_KEY").filter(|k| !k.is_empty()) {
            self.weather_api_key = Some(key);
        }
        if let Some(url) = lookup("VIACEP_BASE_URL").filter(|u| !u.is_empty()) {
            self.locality_base_url = url;
        }
        if let Some(url) = lookup("WEATHER_API_BASE_URL").filter(|u| !u.is_empty()) {
            self.weather_base_url = url;
        }
        if let Some(secs) = parse_var(&lookup, "REQUEST_TIMEOUT_SECS")? {
            self.request_timeout_secs = secs;
        }
        if let Some(secs) = parse_var(&lookup, "SHUTDOWN_TIMEOUT_SECS")? {
            self.shutdown_timeout_secs = secs;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.log_json = format.eq_ignore_ascii_case("json");
        }
        self.validate()
    }

    fn validate(self) -> Result<Self> {
        if self.request_timeout_secs == 0 {
            return Err(anyhow!(
                "request_timeout_secs must be greater than zero.\n\
                 Hint: set REQUEST_TIMEOUT_SECS or `request_timeout_secs` in the config file \
                 to a positive number of seconds."
            ));
        }
        Ok(self)
    }

    /// Returns the WeatherAPI key, if present.
    pub fn weather_api_key(&self) -> Option<&str> {
        self.weather_api_key.as_deref()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Read `KEY=value` pairs from a dotenv file. A missing file yields no variables.
pub fn read_dotenv(path: impl AsRef<Path>) -> Result<HashMap<String, String>> {
    let path = path.as_ref();
    match dotenvy::from_path_iter(path) {
        Ok(iter) => iter
            .map(|item| {
                item.with_context(|| format!("Failed to parse dotenv file: {}", path.display()))
            })
            .collect(),
        Err(err) if err.not_found() => Ok(HashMap::new()),
        Err(err) => {
            Err(err).with_context(|| format!("Failed to read dotenv file: {}", path.display()))
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow!("Invalid value for {key} ({raw:?}): {e}")),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let cfg = Config::from_lookup(env(&[])).expect("empty env must load");

        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(5));
        assert!(cfg.weather_api_key().is_none());
    }

    #[test]
    fn environment_overrides_defaults() {
        let cfg = Config::from_lookup(env(&[
            ("PORT", "9090"),
            ("WEATHER_API_KEY", "KEY"),
            ("VIACEP_BASE_URL", "http://localhost:1/ws"),
            ("REQUEST_TIMEOUT_SECS", "2"),
            ("LOG_FORMAT", "JSON"),
        ]))
        .expect("config must load");

        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.weather_api_key(), Some("KEY"));
        assert_eq!(cfg.locality_base_url, "http://localhost:1/ws");
        assert_eq!(cfg.weather_base_url, weatherapi::DEFAULT_BASE_URL);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(2));
        assert!(cfg.log_json);
    }

    #[test]
    fn empty_api_key_is_treated_as_missing() {
        let cfg = Config::from_lookup(env(&[("WEATHER_API_KEY", "")])).unwrap();
        assert!(cfg.weather_api_key().is_none());
    }

    #[test]
    fn invalid_port_is_reported() {
        let err = Config::from_lookup(env(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("Invalid value for PORT"));
    }

    #[test]
    fn file_is_loaded_then_overridden_by_environment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "port = 3000\nweather_api_key = \"FILE_KEY\"\nshutdown_timeout_secs = 10"
        )
        .unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let cfg = Config::from_lookup(env(&[
            (CONFIG_PATH_ENV, path.as_str()),
            ("PORT", "4000"),
        ]))
        .unwrap();

        assert_eq!(cfg.port, 4000);
        assert_eq!(cfg.weather_api_key(), Some("FILE_KEY"));
        assert_eq!(cfg.shutdown_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.locality_base_url, viacep::DEFAULT_BASE_URL);
    }

    #[test]
    fn zero_request_timeout_is_rejected() {
        let err = Config::from_lookup(env(&[("REQUEST_TIMEOUT_SECS", "0")])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("request_timeout_secs must be greater than zero"), "{msg}");
        assert!(msg.contains("Hint: set REQUEST_TIMEOUT_SECS"), "{msg}");
    }

    #[test]
    fn zero_request_timeout_from_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "request_timeout_secs = 0").unwrap();

        let err = Config::load(file.path())
            .and_then(|cfg| cfg.with_overrides(env(&[])))
            .unwrap_err();
        assert!(err.to_string().contains("must be greater than zero"));
    }

    #[test]
    fn dotenv_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "# local settings\nWEATHER_API_KEY=\"DOTENV_KEY\"\nPORT=7070\n").unwrap();

        let vars = read_dotenv(&path).unwrap();
        assert_eq!(vars.get("WEATHER_API_KEY").map(String::as_str), Some("DOTENV_KEY"));

        let cfg = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
        assert_eq!(cfg.port, 7070);
        assert_eq!(cfg.weather_api_key(), Some("DOTENV_KEY"));
    }

    #[test]
    fn missing_dotenv_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let vars = read_dotenv(dir.path().join(".env")).unwrap();
        assert!(vars.is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Config::load("/nonexistent/weather.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
