use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::workflows::ats::DetectionWeights;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub paths: PathsConfig,
    pub batch: BatchConfig,
    pub detection: DetectionWeights,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let paths = PathsConfig {
            profile: env::var("ATS_PROFILE").unwrap_or_else(|_| "default".to_string()),
            data_dir: PathBuf::from(env::var("ATS_DATA_DIR").unwrap_or_else(|_| "output".into())),
            profiles_dir: PathBuf::from(
                env::var("ATS_PROFILES_DIR").unwrap_or_else(|_| "profiles".into()),
            ),
        };

        let defaults = BatchConfig::default();
        let batch = BatchConfig {
            job_delay: Duration::from_secs(env_number(
                "ATS_APPLY_DELAY_SECS",
                defaults.job_delay.as_secs(),
            )?),
            max_retries: env_number("ATS_MAX_RETRIES", defaults.max_retries)?,
            retry_backoff: Duration::from_secs(env_number(
                "ATS_RETRY_BACKOFF_SECS",
                defaults.retry_backoff.as_secs(),
            )?),
            submit_timeout: Duration::from_secs(env_number(
                "ATS_SUBMIT_TIMEOUT_SECS",
                defaults.submit_timeout.as_secs(),
            )?),
            settle: Duration::from_millis(env_number(
                "ATS_SETTLE_MS",
                defaults.settle.as_millis() as u64,
            )?),
        };

        let weights = DetectionWeights::default();
        let detection = DetectionWeights {
            threshold: env_number("ATS_DETECT_THRESHOLD", weights.threshold)?,
            dom_selector: env_number("ATS_DOM_WEIGHT", weights.dom_selector)?,
            text_indicator: env_number("ATS_TEXT_WEIGHT", weights.text_indicator)?,
            form_selector: env_number("ATS_FORM_WEIGHT", weights.form_selector)?,
            ..weights
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            paths,
            batch,
            detection,
        })
    }
}

fn env_number<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidNumber {
                    key,
                    value: raw.clone(),
                })
        }
        _ => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Locations of candidate profiles and generated output.
#[derive(Debug, Clone)]
pub struct PathsConfig {
    pub profile: String,
    pub data_dir: PathBuf,
    pub profiles_dir: PathBuf,
}

impl PathsConfig {
    pub fn profile_dir(&self) -> PathBuf {
        self.profiles_dir.join(&self.profile)
    }

    /// Jobs, application log and review queue for the active profile.
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join(&self.profile)
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.data_dir.join("optimization_data")
    }
}

/// Pacing and retry budget for batch application runs.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    pub job_delay: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub submit_timeout: Duration,
    pub settle: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            job_delay: Duration::from_secs(30),
            max_retries: 2,
            retry_backoff: Duration::from_secs(5),
            submit_timeout: Duration::from_secs(300),
            settle: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be numeric (got '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
