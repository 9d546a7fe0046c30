use crate::browser::PageError;
use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::jobs::{CsvImportError, ProfileError, StoreError};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Import(CsvImportError),
    Profile(ProfileError),
    Store(StoreError),
    Page(PageError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Import(err) => write!(f, "import error: {}", err),
            AppError::Profile(err) => write!(f, "profile error: {}", err),
            AppError::Store(err) => write!(f, "store error: {}", err),
            AppError::Page(err) => write!(f, "page error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Import(err) => Some(err),
            AppError::Profile(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Page(err) => Some(err),
        }
    }
}

impl AppError {
    /// True when the caller supplied something invalid rather than the
    /// environment failing.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::Import(_)
                | AppError::Profile(ProfileError::NotFound { .. })
                | AppError::Store(StoreError::ReviewNotFound(_))
                | AppError::Store(StoreError::ReviewClosed { .. })
                | AppError::Store(StoreError::InvalidPriority(_))
        )
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<CsvImportError> for AppError {
    fn from(value: CsvImportError) -> Self {
        Self::Import(value)
    }
}

impl From<ProfileError> for AppError {
    fn from(value: ProfileError) -> Self {
        Self::Profile(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<PageError> for AppError {
    fn from(value: PageError) -> Self {
        Self::Page(value)
    }
}
