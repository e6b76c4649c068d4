use thiserror::Error;

/// Service layer errors - combines all error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    RfcError(#[from] almanac_rfc::error::RfcError),

    #[error(transparent)]
    CoreError(#[from] almanac_core::error::CoreError),

    #[error(transparent)]
    ExpansionError(#[from] almanac_rfc::rfc::ical::expand::ExpansionError),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Tracing setup failed: {0}")]
    TracingError(String),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
