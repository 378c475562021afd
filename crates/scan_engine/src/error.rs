//! Scan engine error types

use contracts::{ContractError, SensorId};
use measurement::MeasurementError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    /// Description rejected; the previous configuration stays active
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("sensor '{sensor_id}' has no valid configuration")]
    Unconfigured { sensor_id: SensorId },

    #[error("invalid tick duration {0}: must be finite and >= 0")]
    InvalidTickDuration(f64),

    /// Tick would request more rays than `MAX_RAYS_PER_TICK`
    #[error("tick requests {rays} rays, limit is {max}")]
    TickTooLarge { rays: u64, max: u64 },

    #[error(transparent)]
    Measurement(#[from] MeasurementError),
}

impl ScanError {
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }
}

impl From<ContractError> for ScanError {
    fn from(e: ContractError) -> Self {
        match e {
            ContractError::InvalidConfiguration { message } => {
                Self::InvalidConfiguration { message }
            }
            other => Self::invalid_configuration(other.to_string()),
        }
    }
}
