use thiserror::Error;

/// Public error type for the simulator.
///
/// Tyre attitude violations are deliberately absent: they are recovered
/// locally by the solver (treated as zero available traction) and never
/// reach the caller.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid track data: {0}")]
    InvalidTrackData(String),
    #[error("Invalid vehicle config: {0}")]
    InvalidVehicleConfig(String),
    #[error("Data channel '{name}' not found. Available channels: {available:?}")]
    UnknownChannel { name: String, available: Vec<String> },
    #[error("Parameter '{name}' not found. Available parameters: {available:?}")]
    UnknownParameter { name: String, available: Vec<String> },
    #[error("Vehicle model '{name}' not found. Available models: {available:?}")]
    UnknownVehicleModel { name: String, available: Vec<String> },
    #[error("Parse error in {file}: {message}")]
    Parse { file: String, message: String },
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub fn invalid_track(message: impl Into<String>) -> Self {
        SimError::InvalidTrackData(message.into())
    }

    pub fn invalid_vehicle(message: impl Into<String>) -> Self {
        SimError::InvalidVehicleConfig(message.into())
    }

    pub fn parse(file: impl Into<String>, message: impl Into<String>) -> Self {
        SimError::Parse {
            file: file.into(),
            message: message.into(),
        }
    }
}
