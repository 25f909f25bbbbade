use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParkingError {
    #[error("Invalid vehicle: {reason}")]
    InvalidVehicle { reason: String },

    #[error("Vehicle {plate} is already parked in this lot")]
    AlreadyParked { plate: String },

    #[error("Parking lot lock was poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    State,
    Configuration,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ParkingError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidVehicle { .. } | Self::AlreadyParked { .. } => ErrorCategory::Input,
            Self::LockPoisoned => ErrorCategory::State,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::IoError(_) | Self::SerializationError(_) | Self::CsvError(_) => ErrorCategory::Io,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Low,
            ErrorCategory::Io => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::State => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::InvalidVehicle { .. } => "Provide a vehicle with a non-empty license plate",
            Self::AlreadyParked { .. } => "Release the existing ticket before admitting the vehicle again",
            Self::LockPoisoned => "Restart the process; a lot was left in an inconsistent state",
            Self::IoError(_) => "Check that the file exists and is readable",
            Self::SerializationError(_) | Self::CsvError(_) => "Try a different output format",
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => "Fix the configuration file and run again",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Input => format!("Request rejected: {}", self),
            ErrorCategory::State => format!("Internal state error: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Io => format!("Input/output problem: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ParkingError>;
