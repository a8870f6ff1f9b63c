use thiserror::Error;

#[derive(Error, Debug)]
pub enum HoloFuelError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatusError { status: u16, url: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value {value:?} for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Unable to enter orders for {security} in {currency}$; only {expected}$ trades supported")]
    CurrencyMismatchError {
        security: String,
        currency: String,
        expected: String,
    },

    #[error("Volume {requested} exceeds total {book} volume {available}")]
    InsufficientVolumeError {
        book: &'static str,
        requested: f64,
        available: f64,
    },

    #[error("The {book} book is empty")]
    EmptyBookError { book: &'static str },

    #[error("Scaling error: {message}")]
    ScalingError { message: String },

    #[error("Simulation error: {message}")]
    SimulationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Io,
    Market,
    Model,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl HoloFuelError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ApiError(_) | Self::HttpStatusError { .. } => ErrorCategory::Network,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::CsvError(_) | Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::Io,
            Self::CurrencyMismatchError { .. }
            | Self::InsufficientVolumeError { .. }
            | Self::EmptyBookError { .. } => ErrorCategory::Market,
            Self::ScalingError { .. } | Self::SimulationError { .. } => ErrorCategory::Model,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Market => ErrorSeverity::Low,
            ErrorCategory::Configuration | ErrorCategory::Model => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ApiError(_) => "Check that the ledger service is running and reachable",
            Self::HttpStatusError { .. } => "Check the endpoint path and the request payload",
            Self::CsvError(_) | Self::IoError(_) => {
                "Check that the output path exists and is writable"
            }
            Self::SerializationError(_) => "Check that the JSON payload is well formed",
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => "Review the simulation configuration file",
            Self::CurrencyMismatchError { .. } => {
                "Enter orders in the exchange's currency, or use a separate exchange"
            }
            Self::InsufficientVolumeError { .. } | Self::EmptyBookError { .. } => {
                "Request a smaller volume or refresh the order book"
            }
            Self::ScalingError { .. } => "Use an ordered, non-empty domain for scaling",
            Self::SimulationError { .. } => "Re-run with --verbose to inspect the simulation",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not talk to the Holo Fuel service: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Io => format!("Could not read or write data: {}", self),
            ErrorCategory::Market => format!("Market rejected the request: {}", self),
            ErrorCategory::Model => format!("Model failure: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, HoloFuelError>;
