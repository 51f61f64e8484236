use crate::domain::chart::DisplayId;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Root error type for the entire application
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    Domain(DomainError),
    Application(ApplicationError),
    Infrastructure(InfrastructureError),
}

/// Domain layer specific errors
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    Validation(ValidationError),
}

/// Validation errors from domain value objects and services
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    InvalidSymbol(String),
    InvalidPrice(f64),
    InvalidProjectedRange(f64),
}

/// Application layer errors
#[derive(Debug, Clone, PartialEq)]
pub enum ApplicationError {
    Configuration(ConfigurationError),
    Coordination(CoordinationError),
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    InvalidParameter(String),
    Parse(String),
}

/// Display lifecycle errors raised by the coordinator and registry
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinationError {
    UnknownDisplay(DisplayId),
    DuplicateDisplay(DisplayId),
    UnknownSubscription(u64),
}

/// Infrastructure layer errors
#[derive(Debug, Clone, PartialEq)]
pub enum InfrastructureError {
    Network(NetworkError),
    Parse(String),
}

/// Network-related errors
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkError {
    WebSocketConnectionFailed(String),
    TransportClosed(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AppError::Domain(e) => write!(f, "Domain Error: {}", e),
            AppError::Application(e) => write!(f, "Application Error: {}", e),
            AppError::Infrastructure(e) => write!(f, "Infrastructure Error: {}", e),
        }
    }
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DomainError::Validation(e) => write!(f, "Validation: {}", e),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ValidationError::InvalidSymbol(msg) => write!(f, "Invalid symbol: {}", msg),
            ValidationError::InvalidPrice(price) => {
                write!(f, "Invalid price {}: must be finite and positive", price)
            }
            ValidationError::InvalidProjectedRange(range) => {
                write!(f, "Invalid projected range {}: must be finite and positive", range)
            }
        }
    }
}

impl Display for ApplicationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ApplicationError::Configuration(e) => write!(f, "Configuration: {}", e),
            ApplicationError::Coordination(e) => write!(f, "Coordination: {}", e),
        }
    }
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ConfigurationError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            ConfigurationError::Parse(msg) => write!(f, "Parse failure: {}", msg),
        }
    }
}

impl Display for CoordinationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            CoordinationError::UnknownDisplay(id) => write!(f, "Unknown display {}", id),
            CoordinationError::DuplicateDisplay(id) => write!(f, "Display {} is already open", id),
            CoordinationError::UnknownSubscription(id) => write!(f, "Unknown subscription #{}", id),
        }
    }
}

impl Display for InfrastructureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            InfrastructureError::Network(e) => write!(f, "Network: {}", e),
            InfrastructureError::Parse(msg) => write!(f, "Parse: {}", msg),
        }
    }
}

impl Display for NetworkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            NetworkError::WebSocketConnectionFailed(msg) => write!(f, "WebSocket connection failed: {}", msg),
            NetworkError::TransportClosed(msg) => write!(f, "Transport closed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for ValidationError {}
impl std::error::Error for ConfigurationError {}
impl std::error::Error for InfrastructureError {}

/// Error conversion utilities
impl From<DomainError> for AppError {
    fn from(error: DomainError) -> Self {
        AppError::Domain(error)
    }
}

impl From<ValidationError> for AppError {
    fn from(error: ValidationError) -> Self {
        AppError::Domain(DomainError::Validation(error))
    }
}

impl From<ApplicationError> for AppError {
    fn from(error: ApplicationError) -> Self {
        AppError::Application(error)
    }
}

impl From<ConfigurationError> for AppError {
    fn from(error: ConfigurationError) -> Self {
        AppError::Application(ApplicationError::Configuration(error))
    }
}

impl From<CoordinationError> for AppError {
    fn from(error: CoordinationError) -> Self {
        AppError::Application(ApplicationError::Coordination(error))
    }
}

impl From<InfrastructureError> for AppError {
    fn from(error: InfrastructureError) -> Self {
        AppError::Infrastructure(error)
    }
}

impl From<NetworkError> for InfrastructureError {
    fn from(error: NetworkError) -> Self {
        InfrastructureError::Network(error)
    }
}

pub type DomainResult<T> = Result<T, ValidationError>;
pub type AppResult<T> = Result<T, AppError>;
