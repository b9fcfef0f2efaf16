use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Failed to retrieve document from {address}: {message}")]
    RetrievalError { address: String, message: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Exchange rate table has no rate for currency '{currency}'")]
    MissingRateError { currency: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Query failed ({statement}): {message}")]
    QueryError { statement: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Retrieval,
    Parse,
    MissingRate,
    Storage,
    Query,
    Io,
    Config,
}

impl EtlError {
    pub fn parse(message: impl Into<String>) -> Self {
        EtlError::ParseError {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        EtlError::StorageError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::RetrievalError { .. } => ErrorCategory::Retrieval,
            EtlError::ParseError { .. } => ErrorCategory::Parse,
            EtlError::MissingRateError { .. } => ErrorCategory::MissingRate,
            EtlError::StorageError { .. } => ErrorCategory::Storage,
            EtlError::QueryError { .. } => ErrorCategory::Query,
            EtlError::IoError(_) => ErrorCategory::Io,
            EtlError::ConfigError { .. } | EtlError::InvalidConfigValueError { .. } => {
                ErrorCategory::Config
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Retrieval => "Check that the source address is reachable",
            ErrorCategory::Parse => {
                "Check that the document still contains the ranked table and the rate file is well formed"
            }
            ErrorCategory::MissingRate => "Add the currency to the exchange rate file",
            ErrorCategory::Storage => "Check that the output paths are writable",
            ErrorCategory::Query => "Check the configured SQL statements",
            ErrorCategory::Io => "Check file permissions and paths",
            ErrorCategory::Config => "Fix the configuration file and try again",
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
