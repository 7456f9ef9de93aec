use thiserror::Error;

pub type QfoldResult<T> = Result<T, QfoldError>;

#[derive(Debug, Error)]
pub enum QfoldError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Io(#[from] IoError),
}

/// Errors related to loading, parsing and resampling raw market data.
///
/// Every variant is fatal for dataset construction: a malformed row is never
/// skipped, since a silently shortened series desynchronizes the fold-length
/// arithmetic downstream.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Malformed timestamp in '{file}' at row {row}: '{value}'")]
    MalformedTimestamp {
        file: String,
        row: usize,
        value: String,
    },

    #[error("Nonexistent local time '{value}' in '{file}' (daylight saving gap)")]
    NonexistentLocalTime { file: String, value: String },

    #[error("Duplicate timestamp {ts} in '{file}'")]
    DuplicateTimestamp { file: String, ts: String },

    #[error("Input is finer than the resample interval: multiple bars collapse onto {ts}")]
    IntervalCollision { ts: String },

    #[error("Invalid resample period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid indicator name: '{0}'")]
    InvalidIndicator(String),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Failed timestamp conversion: {0}")]
    TimestampConversion(String),

    #[error("Empty data set: {0}")]
    Empty(String),

    #[error("Data frame error: {0}")]
    DataFrame(String),
}

impl From<polars::error::PolarsError> for DataError {
    fn from(e: polars::error::PolarsError) -> Self {
        DataError::DataFrame(e.to_string())
    }
}

impl From<polars::error::PolarsError> for QfoldError {
    fn from(e: polars::error::PolarsError) -> Self {
        QfoldError::Data(e.into())
    }
}

/// Errors related to the gym environment configuration and execution loop.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("Invalid environment state: {0}")]
    InvalidState(String),

    #[error("Invalid environment configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid action index: {0} (action space has 3 actions)")]
    InvalidAction(usize),

    #[error("Order ledger violation: {0}")]
    LedgerViolation(String),
}

/// Errors related to file-system access while collecting raw symbol files.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("IO operation failed")]
    Io(#[from] std::io::Error),

    #[error("File system error: {0}")]
    FileSystem(String),
}
