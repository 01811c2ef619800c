//! Error handling for the Equihash genesis miner
//!
//! One error type covers codec failures, solver process failures and the
//! ambient configuration/network errors. Running out of solver rounds is not
//! an error; see [`crate::search::SearchOutcome::Exhausted`].

use thiserror::Error;

/// Result type alias for genesis mining operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the genesis miner
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid hexadecimal input
    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Fewer bytes available than a fixed layout requires
    #[error("Truncated input: {context} needs {needed} more bytes")]
    TruncatedInput { context: String, needed: usize },

    /// A byte string of the wrong length
    #[error("Length mismatch for {context}: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// A value that does not fit its bit field
    #[error("Value {value} does not fit in {bits} bits")]
    ValueOutOfRange { value: u64, bits: u32 },

    /// Compact difficulty encoding that does not yield a usable target
    #[error("Invalid target: {message}")]
    InvalidTarget { message: String },

    /// Unsupported Equihash parameter set
    #[error("Invalid Equihash parameters: {message}")]
    InvalidParameters { message: String },

    /// Hash does not satisfy the target
    #[error("Hash {hash} is above target {target}")]
    HashAboveTarget { hash: String, target: String },

    /// Solver executable could not be located
    #[error("Could not find solver binary '{binary}'; is the path correct?")]
    BinaryNotFound { binary: String },

    /// Solver process could not be launched
    #[error("Failed to execute '{command}': {message}")]
    SpawnFailed { command: String, message: String },

    /// Solver printed something its protocol does not allow
    #[error("Unexpected solver output: {message}")]
    ProtocolViolation { message: String },

    /// Rolling nonce counter ran past 2^256 - 1
    #[error("Nonce overflow")]
    NonceOverflow,

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Block explorer lookups
    #[error("Block explorer error: {message}")]
    Explorer { message: String },

    /// Cancellation errors for async operations
    #[error("Operation was cancelled: {operation}")]
    Cancelled { operation: String },
}

impl Error {
    /// Create a truncated input error
    pub fn truncated(context: impl Into<String>, needed: usize) -> Self {
        Self::TruncatedInput {
            context: context.into(),
            needed,
        }
    }

    /// Create a length mismatch error
    pub fn length_mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::LengthMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Create an invalid target error
    pub fn invalid_target(message: impl Into<String>) -> Self {
        Self::InvalidTarget {
            message: message.into(),
        }
    }

    /// Create an invalid parameters error
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    /// Create a protocol violation error
    pub fn protocol_violation(message: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a block explorer error
    pub fn explorer(message: impl Into<String>) -> Self {
        Self::Explorer {
            message: message.into(),
        }
    }

    /// Create a cancellation error
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Yaml(_) => "yaml",
            Error::Http(_) => "http",
            Error::Hex(_) => "hex",
            Error::TruncatedInput { .. } => "truncated_input",
            Error::LengthMismatch { .. } => "length_mismatch",
            Error::ValueOutOfRange { .. } => "value_out_of_range",
            Error::InvalidTarget { .. } => "invalid_target",
            Error::InvalidParameters { .. } => "invalid_parameters",
            Error::HashAboveTarget { .. } => "hash_above_target",
            Error::BinaryNotFound { .. } => "binary_not_found",
            Error::SpawnFailed { .. } => "spawn_failed",
            Error::ProtocolViolation { .. } => "protocol_violation",
            Error::NonceOverflow => "nonce_overflow",
            Error::Config { .. } => "config",
            Error::Explorer { .. } => "explorer",
            Error::Cancelled { .. } => "cancelled",
        }
    }
}
