use thiserror::Error;

/// Errors raised while building or mutating domain values.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("invalid config for '{node_type}' node: {message}")]
    InvalidConfig { node_type: String, message: String },

    #[error("execution record for node '{0}' is already terminal")]
    RecordAlreadyTerminal(String),
}
