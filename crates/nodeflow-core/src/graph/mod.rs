//! Graph operations on top of the `nodeflow_types::graph` model.
//!
//! - `document` -- JSON import/export and filesystem load/save
//! - `validate` -- structural checks and cycle detection
//! - `edit` -- edit messages applied through a single owner

pub mod document;
pub mod edit;
pub mod validate;

use thiserror::Error;

/// Errors that can occur during graph operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// JSON parse failure.
    #[error("parse error: {0}")]
    ParseError(String),

    /// A node's config does not match its declared type.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Filesystem I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("node not found: '{0}'")]
    NodeNotFound(String),

    #[error("duplicate node ID: '{0}'")]
    DuplicateNodeId(String),

    #[error("edge already exists: '{from}' -> '{to}'")]
    DuplicateEdge { from: String, to: String },

    #[error("edge not found: '{from}' -> '{to}'")]
    EdgeNotFound { from: String, to: String },

    /// The graph contains a cycle through the given node.
    #[error("cycle detected involving node '{0}'")]
    CycleDetected(String),
}
