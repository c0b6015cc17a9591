//! Error types for network construction.

use thiserror::Error;

/// Errors raised while validating a configuration or wiring the network graph.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// A per-stage hyperparameter list does not have one entry per conv stage.
    #[error("{field} must have exactly {expected} entries, got {actual}")]
    StageCount {
        /// Name of the offending configuration field
        field: &'static str,
        /// Number of convolutional stages
        expected: usize,
        /// Length actually supplied
        actual: usize,
    },

    /// A hyperparameter is outside its valid range.
    #[error("Invalid parameter: {message}")]
    InvalidParameter {
        /// Description of what's wrong with the parameter
        message: String,
    },

    /// The input shape cannot feed the network.
    #[error("Invalid input shape: {message}")]
    InvalidShape {
        /// Description of the shape problem
        message: String,
    },

    /// A node received inputs whose shapes it cannot consume.
    #[error("Shape mismatch at node '{node}': {message}")]
    ShapeMismatch {
        /// Name of the node being added
        node: String,
        /// Description of the mismatch
        message: String,
    },

    /// A node name is already taken in the graph.
    #[error("Duplicate node name: '{name}'")]
    DuplicateName {
        /// The name that was requested
        name: String,
    },

    /// A configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl NetworkError {
    /// Create an InvalidParameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Create an InvalidShape error.
    pub fn invalid_shape(message: impl Into<String>) -> Self {
        Self::InvalidShape {
            message: message.into(),
        }
    }

    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            node: node.into(),
            message: message.into(),
        }
    }
}

/// Result alias for network construction.
pub type Result<T> = std::result::Result<T, NetworkError>;
