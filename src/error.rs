use std::fmt;

use thiserror::Error;

/// Errors raised by the perception core.
///
/// The variants follow how the caller is expected to react:
/// - `Configuration`: abort before processing any frame.
/// - `Io` and `Decode`: abort the current run.
/// - `Arithmetic`: skip the affected detection and keep the frame.
#[derive(Debug, Error)]
pub enum PerceptionError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("arithmetic error: {0}")]
    Arithmetic(String),
}

impl PerceptionError {
    pub fn config(msg: impl fmt::Display) -> Self {
        Self::Configuration(msg.to_string())
    }

    pub fn io(context: impl fmt::Display, source: std::io::Error) -> Self {
        Self::Io {
            context: context.to_string(),
            source,
        }
    }

    pub fn decode(msg: impl fmt::Display) -> Self {
        Self::Decode(msg.to_string())
    }

    pub fn arithmetic(msg: impl fmt::Display) -> Self {
        Self::Arithmetic(msg.to_string())
    }

    /// Returns true when the error only invalidates a single detection.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Arithmetic(_))
    }
}

pub type Result<T> = std::result::Result<T, PerceptionError>;
