//! Errors reported by the parser.
//!
//! The grammar itself never fails: malformed markup falls back to plain
//! text. The only way a parse can fail is by running into one of the
//! resource limits configured on the [`Parser`](crate::Parser).

use thiserror::Error;

/// A resource limit was hit while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Containers were nested deeper than the configured maximum.
    #[error("nesting depth exceeds the limit of {limit}")]
    DepthLimitExceeded {
        /// The configured maximum depth.
        limit: usize,
    },
    /// The input is longer than the configured maximum.
    #[error("input of {len} bytes exceeds the limit of {limit} bytes")]
    InputTooLarge {
        /// Length of the rejected input in bytes.
        len: usize,
        /// The configured maximum length in bytes.
        limit: usize,
    },
}

impl ParseError {
    /// Whether this error comes from a resource limit.
    pub fn is_resource_limit(&self) -> bool {
        matches!(
            self,
            ParseError::DepthLimitExceeded { .. } | ParseError::InputTooLarge { .. }
        )
    }
}

/// Result alias used throughout the parser.
pub type ParseResult<T> = Result<T, ParseError>;
