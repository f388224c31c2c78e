//! Domain error model.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Failure raised by a domain constructor or state transition.
///
/// Carries no storage or transport detail; the infra layer wraps it in its
/// own error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Rejected input, e.g. an empty beer name or a zero price.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An operation would leave an entity in an impossible state.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A stored integer code does not map to any variant of an enumeration.
    #[error("unknown {kind} code: {code}")]
    UnknownCode { kind: &'static str, code: i32 },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn unknown_code(kind: &'static str, code: i32) -> Self {
        Self::UnknownCode { kind, code }
    }
}
