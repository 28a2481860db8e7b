//! Domain error model.

use thiserror::Error;

/// Failures raised by the domain types themselves.
///
/// Field validation has its own collector (`ValidationErrors`); storage and
/// HTTP errors live in their own crates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A path or payload id did not parse as a positive serial number.
    #[error("invalid {entity} id: {reason}")]
    InvalidId { entity: &'static str, reason: String },
}
