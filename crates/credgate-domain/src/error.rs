//! Error types for domain bookkeeping

use thiserror::Error;

use crate::store::DomainId;

/// Domain store error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// No live domain has this handle
    #[error("Domain not found: {0}")]
    NotFound(DomainId),

    /// The root domain cannot be destroyed
    #[error("The root domain cannot be destroyed")]
    RootImmutable,

    /// The domain still has live children
    #[error("Domain {0} still has child domains")]
    HasChildren(DomainId),

    /// No more domain handles can be allocated
    #[error("Domain handle space exhausted")]
    Exhausted,
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
