//! Error types for engine operations

use thiserror::Error;

use credgate_domain::DomainError;
use credgate_rules::ParseError;

use crate::config::ConfigError;

/// Engine error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Rule text was rejected; nothing was installed
    #[error("Invalid rule specification {0}")]
    Parse(#[from] ParseError),

    /// Domain bookkeeping failed
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Check if the caller caused this error.
    ///
    /// Client errors leave all engine state untouched and can be fixed by
    /// retrying with different input.
    pub fn is_client_error(&self) -> bool {
        match self {
            EngineError::Parse(_) => true,
            EngineError::Domain(err) => !matches!(err, DomainError::Exhausted),
            EngineError::Config(_) => false,
        }
    }

    /// Get error code for administrative responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::Parse(_) => "PARSE_ERROR",
            EngineError::Domain(DomainError::NotFound(_)) => "DOMAIN_NOT_FOUND",
            EngineError::Domain(DomainError::RootImmutable) => "ROOT_IMMUTABLE",
            EngineError::Domain(DomainError::HasChildren(_)) => "DOMAIN_HAS_CHILDREN",
            EngineError::Domain(DomainError::Exhausted) => "DOMAINS_EXHAUSTED",
            EngineError::Config(_) => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credgate_domain::DomainId;

    #[test]
    fn test_parse_error_display_keeps_offset() {
        let err = EngineError::from(ParseError::new(9, "unknown id type"));
        assert_eq!(
            err.to_string(),
            "Invalid rule specification at offset 9: unknown id type"
        );
        assert_eq!(err.error_code(), "PARSE_ERROR");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_domain_error_codes() {
        let err = EngineError::from(DomainError::NotFound(DomainId::ROOT));
        assert_eq!(err.error_code(), "DOMAIN_NOT_FOUND");
        assert!(err.is_client_error());

        let err = EngineError::from(DomainError::Exhausted);
        assert_eq!(err.error_code(), "DOMAINS_EXHAUSTED");
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_config_error() {
        let err = EngineError::from(ConfigError::InvalidValue {
            key: "CREDGATE_MAX_RULE_LEN".to_string(),
            message: "must be positive".to_string(),
        });
        assert_eq!(err.error_code(), "CONFIG_ERROR");
        assert!(!err.is_client_error());
    }
}
