use std::fmt;

/// Coarse classification of a ledger failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LedgerErrorKind {
    Network,
    Http,
    Parse,
}

impl fmt::Display for LedgerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Http => write!(f, "http"),
            Self::Parse => write!(f, "parse"),
        }
    }
}

/// A failed ledger lookup.
///
/// Every failure is one of three kinds; none of them says anything about
/// whether the reference exists, so a caller must treat the lookup as
/// indeterminate and may retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Connection refused, DNS failure, timeout, interrupted body.
    #[error("network error: {0}")]
    Network(String),

    /// The ledger answered with a non-success status.
    #[error("http error {status}: {message}")]
    Http { status: u16, message: String },

    /// The ledger answered 2xx but the body is not the expected shape.
    #[error("parse error: {0}")]
    Parse(String),
}

impl LedgerError {
    pub fn kind(&self) -> LedgerErrorKind {
        match self {
            Self::Network(_) => LedgerErrorKind::Network,
            Self::Http { .. } => LedgerErrorKind::Http,
            Self::Parse(_) => LedgerErrorKind::Parse,
        }
    }
}

/// Errors raised while building an HTTP ledger client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientConfigError {
    #[error("ledger base url must start with http:// or https://: {0}")]
    InvalidBaseUrl(String),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

/// Result alias for ledger lookups.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(LedgerError::Network("x".into()).kind(), LedgerErrorKind::Network);
        assert_eq!(
            LedgerError::Http { status: 502, message: "bad gateway".into() }.kind(),
            LedgerErrorKind::Http
        );
        assert_eq!(LedgerError::Parse("x".into()).kind(), LedgerErrorKind::Parse);
    }

    #[test]
    fn messages_are_descriptive() {
        let err = LedgerError::Http { status: 401, message: "invalid token".into() };
        assert_eq!(err.to_string(), "http error 401: invalid token");
        assert_eq!(LedgerErrorKind::Parse.to_string(), "parse");
    }
}
