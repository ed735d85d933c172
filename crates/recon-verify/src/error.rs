/// Errors raised while setting up verification.
///
/// A verification itself never fails with an error: failures are reported
/// inside the returned `VerificationResult` so callers can tell an
/// indeterminate verdict from a confirmed absence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// Configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}
