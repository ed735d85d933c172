use recon_store::StoreError;
use recon_types::{AvoirId, DeliveryId};

/// Errors from cascade and workflow operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CascadeError {
    #[error("delivery not found: {0}")]
    DeliveryNotFound(DeliveryId),

    #[error("avoir not found: {0}")]
    AvoirNotFound(AvoirId),

    /// The requested status would move an entity backwards.
    #[error("invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// The avoir has no reference or no store to verify against.
    #[error("avoir {0} has no reference to verify")]
    MissingReference(AvoirId),

    /// The ledger confirmed the avoir but no verification record backs it,
    /// so the verified flag was left untouched.
    #[error("avoir {0} matched the ledger but its verification record was not stored")]
    Unrecorded(AvoirId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CascadeError {
    pub fn invalid_transition(
        entity: &'static str,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        Self::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

pub type CascadeResult<T> = Result<T, CascadeError>;
