use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use recon_cascade::CascadeError;
use recon_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            other => Self::Store(other),
        }
    }
}

impl From<CascadeError> for ServerError {
    fn from(err: CascadeError) -> Self {
        match err {
            CascadeError::DeliveryNotFound(_) | CascadeError::AvoirNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            CascadeError::InvalidTransition { .. } | CascadeError::MissingReference(_) => {
                Self::Conflict(err.to_string())
            }
            CascadeError::Unrecorded(_) => Self::Internal(err.to_string()),
            CascadeError::Store(e) => e.into(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use recon_types::{AvoirId, DeliveryId};

    #[test]
    fn cascade_errors_map_to_status() {
        let missing: ServerError = CascadeError::DeliveryNotFound(DeliveryId::new()).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let backwards: ServerError =
            CascadeError::invalid_transition("avoir", "received", "requested").into();
        assert_eq!(backwards.status(), StatusCode::CONFLICT);

        let no_ref: ServerError = CascadeError::MissingReference(AvoirId::new()).into();
        assert_eq!(no_ref.status(), StatusCode::CONFLICT);

        let unrecorded: ServerError = CascadeError::Unrecorded(AvoirId::new()).into();
        assert_eq!(unrecorded.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let down: ServerError =
            CascadeError::Store(StoreError::Unavailable("orders".into())).into();
        assert_eq!(down.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
