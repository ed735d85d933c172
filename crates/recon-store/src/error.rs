/// Errors from repository operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A lock guarding the backend was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// The backend cannot serve the request right now.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The write committed but a post-write hook failed.
    #[error("hook '{hook}' failed after commit: {message}")]
    Hook { hook: String, message: String },
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn hook(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Hook {
            hook: hook.into(),
            message: message.into(),
        }
    }
}

/// Result alias for repository operations.
pub type StoreResult<T> = Result<T, StoreError>;
