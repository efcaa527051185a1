use crate::models::Role;

/// Errors returned by the lexflow components.
///
/// Every variant renders a message specific enough to show to the user
/// directly (unknown user, wrong password and duplicate username all read
/// differently).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexflowError {
    #[error("{entity} `{key}` not found")]
    NotFound { entity: &'static str, key: String },
    #[error("username `{username}` is already taken")]
    AlreadyExists { username: String },
    #[error("incorrect password for `{username}`")]
    WrongPassword { username: String },
    #[error("{field}: {message}")]
    ValidationFailed { field: &'static str, message: String },
    #[error("storage slot `{slot}` unavailable: {reason}")]
    StorageUnavailable { slot: String, reason: String },
    #[error("role `{role}` may not {action}")]
    Forbidden { role: Role, action: &'static str },
    #[error("sign in to {action}")]
    NotAuthenticated { action: &'static str },
}

impl LexflowError {
    pub(crate) fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LexflowError>;
