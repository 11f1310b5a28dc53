//! Error taxonomy shared by the auth resolver and the assessment engine.

use thiserror::Error;
use uuid::Uuid;

/// Why an authentication attempt was rejected.
///
/// Login failures always surface as [`UnauthorizedReason::BadCredentials`]
/// regardless of which identity collection matched, to avoid account
/// enumeration. The finer-grained reasons are only produced by token
/// validation, where the caller already holds a once-valid token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthorizedReason {
    BadCredentials,
    Inactive,
    Invalidated,
    MalformedToken,
}

impl UnauthorizedReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BadCredentials => "bad_credentials",
            Self::Inactive => "inactive",
            Self::Invalidated => "invalidated",
            Self::MalformedToken => "malformed_token",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    DuplicateEmail,
    ConcurrentModification,
}

impl ConflictReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateEmail => "duplicate_email",
            Self::ConcurrentModification => "concurrent_modification",
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("unauthorized: {}", reason.as_str())]
    Unauthorized { reason: UnauthorizedReason },

    #[error("invalid transition for {entity}: {from} -> {attempted}")]
    InvalidTransition {
        entity: &'static str,
        from: &'static str,
        attempted: &'static str,
    },

    #[error("item attempted out of assigned order")]
    OutOfOrder,

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("conflict: {}", reason.as_str())]
    Conflict { reason: ConflictReason },

    #[error("invalid {field}")]
    Validation { field: &'static str },

    #[error("backing store unavailable")]
    Unavailable(#[source] anyhow::Error),
}

impl Error {
    #[must_use]
    pub fn unauthorized(reason: UnauthorizedReason) -> Self {
        Self::Unauthorized { reason }
    }

    #[must_use]
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by [`crate::store::Store`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    Duplicate(&'static str),

    #[error("row version conflict")]
    VersionConflict,

    #[error(transparent)]
    Unavailable(#[from] anyhow::Error),
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(_) => Error::Conflict {
                reason: ConflictReason::DuplicateEmail,
            },
            StoreError::VersionConflict => Error::Conflict {
                reason: ConflictReason::ConcurrentModification,
            },
            StoreError::Unavailable(source) => Error::Unavailable(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConflictReason, Error, StoreError, UnauthorizedReason};

    #[test]
    fn unauthorized_reason_strings() {
        assert_eq!(UnauthorizedReason::BadCredentials.as_str(), "bad_credentials");
        assert_eq!(UnauthorizedReason::Inactive.as_str(), "inactive");
        assert_eq!(UnauthorizedReason::Invalidated.as_str(), "invalidated");
        assert_eq!(UnauthorizedReason::MalformedToken.as_str(), "malformed_token");
    }

    #[test]
    fn store_errors_map_to_conflicts() {
        let err: Error = StoreError::Duplicate("users.email").into();
        assert!(matches!(
            err,
            Error::Conflict {
                reason: ConflictReason::DuplicateEmail
            }
        ));

        let err: Error = StoreError::VersionConflict.into();
        assert!(matches!(
            err,
            Error::Conflict {
                reason: ConflictReason::ConcurrentModification
            }
        ));
    }

    #[test]
    fn store_unavailable_keeps_source() {
        let err: Error = StoreError::Unavailable(anyhow::anyhow!("connection refused")).into();
        assert!(matches!(err, Error::Unavailable(_)));
    }
}
