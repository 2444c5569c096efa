use thiserror::Error;
use uuid::Uuid;

use super::ErrorKind;

/// Errors raised by the storage engines.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Player with ID {0} not found")]
    PlayerNotFound(Uuid),

    #[error("Player with email '{email}' already exists")]
    Conflict { email: String },

    #[error("ID mismatch: expected {expected}, got {proposed}")]
    IdMismatch { expected: Uuid, proposed: Uuid },

    #[error("Version mismatch for player with ID {0}")]
    VersionMismatch(Uuid),

    #[error("Filter request is empty")]
    EmptyFilter,

    #[error("Store connection is closed")]
    Disconnected,

    #[error("{op}: {source}")]
    Store {
        op: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl DbError {
    pub fn store(op: &'static str) -> impl FnOnce(sqlx::Error) -> DbError {
        move |source| DbError::Store { op, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::PlayerNotFound(_) => ErrorKind::NotFound,
            DbError::Conflict { .. } => ErrorKind::Conflict,
            DbError::IdMismatch { .. } => ErrorKind::IdMismatch,
            DbError::VersionMismatch(_) => ErrorKind::VersionMismatch,
            DbError::EmptyFilter => ErrorKind::EmptyRequest,
            DbError::Disconnected | DbError::Store { .. } => ErrorKind::Store,
        }
    }
}
