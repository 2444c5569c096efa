use std::fmt;
use thiserror::Error;

pub mod app_error;
pub mod db_error;

pub use app_error::AppError;
pub use db_error::DbError;

pub type Result<T, E = ApplicationError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("{op}: {source}")]
    Context {
        op: &'static str,
        #[source]
        source: Box<ApplicationError>,
    },

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),

    #[error("An unknown error occurred: {0}")]
    Unknown(String),
}

impl ApplicationError {
    /// Wraps the error with operation context, but only when it is opaque.
    /// Classified errors are returned as they are.
    pub fn context(self, op: &'static str) -> Self {
        match self.kind() {
            ErrorKind::Store | ErrorKind::Internal => ApplicationError::Context {
                op,
                source: Box::new(self),
            },
            _ => self,
        }
    }

    /// Machine-readable classification, looking through context wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApplicationError::App(AppError::Validation(_)) => ErrorKind::Validation,
            ApplicationError::Db(err) => err.kind(),
            ApplicationError::Context { source, .. } => source.kind(),
            ApplicationError::Infrastructure(_) | ApplicationError::Unknown(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<anyhow::Error> for ApplicationError {
    fn from(err: anyhow::Error) -> Self {
        ApplicationError::Unknown(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    IdMismatch,
    VersionMismatch,
    EmptyRequest,
    Validation,
    Store,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::IdMismatch => "id_mismatch",
            ErrorKind::VersionMismatch => "version_mismatch",
            ErrorKind::EmptyRequest => "empty_request",
            ErrorKind::Validation => "validation",
            ErrorKind::Store => "store",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn context_leaves_classified_errors_alone() {
        let id = Uuid::now_v7();
        let err = ApplicationError::from(DbError::PlayerNotFound(id)).context("delete player");

        assert!(matches!(err, ApplicationError::Db(DbError::PlayerNotFound(_))));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn context_wraps_opaque_errors() {
        let err = ApplicationError::from(DbError::Store {
            op: "count players",
            source: sqlx::Error::PoolClosed,
        })
        .context("filter players");

        assert_eq!(err.kind(), ErrorKind::Store);
        assert!(err.to_string().starts_with("filter players: count players"));
    }
}
