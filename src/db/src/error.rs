use uuid::Uuid;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the data layer.
///
/// `Storage` and `PoolTimeout` are the only retryable categories; the rest
/// report caller mistakes or broken invariants. The layer itself never
/// retries.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A write was rejected before any persistence attempt.
    #[error("validation failed: {field} = {value:?}: {reason}")]
    Validation {
        field: &'static str,
        value: String,
        reason: &'static str,
    },
    /// The row targeted by a load, update or delete does not exist.
    #[error("{table}: no row with id {id}")]
    NotFound { table: &'static str, id: Uuid },
    /// An insert referenced a parent row that does not exist.
    #[error("{table}: referenced parent {id} does not exist")]
    MissingParent { table: &'static str, id: Uuid },
    /// A multi-step delete failed partway; every step already executed was
    /// rolled back before this error was returned.
    #[error("cascade delete of {root} {id} rolled back")]
    Cascade {
        root: &'static str,
        id: Uuid,
        #[source]
        source: Box<Error>,
    },
    #[error("storage error")]
    Storage {
        #[from]
        #[source]
        source: tokio_postgres::Error,
    },
    #[error("timed out waiting for a database connection")]
    PoolTimeout,
}

impl Error {
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Storage { .. } | Error::PoolTimeout => true,
            _ => false,
        }
    }

    pub(crate) fn validation(
        field: &'static str,
        value: impl ToString,
        reason: &'static str,
    ) -> Error {
        Error::Validation {
            field,
            value: value.to_string(),
            reason,
        }
    }
}

impl From<bb8::RunError<tokio_postgres::Error>> for Error {
    fn from(err: bb8::RunError<tokio_postgres::Error>) -> Error {
        match err {
            bb8::RunError::User(source) => Error::Storage { source },
            bb8::RunError::TimedOut => Error::PoolTimeout,
        }
    }
}
