mod conn;
pub mod connect;
pub mod error;
pub mod repo;
pub mod schema;
pub mod seed;

pub use conn::DbConn;
pub use connect::connect_env;
pub use error::{Error, Result};

/// Creation and modification timestamps are assigned by the data layer,
/// not by callers.
pub(crate) fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}
