use crate::{
    error::Result,
    repo::{MemoryRepo, PgRepo},
    DbConn,
};
use futures::future::FutureExt;
use std::env;

pub struct ConnectOptions {
    /// Postgres connection string
    pg: Option<String>,
}

impl ConnectOptions {
    fn warn(&self) {
        if cfg!(not(test)) && self.pg.is_none() {
            log::warn!(
                "pg url not provided in DATABASE_URL; \
                 falling back to the process-local in-memory store"
            );
        }
    }
}

pub async fn connect(options: ConnectOptions) -> Result<DbConn> {
    let mem = MemoryRepo::new();
    let pg = match options.pg {
        Some(pg_conn_str) => {
            let conn = PgRepo::new(&pg_conn_str).await?;
            log::info!("connected to postgres");
            Some(conn)
        }
        None => None,
    };
    Ok(DbConn { mem, pg })
}

pub async fn connect_env() -> Result<DbConn> {
    let opts = ConnectOptions {
        pg: env::var("DATABASE_URL").ok(),
    };
    opts.warn();
    connect(opts).await
}

pub fn connect_memory() -> Result<DbConn> {
    let opts = ConnectOptions { pg: None };
    connect(opts).now_or_never().unwrap()
}
