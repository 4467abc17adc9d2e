use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;

use crate::error::StoreError;

pub type DbPool = Pool<AsyncPgConnection>;

/// Create a Diesel async connection pool. Connections are opened lazily.
pub fn connect(database_url: &str, max_size: usize) -> Result<DbPool, StoreError> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool = Pool::builder(manager)
        .max_size(max_size)
        .build()
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

    tracing::info!(max_size, "database pool created");

    Ok(pool)
}
