use std::time::Duration;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::Pool;

use crate::errors::AppError;

pub type PgPool = Pool<AsyncPgConnection>;

#[tracing::instrument(name = "database_pool_setup", skip(database_url))]
pub async fn establish_pool(database_url: &str, max_size: u32) -> Result<PgPool, AppError> {
    tracing::debug!("Initializing database connection pool");

    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let min_idle = max_size.min(4);

    let pool = Pool::builder()
        .max_size(max_size)
        .min_idle(Some(min_idle))
        .connection_timeout(Duration::from_secs(5))
        .idle_timeout(Some(Duration::from_secs(600)))
        .max_lifetime(Some(Duration::from_secs(3600)))
        .build(manager)
        .await
        .map_err(|err| AppError::Pool(err.to_string()))?;

    tracing::info!(
        max_size,
        min_idle,
        connection_timeout_secs = 5,
        "Database connection pool established"
    );

    Ok(pool)
}
