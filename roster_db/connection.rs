use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::{env, str::FromStr};

use roster_app::{config::Config, lifecycle::StoreConnection};
use roster_types::errors::{ApplicationError, DbError};

pub type DbPool = PgPool;

/// Builds the shared pool without connecting. The first connection is
/// opened by `PostgresConnection::ping` during boot.
pub fn connection_pool(config: &Config) -> Result<DbPool, DbError> {
    let mut options = PgConnectOptions::from_str(&config.database_url)
        .map_err(DbError::store("parse database url"))?;

    if let Some(database) = &config.database_name {
        options = options.database(database);
    }

    Ok(PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.startup_timeout)
        .connect_lazy_with(options))
}

pub async fn establish_test_connection_pool() -> Result<DbPool, DbError> {
    dotenvy::dotenv().ok();

    let database_url =
        env::var("TEST_DATABASE_URL").unwrap_or_else(|_| panic!("TEST_DATABASE_URL must be set"));

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .map_err(DbError::store("connect"))
}

/// Lifecycle handle over the Postgres pool.
#[derive(Debug, Clone)]
pub struct PostgresConnection {
    pool: PgPool,
}

impl PostgresConnection {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl StoreConnection for PostgresConnection {
    async fn ping(&self) -> Result<(), ApplicationError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(DbError::store("ping"))?;

        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ApplicationError> {
        self.pool.close().await;
        tracing::debug!("postgres pool closed");
        Ok(())
    }
}
