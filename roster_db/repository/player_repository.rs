use sqlx::{PgPool, Postgres, QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

use roster_app::{lifecycle::Setup, repository::PlayerRepository};
use roster_types::{
    Result,
    errors::{ApplicationError, DbError},
    player::{FilterRequest, Player, PlayerPage},
};

use crate::models as db_models;

const COLUMNS: &str = "id, version, email, name, updated_at, created_at";

/// Implements PlayerRepository on a single Postgres table.
///
/// The table name comes from configuration and is validated as a plain SQL
/// identifier before it gets here, so it is interpolated into the statements.
#[derive(Clone)]
pub struct PostgresPlayerRepository {
    pool: PgPool,
    table: Arc<str>,
}

impl PostgresPlayerRepository {
    pub fn new(pool: PgPool, table: impl Into<Arc<str>>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    fn push_filter(&self, builder: &mut QueryBuilder<'_, Postgres>, request: &FilterRequest) {
        let mut separator = " WHERE ";

        if let Some(name) = request.name() {
            builder.push(separator).push("name = ").push_bind(name.to_string());
            separator = " AND ";
        }

        if let Some(email) = request.email() {
            builder.push(separator).push("email = ").push_bind(email.to_string());
        }
    }
}

/// Maps unique violations to `Conflict`, everything else to an opaque store
/// error tagged with `op`.
fn classify<'a>(op: &'static str, email: &'a str) -> impl FnOnce(sqlx::Error) -> DbError + 'a {
    move |err| match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DbError::Conflict {
            email: email.to_string(),
        },
        _ => DbError::Store { op, source: err },
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait::async_trait]
impl PlayerRepository for PostgresPlayerRepository {
    async fn insert(&self, player: &Player) -> Result<Player, ApplicationError> {
        let sql = format!(
            "INSERT INTO {} ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)",
            self.table
        );

        sqlx::query(&sql)
            .bind(player.id)
            .bind(player.version)
            .bind(&player.email)
            .bind(&player.name)
            .bind(player.updated_at)
            .bind(player.created_at)
            .execute(&self.pool)
            .await
            .map_err(classify("insert player", &player.email))?;

        Ok(player.clone())
    }

    async fn replace(
        &self,
        expected: &Player,
        proposed: &Player,
    ) -> Result<Player, ApplicationError> {
        if expected.id != proposed.id {
            return Err(DbError::IdMismatch {
                expected: expected.id,
                proposed: proposed.id,
            }
            .into());
        }

        let sql = format!(
            r#"
            UPDATE {}
            SET version = $3, email = $4, name = $5, updated_at = $6, created_at = $7
            WHERE id = $1 AND version = $2
            "#,
            self.table
        );

        let result = sqlx::query(&sql)
            .bind(expected.id)
            .bind(expected.version)
            .bind(proposed.version)
            .bind(&proposed.email)
            .bind(&proposed.name)
            .bind(proposed.updated_at)
            .bind(proposed.created_at)
            .execute(&self.pool)
            .await
            .map_err(classify("replace player", &proposed.email))?;

        if result.rows_affected() == 0 {
            return Err(DbError::VersionMismatch(expected.id).into());
        }

        Ok(proposed.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Player, ApplicationError> {
        let sql = format!("SELECT {COLUMNS} FROM {} WHERE id = $1", self.table);

        let player = sqlx::query_as::<_, db_models::Player>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::store("find player"))?
            .ok_or(DbError::PlayerNotFound(id))?;

        Ok(player.into())
    }

    async fn delete(&self, id: Uuid) -> Result<(), ApplicationError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.table);

        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::store("delete player"))?;

        if result.rows_affected() == 0 {
            return Err(DbError::PlayerNotFound(id).into());
        }

        Ok(())
    }

    async fn all(&self) -> Result<Vec<Player>, ApplicationError> {
        let sql = format!("SELECT {COLUMNS} FROM {} ORDER BY id", self.table);

        let players = sqlx::query_as::<_, db_models::Player>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::store("find players"))?;

        Ok(players.into_iter().map(Into::into).collect())
    }

    async fn filter(
        &self,
        request: &FilterRequest,
        offset: u64,
        limit: u64,
    ) -> Result<PlayerPage, ApplicationError> {
        if request.is_empty() {
            return Err(DbError::EmptyFilter.into());
        }

        let mut count_builder =
            QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {}", self.table));
        self.push_filter(&mut count_builder, request);

        let (total,): (i64,) = count_builder
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::store("count players"))?;

        if total == 0 {
            return Ok(PlayerPage::empty());
        }

        let mut select_builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM {}", self.table));
        self.push_filter(&mut select_builder, request);

        // LIMIT NULL is the same as no limit at all.
        let limit = (limit > 0).then(|| to_i64(limit));
        select_builder
            .push(" ORDER BY id OFFSET ")
            .push_bind(to_i64(offset))
            .push(" LIMIT ")
            .push_bind(limit);

        let players = select_builder
            .build_query_as::<db_models::Player>()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::store("find players"))?;

        Ok(PlayerPage {
            total: u64::try_from(total).unwrap_or(0),
            players: players.into_iter().map(Into::into).collect(),
        })
    }
}

#[async_trait::async_trait]
impl Setup for PostgresPlayerRepository {
    /// Creates the table and the unique email index when missing.
    async fn setup(&self) -> Result<(), ApplicationError> {
        let create_table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id UUID PRIMARY KEY,
                version UUID NOT NULL,
                email TEXT NOT NULL,
                name TEXT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
            self.table
        );
        let create_index = format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {table}_email_idx ON {table} (email)",
            table = self.table
        );

        sqlx::query(&create_table)
            .execute(&self.pool)
            .await
            .map_err(DbError::store("create players table"))?;

        sqlx::query(&create_index)
            .execute(&self.pool)
            .await
            .map_err(DbError::store("create email index"))?;

        tracing::info!(table = %self.table, "player table and email index ready");
        Ok(())
    }
}
