use std::sync::Arc;
use tokio::net::TcpListener;

use roster_app::{
    config::{Config, StoreBackend},
    lifecycle::{Setup, StoreConnection},
    repository::PlayerRepository,
    services::PlayerService,
};
use roster_db::{
    InMemoryPlayerRepository, PostgresConnection, PostgresPlayerRepository, connection_pool,
};
use roster_types::errors::{AppError, ApplicationError};
use roster_web::{AppState, HttpEndpoint, WebRouter};

use crate::app::App;

/// Wires configuration, store, service and HTTP endpoint into an [`App`].
#[derive(Default)]
pub struct AppBuilder {
    config: Option<Config>,
    listener: Option<TcpListener>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Serve on an already bound listener instead of binding `config.listen`.
    pub fn listener(mut self, listener: TcpListener) -> Self {
        self.listener = Some(listener);
        self
    }

    pub async fn build(self) -> Result<App, ApplicationError> {
        let config = match self.config {
            Some(config) => config,
            None => Config::from_env()?,
        };

        if config.startup_timeout.is_zero() || config.shutdown_timeout.is_zero() {
            return Err(AppError::validation("lifecycle timeouts must be positive").into());
        }

        let store: Arc<dyn StoreConnection>;
        let setup: Arc<dyn Setup>;
        let repo: Arc<dyn PlayerRepository>;

        match config.store_backend {
            StoreBackend::Postgres => {
                let pool = connection_pool(&config)?;
                let postgres = Arc::new(PostgresPlayerRepository::new(
                    pool.clone(),
                    config.player_table.as_str(),
                ));
                store = Arc::new(PostgresConnection::new(pool));
                setup = postgres.clone();
                repo = postgres;
            }
            StoreBackend::Memory => {
                let memory = Arc::new(InMemoryPlayerRepository::new());
                store = memory.clone();
                setup = memory.clone();
                repo = memory;
            }
        }
        tracing::debug!(backend = ?config.store_backend, "store configured");

        let players = PlayerService::new(config.service_name.as_str(), repo);
        let router = WebRouter::router(AppState::new(players), config.request_timeout);

        let endpoint = match self.listener {
            Some(listener) => HttpEndpoint::from_listener(listener, router),
            None => HttpEndpoint::bind(config.listen, router).await?,
        };

        Ok(App::new(
            config.startup_timeout,
            config.shutdown_timeout,
            store,
            vec![setup],
            Box::new(endpoint),
        ))
    }
}
