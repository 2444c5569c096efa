#[cfg(not(tarpaulin_include))]
pub mod tests {
    use async_trait::async_trait;
    use std::{sync::Arc, time::Duration};
    use tokio::{net::TcpListener, sync::watch};

    use roster_app::{
        config::Config,
        lifecycle::{Endpoint, Setup, StoreConnection},
    };
    use roster_server::{App, AppBuilder, Phase};
    use roster_types::errors::ApplicationError;

    pub const STARTUP: Duration = Duration::from_secs(2);
    pub const SHUTDOWN: Duration = Duration::from_millis(200);

    /// Setup routine that sleeps before succeeding.
    pub struct SlowSetup(pub Duration);

    #[async_trait]
    impl Setup for SlowSetup {
        async fn setup(&self) -> Result<(), ApplicationError> {
            tokio::time::sleep(self.0).await;
            Ok(())
        }
    }

    pub fn app_with(
        store: Arc<dyn StoreConnection>,
        setups: Vec<Arc<dyn Setup>>,
        endpoint: impl Endpoint,
    ) -> App {
        App::new(STARTUP, SHUTDOWN, store, setups, Box::new(endpoint))
    }

    pub async fn wait_for_phase(phase: &mut watch::Receiver<Phase>, target: Phase) {
        tokio::time::timeout(Duration::from_secs(5), phase.wait_for(|p| *p >= target))
            .await
            .expect("phase not reached in time")
            .expect("phase channel closed");
    }

    /// Full application on the in-memory store, listening on a free local port.
    pub async fn memory_app() -> Result<App, ApplicationError> {
        let config = Config::from_lookup(|key| match key {
            "ROSTER_STORE_BACKEND" => Some("memory".to_string()),
            "ROSTER_SHUTDOWN_TIMEOUT_SECS" => Some("2".to_string()),
            _ => None,
        })?;
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| ApplicationError::Infrastructure(e.to_string()))?;

        AppBuilder::new()
            .config(config)
            .listener(listener)
            .build()
            .await
    }
}
