use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;

use roster_types::errors::ApplicationError;

/// A one-off routine run during boot, after the store is reachable.
#[async_trait::async_trait]
pub trait Setup: Send + Sync {
    async fn setup(&self) -> Result<(), ApplicationError>;
}

/// The shared client behind every repository of a store.
#[async_trait::async_trait]
pub trait StoreConnection: Send + Sync {
    /// Verifies the store is reachable, establishing the connection if needed.
    async fn ping(&self) -> Result<(), ApplicationError>;

    /// Releases the client. Operations issued afterwards fail.
    async fn disconnect(&self) -> Result<(), ApplicationError>;
}

/// A long-running serving loop.
#[async_trait::async_trait]
pub trait Endpoint: Send + Sync + 'static {
    fn addr(&self) -> Option<SocketAddr>;

    /// Serves until `closed` is cancelled, then drains in-flight work.
    ///
    /// Returning `Ok` after `closed` fired is a normal stop. An `Err` at any
    /// point is a serving failure.
    async fn serve(self: Box<Self>, closed: CancellationToken) -> Result<(), ApplicationError>;
}
