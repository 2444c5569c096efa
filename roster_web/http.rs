use axum::{Router, http::StatusCode, routing::get};
use std::{io::Error, net::SocketAddr, time::Duration};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use roster_app::{lifecycle::Endpoint, services::PlayerService};
use roster_types::{Result, errors::ApplicationError};

use crate::handlers::{
    create_player, delete_player, filter_players, health, list_players, read_player,
    update_player,
};

#[derive(Clone)]
pub struct AppState {
    pub players: PlayerService,
}

impl AppState {
    pub fn new(players: PlayerService) -> AppState {
        AppState { players }
    }
}

pub struct WebRouter {}

impl WebRouter {
    pub fn router(state: AppState, request_timeout: Duration) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/players", get(list_players).post(create_player))
            .route("/players/filter", get(filter_players))
            .route(
                "/players/{id}",
                get(read_player)
                    .patch(update_player)
                    .put(update_player)
                    .delete(delete_player),
            )
            .with_state(state)
            .layer(request_timeout_layer(request_timeout))
            .layer(TraceLayer::new_for_http())
    }
}

/// Requests running past `timeout` are cut off with `408 Request Timeout`.
fn request_timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

/// The HTTP serving endpoint: a bound listener plus the router it serves.
pub struct HttpEndpoint {
    listener: TcpListener,
    router: Router,
}

impl HttpEndpoint {
    pub async fn bind(addr: SocketAddr, router: Router) -> Result<Self, ApplicationError> {
        let listener = TcpListener::bind(addr).await.map_err(infra_error)?;
        Ok(Self::from_listener(listener, router))
    }

    pub fn from_listener(listener: TcpListener, router: Router) -> Self {
        Self { listener, router }
    }
}

#[async_trait::async_trait]
impl Endpoint for HttpEndpoint {
    fn addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }

    async fn serve(self: Box<Self>, closed: CancellationToken) -> Result<(), ApplicationError> {
        if let Some(addr) = self.addr() {
            tracing::info!("HTTP Server started, listening on http://{addr}");
        }

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(closed.cancelled_owned())
            .await
            .map_err(infra_error)?;

        tracing::info!("HTTP Server stopped");
        Ok(())
    }
}

fn infra_error(e: Error) -> ApplicationError {
    let err = format!("{:#?}", e);
    ApplicationError::Infrastructure(err)
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn test_slow_request_times_out() {
        let app = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "done"
                }),
            )
            .layer(request_timeout_layer(Duration::from_millis(20)));

        let response = app
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }
}
