use std::{fmt, net::SocketAddr, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{Instant, timeout, timeout_at},
};
use tokio_util::sync::CancellationToken;

use roster_app::lifecycle::{Endpoint, Setup, StoreConnection};
use roster_types::errors::ApplicationError;

/// Where the application is in its life. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Booting,
    Running,
    ShuttingDown,
    Stopped,
}

#[derive(Debug, Error)]
pub enum PhaseError {
    #[error("boot: connect store: {0}")]
    Connect(#[source] ApplicationError),

    #[error("boot: setup[{index}]: {source}")]
    Setup {
        index: usize,
        #[source]
        source: ApplicationError,
    },

    #[error("boot: startup timed out after {0:?}")]
    StartupTimeout(Duration),

    #[error("run: {0}")]
    Run(#[source] ApplicationError),

    #[error("shutdown: server: {0}")]
    ShutdownServer(#[source] ApplicationError),

    #[error("shutdown: {what} timed out after {after:?}")]
    ShutdownTimeout { what: &'static str, after: Duration },

    #[error("shutdown: store disconnect: {0}")]
    Disconnect(#[source] ApplicationError),
}

impl PhaseError {
    /// The phase the error was raised in.
    pub fn phase(&self) -> Phase {
        match self {
            PhaseError::Connect(_) | PhaseError::Setup { .. } | PhaseError::StartupTimeout(_) => {
                Phase::Booting
            }
            PhaseError::Run(_) => Phase::Running,
            PhaseError::ShutdownServer(_)
            | PhaseError::ShutdownTimeout { .. }
            | PhaseError::Disconnect(_) => Phase::ShuttingDown,
        }
    }
}

/// Every error collected over one run, in the order they happened.
#[derive(Debug)]
pub struct LifecycleErrors(Vec<PhaseError>);

impl LifecycleErrors {
    pub fn errors(&self) -> &[PhaseError] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<PhaseError> {
        self.0
    }
}

impl fmt::Display for LifecycleErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for LifecycleErrors {}

/// A spawned serve task and the signal that closes it.
struct Serving {
    closed: CancellationToken,
    // Yields a failure that could not be delivered to the run phase.
    handle: JoinHandle<Option<ApplicationError>>,
}

impl Serving {
    async fn close(mut self, deadline: Instant, budget: Duration) -> Result<(), PhaseError> {
        self.closed.cancel();

        match timeout_at(deadline, &mut self.handle).await {
            Ok(Ok(None)) => Ok(()),
            Ok(Ok(Some(err))) => Err(PhaseError::ShutdownServer(err)),
            Ok(Err(join_err)) => Err(PhaseError::ShutdownServer(
                ApplicationError::Infrastructure(join_err.to_string()),
            )),
            Err(_) => {
                self.handle.abort();
                Err(PhaseError::ShutdownTimeout {
                    what: "server",
                    after: budget,
                })
            }
        }
    }
}

/// The composed application: boots the store, serves, then shuts down.
pub struct App {
    startup_timeout: Duration,
    shutdown_timeout: Duration,
    store: Arc<dyn StoreConnection>,
    setups: Vec<Arc<dyn Setup>>,
    endpoint: Option<Box<dyn Endpoint>>,
    phase: watch::Sender<Phase>,
}

impl App {
    pub fn new(
        startup_timeout: Duration,
        shutdown_timeout: Duration,
        store: Arc<dyn StoreConnection>,
        setups: Vec<Arc<dyn Setup>>,
        endpoint: Box<dyn Endpoint>,
    ) -> Self {
        let (phase, _) = watch::channel(Phase::Booting);

        Self {
            startup_timeout,
            shutdown_timeout,
            store,
            setups,
            endpoint: Some(endpoint),
            phase,
        }
    }

    /// Address the endpoint is bound to, if it has one.
    pub fn addr(&self) -> Option<SocketAddr> {
        self.endpoint.as_ref().and_then(|e| e.addr())
    }

    pub fn phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Runs boot, serve and shutdown to completion.
    ///
    /// Cancelling `cancel` is the normal way to stop and is not reported as an
    /// error. Shutdown always runs, even after a failed boot, and every error
    /// from every phase is returned together.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), LifecycleErrors> {
        let cancel = cancel.child_token();
        let _cancel_on_exit = cancel.clone().drop_guard();

        let mut errors = Vec::with_capacity(3);
        let mut serving = None;

        let booted = tokio::select! {
            _ = cancel.cancelled() => None,
            res = timeout(self.startup_timeout, self.boot()) => Some(res),
        };

        match booted {
            None => tracing::info!("cancelled during boot"),
            Some(Err(_)) => errors.push(PhaseError::StartupTimeout(self.startup_timeout)),
            Some(Ok(Err(err))) => errors.push(err),
            Some(Ok(Ok(()))) => {
                if let Some(endpoint) = self.endpoint.take() {
                    let (handle, outcome) = self.serve(endpoint, &cancel).await;
                    serving = Some(handle);
                    if let Err(err) = outcome {
                        errors.push(err);
                    }
                }
            }
        }

        for err in &errors {
            tracing::error!(phase = ?err.phase(), error = %err, "application error");
        }

        errors.extend(self.shutdown(serving).await);
        self.advance(Phase::Stopped);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(LifecycleErrors(errors))
        }
    }

    async fn boot(&self) -> Result<(), PhaseError> {
        self.advance(Phase::Booting);

        self.store.ping().await.map_err(PhaseError::Connect)?;
        tracing::debug!("store reachable");

        for (index, setup) in self.setups.iter().enumerate() {
            setup
                .setup()
                .await
                .map_err(|source| PhaseError::Setup { index, source })?;
            tracing::debug!(index, "setup done");
        }

        Ok(())
    }

    async fn serve(
        &self,
        endpoint: Box<dyn Endpoint>,
        cancel: &CancellationToken,
    ) -> (Serving, Result<(), PhaseError>) {
        self.advance(Phase::Running);

        let closed = CancellationToken::new();
        // A single slot: a failure reported after the run phase stopped
        // listening stays with the task instead of blocking it.
        let (failures, mut failure) = mpsc::channel::<ApplicationError>(1);

        let handle = tokio::spawn({
            let closed = closed.clone();
            async move {
                match endpoint.serve(closed).await {
                    Ok(()) => None,
                    Err(err) => failures.try_send(err).err().map(|e| e.into_inner()),
                }
            }
        });

        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("cancellation received");
                Ok(())
            }
            Some(err) = failure.recv() => Err(PhaseError::Run(err)),
        };

        (Serving { closed, handle }, outcome)
    }

    async fn shutdown(&self, serving: Option<Serving>) -> Vec<PhaseError> {
        self.advance(Phase::ShuttingDown);

        // Fresh deadline: the run context may already be cancelled.
        let budget = self.shutdown_timeout;
        let deadline = Instant::now() + budget;

        let close_server = async {
            match serving {
                Some(serving) => serving.close(deadline, budget).await,
                None => Ok(()),
            }
        };

        let disconnect = async {
            match timeout_at(deadline, self.store.disconnect()).await {
                Ok(res) => res.map_err(PhaseError::Disconnect),
                Err(_) => Err(PhaseError::ShutdownTimeout {
                    what: "store disconnect",
                    after: budget,
                }),
            }
        };

        let (server, store) = tokio::join!(close_server, disconnect);
        let errors: Vec<PhaseError> = [server.err(), store.err()].into_iter().flatten().collect();

        for err in &errors {
            tracing::error!(error = %err, "shutdown error");
        }
        errors
    }

    fn advance(&self, next: Phase) {
        let moved = self.phase.send_if_modified(|current| {
            if next > *current {
                *current = next;
                true
            } else {
                false
            }
        });

        if moved {
            tracing::info!(phase = ?next, "lifecycle phase");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_display_one_per_line() {
        let errors = LifecycleErrors(vec![
            PhaseError::Run(ApplicationError::Infrastructure("boom".to_string())),
            PhaseError::ShutdownTimeout {
                what: "server",
                after: Duration::from_secs(1),
            },
        ]);

        assert_eq!(
            errors.to_string(),
            "run: Infrastructure error: boom\nshutdown: server timed out after 1s"
        );
    }

    #[test]
    fn phases_are_ordered() {
        assert!(Phase::Booting < Phase::Running);
        assert!(Phase::Running < Phase::ShuttingDown);
        assert!(Phase::ShuttingDown < Phase::Stopped);
    }
}
