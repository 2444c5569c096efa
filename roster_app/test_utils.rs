#[cfg(not(tarpaulin_include))]
pub mod tests {
    use async_trait::async_trait;
    use std::{
        collections::HashMap,
        net::SocketAddr,
        sync::{
            Arc, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    use roster_types::{
        errors::{ApplicationError, DbError},
        player::{FilterRequest, Player, PlayerPage, new_id},
    };

    use crate::{
        lifecycle::{Endpoint, Setup, StoreConnection},
        repository::PlayerRepository,
    };

    #[derive(Default)]
    pub struct MockPlayerRepository {
        players: Mutex<HashMap<Uuid, Player>>,
        bump_on_replace: Mutex<Option<Uuid>>,
    }

    impl MockPlayerRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn snapshot(&self) -> Vec<Player> {
            let mut players: Vec<Player> =
                self.players.lock().unwrap().values().cloned().collect();
            players.sort_by_key(|p| p.id);
            players
        }

        /// Simulates a concurrent writer: the next replace of `id` finds a
        /// version it was not expecting.
        pub fn bump_version_on_next_replace(&self, id: Uuid) {
            *self.bump_on_replace.lock().unwrap() = Some(id);
        }
    }

    #[async_trait]
    impl PlayerRepository for MockPlayerRepository {
        async fn insert(&self, player: &Player) -> Result<Player, ApplicationError> {
            let mut players = self.players.lock().unwrap();
            if players
                .values()
                .any(|p| p.id == player.id || p.email == player.email)
            {
                return Err(DbError::Conflict {
                    email: player.email.clone(),
                }
                .into());
            }
            players.insert(player.id, player.clone());
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

            let mut players = self.players.lock().unwrap();
            if self.bump_on_replace.lock().unwrap().take() == Some(expected.id) {
                if let Some(stored) = players.get_mut(&expected.id) {
                    stored.version = new_id();
                }
            }

            match players.get_mut(&expected.id) {
                Some(stored) if stored.version == expected.version => {
                    *stored = proposed.clone();
                    Ok(proposed.clone())
                }
                _ => Err(DbError::VersionMismatch(expected.id).into()),
            }
        }

        async fn get_by_id(&self, id: Uuid) -> Result<Player, ApplicationError> {
            self.players
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or_else(|| DbError::PlayerNotFound(id).into())
        }

        async fn delete(&self, id: Uuid) -> Result<(), ApplicationError> {
            match self.players.lock().unwrap().remove(&id) {
                Some(_) => Ok(()),
                None => Err(DbError::PlayerNotFound(id).into()),
            }
        }

        async fn all(&self) -> Result<Vec<Player>, ApplicationError> {
            Ok(self.snapshot())
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

            let matching: Vec<Player> = self
                .snapshot()
                .into_iter()
                .filter(|p| request.matches(p))
                .collect();
            let total = matching.len() as u64;
            let take = if limit == 0 { usize::MAX } else { limit as usize };

            Ok(PlayerPage {
                total,
                players: matching
                    .into_iter()
                    .skip(offset as usize)
                    .take(take)
                    .collect(),
            })
        }
    }

    /// Every operation fails with an opaque store error.
    pub struct FailingPlayerRepository;

    #[async_trait]
    impl PlayerRepository for FailingPlayerRepository {
        async fn insert(&self, _player: &Player) -> Result<Player, ApplicationError> {
            Err(DbError::Disconnected.into())
        }

        async fn replace(
            &self,
            _expected: &Player,
            _proposed: &Player,
        ) -> Result<Player, ApplicationError> {
            Err(DbError::Disconnected.into())
        }

        async fn get_by_id(&self, _id: Uuid) -> Result<Player, ApplicationError> {
            Err(DbError::Disconnected.into())
        }

        async fn delete(&self, _id: Uuid) -> Result<(), ApplicationError> {
            Err(DbError::Disconnected.into())
        }

        async fn all(&self) -> Result<Vec<Player>, ApplicationError> {
            Err(DbError::Disconnected.into())
        }

        async fn filter(
            &self,
            _request: &FilterRequest,
            _offset: u64,
            _limit: u64,
        ) -> Result<PlayerPage, ApplicationError> {
            Err(DbError::Disconnected.into())
        }
    }

    /// Store client with scriptable failures and call counters.
    #[derive(Default)]
    pub struct MockStoreConnection {
        pub fail_ping: bool,
        pub fail_disconnect: bool,
        pub pings: AtomicUsize,
        pub disconnects: AtomicUsize,
    }

    impl MockStoreConnection {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn unreachable() -> Self {
            Self {
                fail_ping: true,
                ..Self::default()
            }
        }

        pub fn failing_disconnect() -> Self {
            Self {
                fail_disconnect: true,
                ..Self::default()
            }
        }

        pub fn disconnect_count(&self) -> usize {
            self.disconnects.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StoreConnection for MockStoreConnection {
        async fn ping(&self) -> Result<(), ApplicationError> {
            self.pings.fetch_add(1, Ordering::SeqCst);
            if self.fail_ping {
                return Err(ApplicationError::Infrastructure(
                    "store unreachable".to_string(),
                ));
            }
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), ApplicationError> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            if self.fail_disconnect {
                return Err(ApplicationError::Infrastructure(
                    "disconnect refused".to_string(),
                ));
            }
            Ok(())
        }
    }

    /// Setup routine that appends its name to a shared log when it runs.
    pub struct RecordingSetup {
        name: &'static str,
        fail: bool,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl RecordingSetup {
        pub fn new(name: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> Self {
            Self {
                name,
                fail: false,
                log,
            }
        }

        pub fn failing(name: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> Self {
            Self {
                name,
                fail: true,
                log,
            }
        }
    }

    #[async_trait]
    impl Setup for RecordingSetup {
        async fn setup(&self) -> Result<(), ApplicationError> {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                return Err(ApplicationError::Infrastructure(format!(
                    "{} failed",
                    self.name
                )));
            }
            Ok(())
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum EndpointBehavior {
        /// Serves until closed, then stops cleanly.
        Graceful,
        /// Fails right after starting.
        FailAfter(Duration),
        /// Fails only once the close signal fires.
        FailOnClose,
        /// Ignores the close signal and never finishes on its own.
        Stuck,
    }

    pub struct MockEndpoint {
        behavior: EndpointBehavior,
        served: Arc<AtomicUsize>,
    }

    impl MockEndpoint {
        pub fn new(behavior: EndpointBehavior) -> Self {
            Self {
                behavior,
                served: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// Counter of `serve` calls, readable after the endpoint is moved.
        pub fn served(&self) -> Arc<AtomicUsize> {
            self.served.clone()
        }
    }

    #[async_trait]
    impl Endpoint for MockEndpoint {
        fn addr(&self) -> Option<SocketAddr> {
            None
        }

        async fn serve(self: Box<Self>, closed: CancellationToken) -> Result<(), ApplicationError> {
            self.served.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                EndpointBehavior::Graceful => {
                    closed.cancelled().await;
                    Ok(())
                }
                EndpointBehavior::FailAfter(delay) => {
                    tokio::time::sleep(delay).await;
                    Err(ApplicationError::Infrastructure(
                        "listener failed".to_string(),
                    ))
                }
                EndpointBehavior::FailOnClose => {
                    closed.cancelled().await;
                    Err(ApplicationError::Infrastructure(
                        "drain failed".to_string(),
                    ))
                }
                EndpointBehavior::Stuck => {
                    std::future::pending::<()>().await;
                    Ok(())
                }
            }
        }
    }
}
