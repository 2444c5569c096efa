use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use roster_app::{
    lifecycle::{Setup, StoreConnection},
    repository::PlayerRepository,
};
use roster_types::{
    errors::{ApplicationError, DbError},
    player::{FilterRequest, Player, PlayerPage},
};

#[derive(Default)]
struct Store {
    players: BTreeMap<Uuid, Player>,
    // Unique index on email.
    emails: HashMap<String, Uuid>,
    closed: bool,
}

impl Store {
    fn open(&self) -> Result<(), DbError> {
        if self.closed {
            return Err(DbError::Disconnected);
        }
        Ok(())
    }
}

/// Process-local storage engine.
///
/// Records are kept in id order, which for v7 ids is creation order. Every
/// write holds the lock for its whole check-and-swap, so conditional replace
/// is atomic. Clones share the same data.
#[derive(Clone, Default)]
pub struct InMemoryPlayerRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryPlayerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PlayerRepository for InMemoryPlayerRepository {
    async fn insert(&self, player: &Player) -> Result<Player, ApplicationError> {
        let mut store = self.store.write().await;
        store.open()?;

        if store.players.contains_key(&player.id) || store.emails.contains_key(&player.email) {
            return Err(DbError::Conflict {
                email: player.email.clone(),
            }
            .into());
        }

        store.emails.insert(player.email.clone(), player.id);
        store.players.insert(player.id, player.clone());

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

        let mut store = self.store.write().await;
        store.open()?;

        let current_email = match store.players.get(&expected.id) {
            Some(current) if current.version == expected.version => current.email.clone(),
            _ => return Err(DbError::VersionMismatch(expected.id).into()),
        };

        if let Some(owner) = store.emails.get(&proposed.email) {
            if *owner != proposed.id {
                return Err(DbError::Conflict {
                    email: proposed.email.clone(),
                }
                .into());
            }
        }

        store.emails.remove(&current_email);
        store.emails.insert(proposed.email.clone(), proposed.id);
        store.players.insert(proposed.id, proposed.clone());

        Ok(proposed.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Player, ApplicationError> {
        let store = self.store.read().await;
        store.open()?;

        store
            .players
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::PlayerNotFound(id).into())
    }

    async fn delete(&self, id: Uuid) -> Result<(), ApplicationError> {
        let mut store = self.store.write().await;
        store.open()?;

        let removed = store
            .players
            .remove(&id)
            .ok_or(DbError::PlayerNotFound(id))?;
        store.emails.remove(&removed.email);

        Ok(())
    }

    async fn all(&self) -> Result<Vec<Player>, ApplicationError> {
        let store = self.store.read().await;
        store.open()?;

        Ok(store.players.values().cloned().collect())
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

        let store = self.store.read().await;
        store.open()?;

        let total = store.players.values().filter(|p| request.matches(p)).count() as u64;
        if total == 0 {
            return Ok(PlayerPage::empty());
        }

        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = match limit {
            0 => usize::MAX,
            n => usize::try_from(n).unwrap_or(usize::MAX),
        };

        let players = store
            .players
            .values()
            .filter(|p| request.matches(p))
            .skip(skip)
            .take(take)
            .cloned()
            .collect();

        Ok(PlayerPage { total, players })
    }
}

#[async_trait::async_trait]
impl Setup for InMemoryPlayerRepository {
    async fn setup(&self) -> Result<(), ApplicationError> {
        tracing::debug!("in-memory player store keeps its email index implicitly");
        Ok(())
    }
}

#[async_trait::async_trait]
impl StoreConnection for InMemoryPlayerRepository {
    async fn ping(&self) -> Result<(), ApplicationError> {
        self.store.read().await.open()?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ApplicationError> {
        self.store.write().await.closed = true;
        Ok(())
    }
}
