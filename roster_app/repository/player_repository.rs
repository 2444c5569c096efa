use uuid::Uuid;

use roster_types::errors::ApplicationError;
use roster_types::player::{FilterRequest, Player, PlayerPage};

/// Storage engine for players.
///
/// Implementations never retry. Store failures are classified into
/// `DbError` variants; anything they can't classify is returned as
/// `DbError::Store` with the failing operation attached.
#[async_trait::async_trait]
pub trait PlayerRepository: Send + Sync {
    /// Persists a new player. Fails with `Conflict` when the email is taken.
    async fn insert(&self, player: &Player) -> Result<Player, ApplicationError>;

    /// Swaps the stored record matching `expected.id` and `expected.version`
    /// with `proposed`, atomically.
    ///
    /// Fails with `IdMismatch` before touching the store when the ids differ,
    /// and with `VersionMismatch` when no record matched both predicates.
    async fn replace(&self, expected: &Player, proposed: &Player)
    -> Result<Player, ApplicationError>;

    /// Returns a player by id.
    async fn get_by_id(&self, id: Uuid) -> Result<Player, ApplicationError>;

    /// Removes a player. Fails with `PlayerNotFound` when nothing matched.
    async fn delete(&self, id: Uuid) -> Result<(), ApplicationError>;

    /// Every stored player, in id order.
    async fn all(&self) -> Result<Vec<Player>, ApplicationError>;

    /// A page of players matching `request`, plus the full match count.
    /// A `limit` of zero means no limit.
    async fn filter(
        &self,
        request: &FilterRequest,
        offset: u64,
        limit: u64,
    ) -> Result<PlayerPage, ApplicationError>;
}
