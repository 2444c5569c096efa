use std::sync::Arc;
use uuid::Uuid;

use roster_types::{
    Result,
    errors::{AppError, ApplicationError},
    player::{FilterRequest, Player, PlayerPage},
};

use crate::repository::PlayerRepository;

/// Orchestrates player writes on top of a `PlayerRepository`.
///
/// Identity, version and timestamps are assigned here, never by the store.
/// Updates are read-then-conditionally-write: a concurrent writer between the
/// two steps makes the replace fail with `VersionMismatch`, which is returned
/// to the caller as is.
#[derive(Clone)]
pub struct PlayerService {
    service_name: Arc<str>,
    repo: Arc<dyn PlayerRepository>,
}

impl PlayerService {
    pub fn new(service_name: impl Into<Arc<str>>, repo: Arc<dyn PlayerRepository>) -> Self {
        Self {
            service_name: service_name.into(),
            repo,
        }
    }

    #[tracing::instrument(skip(self), fields(service = %self.service_name))]
    pub async fn create(&self, email: String, name: String) -> Result<Player> {
        validate(&email, &name)?;

        let player = Player::new(email, name);
        let player = self
            .repo
            .insert(&player)
            .await
            .map_err(|e| e.context("insert player"))?;

        tracing::debug!(player_id = %player.id, "player created");
        Ok(player)
    }

    #[tracing::instrument(skip(self), fields(service = %self.service_name))]
    pub async fn read(&self, id: Uuid) -> Result<Player> {
        self.repo
            .get_by_id(id)
            .await
            .map_err(|e| e.context("get player"))
    }

    #[tracing::instrument(skip(self), fields(service = %self.service_name))]
    pub async fn update(&self, id: Uuid, email: String, name: String) -> Result<Player> {
        validate(&email, &name)?;

        let current = self.read(id).await?;
        let revised = current.revised(email, name);

        let player = self
            .repo
            .replace(&current, &revised)
            .await
            .map_err(|e| e.context("replace player"))?;

        tracing::debug!(player_id = %player.id, version = %player.version, "player updated");
        Ok(player)
    }

    #[tracing::instrument(skip(self), fields(service = %self.service_name))]
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.repo
            .delete(id)
            .await
            .map_err(|e| e.context("delete player"))?;

        tracing::debug!(player_id = %id, "player deleted");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(service = %self.service_name))]
    pub async fn list(&self) -> Result<Vec<Player>> {
        self.repo
            .all()
            .await
            .map_err(|e| e.context("list players"))
    }

    #[tracing::instrument(skip(self), fields(service = %self.service_name))]
    pub async fn filter_page(
        &self,
        request: FilterRequest,
        offset: u64,
        limit: u64,
    ) -> Result<PlayerPage> {
        self.repo
            .filter(&request, offset, limit)
            .await
            .map_err(|e| e.context("filter players"))
    }
}

fn validate(email: &str, name: &str) -> Result<(), ApplicationError> {
    if email.trim().is_empty() {
        return Err(AppError::validation("email is required").into());
    }
    if name.trim().is_empty() {
        return Err(AppError::validation("name is required").into());
    }
    Ok(())
}
