use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use roster_types::player::{FilterRequest, Player};

use crate::{error::WebError, http::AppState};

type WebResult<T> = Result<Json<T>, WebError>;

// Body for create and update.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerRequest {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterQuery {
    pub name: Option<String>,
    pub email: Option<String>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct PlayerResponse {
    pub player: Player,
}

#[derive(Debug, Serialize)]
pub struct PlayersResponse {
    pub players: Vec<Player>,
}

#[derive(Debug, Serialize)]
pub struct FilterResponse {
    pub total: u64,
    pub players: Vec<Player>,
}

/// POST /players – Create a player.
pub async fn create_player(
    State(state): State<AppState>,
    payload: Result<Json<PlayerRequest>, JsonRejection>,
) -> WebResult<PlayerResponse> {
    let Json(req) = payload?;
    let player = state.players.create(req.email, req.name).await?;

    Ok(Json(PlayerResponse { player }))
}

/// GET /players – List every player.
pub async fn list_players(State(state): State<AppState>) -> WebResult<PlayersResponse> {
    let players = state.players.list().await?;

    Ok(Json(PlayersResponse { players }))
}

/// GET /players/filter – One page of players matching name and/or email.
pub async fn filter_players(
    State(state): State<AppState>,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> WebResult<FilterResponse> {
    let Query(query) = query?;
    let request = FilterRequest {
        name: query.name,
        email: query.email,
    };

    let page = state
        .players
        .filter_page(request, query.offset.unwrap_or(0), query.limit.unwrap_or(0))
        .await?;

    Ok(Json(FilterResponse {
        total: page.total,
        players: page.players,
    }))
}

/// GET /players/{id} – Read one player.
pub async fn read_player(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> WebResult<PlayerResponse> {
    let Path(id) = id?;
    let player = state.players.read(id).await?;

    Ok(Json(PlayerResponse { player }))
}

/// PATCH|PUT /players/{id} – Overwrite email and name.
pub async fn update_player(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<PlayerRequest>, JsonRejection>,
) -> WebResult<PlayerResponse> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let player = state.players.update(id, req.email, req.name).await?;

    Ok(Json(PlayerResponse { player }))
}

/// DELETE /players/{id} – Remove a player.
pub async fn delete_player(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> WebResult<Value> {
    let Path(id) = id?;
    state.players.delete(id).await?;

    Ok(Json(json!({})))
}
