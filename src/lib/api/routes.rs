use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use http::StatusCode;
use serde::Serialize;

use crate::{
    AppState,
    api::handlers::{HostQuery, RoomParams},
    game::{RoundSnapshot, room::Room},
    net::connection::{HostToken, RoomCode},
};

#[tracing::instrument(skip(state))]
pub async fn create_room(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<CreateRoomResponse>) {
    let mut room_map = state.room_map.lock().await;

    // Generate a unique room code
    let code = loop {
        let candidate = RoomCode::generate();
        if !room_map.contains_key(&candidate.to_string()) {
            break candidate;
        }
    };

    let host_token = HostToken::generate();
    let room = Room::new(code.clone(), host_token.clone(), state.event_capacity);
    room_map.insert(code.to_string(), room);

    tracing::info!(room_code = %code, "Room created");

    (
        StatusCode::CREATED,
        Json(CreateRoomResponse {
            room_code: code,
            host_token,
        }),
    )
}

/// Closes a room. Only the moderator may do this.
#[tracing::instrument(skip(state, query))]
pub async fn close_room(
    State(state): State<Arc<AppState>>,
    Path(RoomParams { code }): Path<RoomParams>,
    Query(query): Query<HostQuery>,
) -> StatusCode {
    let mut room_map = state.room_map.lock().await;
    let Some(room) = room_map.get(&code) else {
        return StatusCode::NOT_FOUND;
    };
    if query.host_token.parse::<HostToken>().ok().as_ref() != Some(&room.host_token) {
        tracing::warn!(room_code = %code, "Close rejected: bad host token");
        return StatusCode::FORBIDDEN;
    }

    if let Some(mut room) = room_map.remove(&code) {
        room.close();
    }
    StatusCode::NO_CONTENT
}

#[axum_macros::debug_handler]
pub async fn round_snapshot(
    State(state): State<Arc<AppState>>,
    Path(RoomParams { code }): Path<RoomParams>,
) -> Result<Json<RoundSnapshot>, StatusCode> {
    let room_map = state.room_map.lock().await;
    room_map
        .get(&code)
        .map(|room| Json(room.controller.snapshot()))
        .ok_or(StatusCode::NOT_FOUND)
}

#[derive(Serialize)]
pub struct CreateRoomResponse {
    room_code: RoomCode,
    host_token: HostToken,
}
