//! Bzzr
//!
//! A buzzer host for live quiz games, built with Axum and WebSockets.
//!
//! # Round Flow
//!
//! 1. **Room Creation**: The moderator creates a room via HTTP POST
//! 2. **Player Joining**: Players connect via WebSocket with the room code
//! 3. **Arming**: The moderator arms the buzzer; every unlocked player may buzz
//! 4. **Buzzing**: Buzzes are ranked in the order the server processes them,
//!    each timed from the moment of arming
//!
//! # Modules
//!
//! - [`api`] - HTTP routes and wire messages
//! - [`config`] - Server settings
//! - [`game`] - Round controller, player registry and buzz ledger
//! - [`net`] - Room codes, tokens and WebSocket sessions
//! - [`player`] - Player data structures

pub mod api;
pub mod config;
pub mod game;
pub mod net;
pub mod player;

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime},
};

use axum::{
    Router,
    routing::{any, delete, get, post},
};
use tokio::sync::Mutex;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
};

use crate::{
    api::routes::{close_room, create_room, round_snapshot},
    config::ServerConfig,
    game::{controller::DEFAULT_EVENT_CAPACITY, room::Room},
    net::ws::handler::ws_upgrade_handler,
};

pub struct AppState {
    pub room_map: Mutex<HashMap<String, Room>>,
    pub room_ttl: Duration,
    pub event_capacity: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(30 * 60))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            room_map: Mutex::new(HashMap::new()),
            room_ttl: ttl,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            room_map: Mutex::new(HashMap::new()),
            room_ttl: config.room_ttl,
            event_capacity: config.event_capacity,
        }
    }
}

pub fn build_app(state: Arc<AppState>) -> Router {
    let room_routes = Router::new()
        .route("/create", post(create_room))
        .route("/{code}", delete(close_room))
        .route("/{code}/round", get(round_snapshot))
        .route("/{code}/ws", any(ws_upgrade_handler))
        .with_state(state);

    let api_routes = Router::new().nest("/rooms", room_routes);

    Router::new()
        .route("/health", get(|| async { "Server is up" }))
        .nest("/api/v1", api_routes)
        .layer(CorsLayer::permissive())
        .fallback_service(
            ServeDir::new("public").not_found_service(ServeFile::new("public/index.html")),
        )
}

#[tracing::instrument(skip(state))]
pub async fn cleanup_inactive_rooms(state: &Arc<AppState>) {
    let mut room_map = state.room_map.lock().await;
    let threshold = SystemTime::now()
        .checked_sub(state.room_ttl)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let rooms_to_remove: Vec<String> = room_map
        .iter()
        .filter(|(_, room)| room.last_activity < threshold)
        .map(|(code, _)| code.clone())
        .collect();

    if rooms_to_remove.is_empty() {
        tracing::trace!("No inactive rooms to clean up");
    } else {
        for code in &rooms_to_remove {
            if let Some(mut room) = room_map.remove(code) {
                room.close();
            }
        }
        tracing::info!(count = rooms_to_remove.len(), "Cleaned up inactive rooms");
    }
}
