use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::broadcast;
use tokio_mpmc::Receiver;
use uuid::Uuid;

use crate::{
    AppState,
    api::{handlers::WsQuery, messages::ServerMsg},
    game::{BuzzrEvent, PlayerRef, RoundSnapshot, room::Room},
    net::connection::{HostToken, PlayerConnection},
    player::{Member, MemberId},
};

const PLAYER_QUEUE_CAPACITY: usize = 32;

pub enum AuthenticatedUser {
    Host,
    ReturningPlayer { member: Member },
    NewPlayer { name: String },
}

/// What a WebSocket handler needs once the handshake succeeded.
pub enum Session {
    Host {
        events: broadcast::Receiver<BuzzrEvent>,
        snapshot: RoundSnapshot,
    },
    Player {
        member: Member,
        conn_id: Uuid,
        rx: Receiver<ServerMsg>,
    },
}

/// Decides who is connecting from the upgrade query.
pub fn perform_handshake(room: &Room, query: &WsQuery) -> anyhow::Result<AuthenticatedUser> {
    if let Some(token) = &query.host_token {
        let token: HostToken = token.parse().map_err(|_| anyhow!("Malformed host token"))?;
        if token != room.host_token {
            return Err(anyhow!("Invalid host token"));
        }
        return Ok(AuthenticatedUser::Host);
    }

    if let Some(id) = &query.player_id
        && let Some(player) = room
            .controller
            .player(&PlayerRef::Id(MemberId::from(id.as_str())))
    {
        return Ok(AuthenticatedUser::ReturningPlayer {
            member: (*player.member).clone(),
        });
    }

    let name = query
        .player_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or(anyhow!("Player name required"))?;
    Ok(AuthenticatedUser::NewPlayer {
        name: name.to_string(),
    })
}

/// Performs authentication and sets up the session for a WebSocket connection.
pub async fn setup_session(
    state: &Arc<AppState>,
    code: &str,
    query: &WsQuery,
) -> anyhow::Result<Session> {
    let mut room_map = state.room_map.lock().await;
    let room = room_map
        .get_mut(code)
        .ok_or(anyhow!("Room {} not found", code))?;

    let session = match perform_handshake(room, query)? {
        AuthenticatedUser::Host => register_host(room),
        AuthenticatedUser::ReturningPlayer { member } => reconnect_player(room, member).await?,
        AuthenticatedUser::NewPlayer { name } => {
            register_new_player(room, Member::new(MemberId::generate(), name)).await?
        }
    };
    room.touch();
    Ok(session)
}

fn register_host(room: &Room) -> Session {
    tracing::info!(room_code = %room.code, "Moderator connected");
    Session::Host {
        events: room.controller.subscribe(),
        snapshot: room.controller.snapshot(),
    }
}

async fn reconnect_player(room: &mut Room, member: Member) -> anyhow::Result<Session> {
    let (tx, rx) = tokio_mpmc::channel(PLAYER_QUEUE_CAPACITY);
    let conn = PlayerConnection::new(member.clone(), tx.clone());
    let conn_id = conn.conn_id;
    room.attach(conn);

    tx.send(ServerMsg::Welcome {
        member: member.clone(),
    })
    .await?;
    room.controller.member_connection_changed(&member.id, true);
    room.flush().await;

    tracing::info!(room_code = %room.code, player_id = %member.id, "Player reconnected");
    Ok(Session::Player {
        member,
        conn_id,
        rx,
    })
}

async fn register_new_player(room: &mut Room, member: Member) -> anyhow::Result<Session> {
    let (tx, rx) = tokio_mpmc::channel(PLAYER_QUEUE_CAPACITY);
    let conn = PlayerConnection::new(member.clone(), tx.clone());
    let conn_id = conn.conn_id;
    room.attach(conn);

    tx.send(ServerMsg::Welcome {
        member: member.clone(),
    })
    .await?;
    room.controller.member_joined(member.clone());
    room.flush().await;

    Ok(Session::Player {
        member,
        conn_id,
        rx,
    })
}
