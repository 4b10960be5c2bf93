use std::{sync::Arc, time::SystemTime};

use anyhow::anyhow;
use axum::{
    extract::{
        Path, Query, State, WebSocketUpgrade,
        ws::{Message, Utf8Bytes, WebSocket},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::FutureExt;
use serde::de::DeserializeOwned;
use tokio::{select, sync::broadcast::error::RecvError};
use tokio_mpmc::Receiver;
use uuid::Uuid;

use crate::{
    AppState,
    api::{
        handlers::{RoomParams, WsQuery},
        messages::{InboundMessage, ModeratorCommand, ServerMsg},
    },
    game::{BuzzrEvent, DisplayState, RoundSnapshot},
    net::ws::session::{Session, setup_session},
    player::Member,
};

pub async fn ws_upgrade_handler(
    State(state): State<Arc<AppState>>,
    ws_upgrade: WebSocketUpgrade,
    Path(rp @ RoomParams { .. }): Path<RoomParams>,
    Query(query): Query<WsQuery>,
) -> Response {
    {
        let room_map = state.room_map.lock().await;
        if !room_map.contains_key(&rp.code) {
            return (StatusCode::NOT_FOUND, "Room does not exist").into_response();
        }
    }
    ws_upgrade.on_upgrade(
        async move |ws| match ws_socket_handler(ws, rp, state, query).await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!(error = %e, "WebSocket handler failed");
            }
        },
    )
}

/// Main WebSocket connection handler
#[tracing::instrument(
    name = "ws_handler",
    skip(ws, state, query),
    fields(room_code = %code, player_id = tracing::field::Empty, is_host = tracing::field::Empty)
)]
pub async fn ws_socket_handler(
    ws: WebSocket,
    RoomParams { code }: RoomParams,
    state: Arc<AppState>,
    query: WsQuery,
) -> anyhow::Result<()> {
    let session = match setup_session(&state, &code, &query).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "Handshake rejected");
            return Ok(());
        }
    };

    match session {
        Session::Host { events, snapshot } => {
            tracing::Span::current().record("is_host", true);
            host_loop(ws, &state, &code, events, snapshot).await
        }
        Session::Player {
            member,
            conn_id,
            rx,
        } => {
            let span = tracing::Span::current();
            span.record("is_host", false);
            span.record("player_id", tracing::field::display(&member.id));
            let result = player_loop(ws, &state, &code, &member, rx).await;
            disconnect_player(&state, &code, &member, conn_id).await;
            result
        }
    }
}

async fn host_loop(
    mut ws: WebSocket,
    state: &Arc<AppState>,
    code: &str,
    mut events: tokio::sync::broadcast::Receiver<BuzzrEvent>,
    snapshot: RoundSnapshot,
) -> anyhow::Result<()> {
    send_json(&mut ws, &ServerMsg::Snapshot { round: snapshot }).await?;

    loop {
        select! {
            event = events.recv().fuse() => {
                match event {
                    Ok(event) => send_json(&mut ws, &ServerMsg::Event { event }).await?,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Moderator fell behind, resending snapshot");
                        let round = {
                            let room_map = state.room_map.lock().await;
                            let room = room_map.get(code).ok_or(anyhow!("Room lost"))?;
                            room.controller.snapshot()
                        };
                        send_json(&mut ws, &ServerMsg::Snapshot { round }).await?;
                    }
                    Err(RecvError::Closed) => break, // Room closed
                }
            },
            msg = ws.recv().fuse() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    _ => break,
                };
                let Some(cmd) = parse_message::<ModeratorCommand>(msg, code, &mut ws).await? else {
                    continue;
                };

                let mut room_map = state.room_map.lock().await;
                let room = room_map.get_mut(code).ok_or(anyhow!("Room lost"))?;
                room.handle_command(&cmd);
                room.touch();
                room.flush().await;
            }
        }
    }
    tracing::info!("Moderator disconnected");
    Ok(())
}

async fn player_loop(
    mut ws: WebSocket,
    state: &Arc<AppState>,
    code: &str,
    member: &Member,
    rx: Receiver<ServerMsg>,
) -> anyhow::Result<()> {
    loop {
        select! {
            res = rx.recv().fuse() => {
                match res {
                    Ok(Some(msg)) => {
                        let kicked = matches!(
                            &msg,
                            ServerMsg::State { state: DisplayState::Kicked }
                        );
                        send_json(&mut ws, &msg).await?;
                        if kicked {
                            let _ = ws.send(Message::Close(None)).await;
                            break;
                        }
                    }
                    _ => break, // Channel closed, exit loop
                }
            },
            msg = ws.recv().fuse() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    _ => break,
                };
                // Stamp on arrival, before waiting for the room lock.
                let received_at = SystemTime::now();
                let Some(inbound) = parse_message::<InboundMessage>(msg, code, &mut ws).await? else {
                    continue;
                };

                let mut room_map = state.room_map.lock().await;
                let room = room_map.get_mut(code).ok_or(anyhow!("Room lost"))?;
                room.controller
                    .on_message(member, &inbound.event, received_at, &inbound.payload);
                room.touch();
                room.flush().await;
            }
        }
    }
    tracing::info!("Player socket closed");
    Ok(())
}

async fn disconnect_player(state: &Arc<AppState>, code: &str, member: &Member, conn_id: Uuid) {
    let mut room_map = state.room_map.lock().await;
    if let Some(room) = room_map.get_mut(code)
        && room.detach(&member.id, conn_id)
    {
        room.controller.member_connection_changed(&member.id, false);
        room.flush().await;
    }
}

async fn send_json(ws: &mut WebSocket, msg: &ServerMsg) -> anyhow::Result<()> {
    let text = serde_json::to_string(msg)?;
    ws.send(Message::Text(Utf8Bytes::from(text))).await?;
    Ok(())
}

/// Parse a WebSocket message into a command of type `T`
async fn parse_message<T: DeserializeOwned>(
    msg: Message,
    code: &str,
    ws: &mut WebSocket,
) -> anyhow::Result<Option<T>> {
    match msg {
        Message::Text(text) => match serde_json::from_str::<T>(text.as_str()) {
            Ok(c) => Ok(Some(c)),
            Err(e) => {
                tracing::warn!(room_code = %code, error = %e, "Failed to parse message");
                Ok(None)
            }
        },
        Message::Ping(data) => {
            let _ = ws.send(Message::Pong(data)).await;
            Ok(None)
        }
        Message::Pong(_) | Message::Close(_) => Ok(None),
        Message::Binary(_) => {
            tracing::warn!(room_code = %code, "Unexpected binary message");
            Ok(None)
        }
    }
}
