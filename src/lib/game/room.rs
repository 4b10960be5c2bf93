use std::{fmt, time::SystemTime};

use uuid::Uuid;

use crate::{
    api::messages::{ModeratorCommand, ServerMsg},
    game::{DisplayState, controller::RoundController, transport::Outbox},
    net::connection::{HostToken, PlayerConnection, RoomCode},
    player::MemberId,
};

/// A hosted buzzer room: one round controller plus the sockets attached to it.
pub struct Room {
    pub code: RoomCode,
    pub host_token: HostToken,
    pub controller: RoundController<Outbox>,
    pub connections: Vec<PlayerConnection>,
    pub last_activity: SystemTime,
}

impl fmt::Debug for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Room")
            .field("code", &self.code)
            .field("host_token", &self.host_token)
            .field("controller", &self.controller)
            .field("connection count", &self.connections.len())
            .finish()
    }
}

impl Room {
    pub fn new(code: RoomCode, host_token: HostToken, event_capacity: usize) -> Self {
        let mut controller = RoundController::with_event_capacity(Outbox::new(), event_capacity);
        controller.room_connected(code.clone());
        Self {
            code,
            host_token,
            controller,
            connections: Vec::new(),
            last_activity: SystemTime::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = SystemTime::now();
    }

    pub fn close(&mut self) {
        self.controller.room_disconnected(&self.code);
    }

    pub fn connection(&self, id: &MemberId) -> Option<&PlayerConnection> {
        self.connections.iter().find(|c| &c.member.id == id)
    }

    /// Attaches a socket for `conn.member`, replacing any older socket for the same id.
    pub fn attach(&mut self, conn: PlayerConnection) {
        self.connections.retain(|c| c.member.id != conn.member.id);
        self.connections.push(conn);
    }

    /// Detaches the socket `conn_id`. Returns `false` if it was already replaced.
    pub fn detach(&mut self, id: &MemberId, conn_id: Uuid) -> bool {
        let before = self.connections.len();
        self.connections
            .retain(|c| !(&c.member.id == id && c.conn_id == conn_id));
        self.connections.len() != before
    }

    pub fn handle_command(&mut self, cmd: &ModeratorCommand) {
        tracing::debug!(room_code = %self.code, ?cmd, "Moderator command");
        match cmd {
            ModeratorCommand::Arm => self.controller.arm(),
            ModeratorCommand::Disarm => self.controller.disarm(),
            ModeratorCommand::Lock { player } => {
                self.controller.lock(player);
            }
            ModeratorCommand::Unlock { player } => {
                self.controller.unlock(player);
            }
            ModeratorCommand::Kick { player } => {
                self.controller.kick(player);
            }
            ModeratorCommand::ClearBuzz { record } => {
                self.controller.clear_buzz(record);
            }
        }
    }

    /// Delivers every state push the controller queued since the last flush.
    ///
    /// Runs while the caller still holds the room map lock, so pushes from
    /// consecutive triggers reach each device in trigger order. Never waits on
    /// a device: a socket whose queue is full is dropped and marked
    /// disconnected, and its player gets the current state on reconnect.
    pub async fn flush(&mut self) {
        let pending = self.controller.transport_mut().drain();
        if pending.is_empty() {
            return;
        }
        tracing::debug!(room_code = %self.code, count = pending.len(), "Dispatching state pushes");

        for (id, state) in pending {
            let Some(conn) = self.connection(&id) else {
                tracing::trace!(room_code = %self.code, player_id = %id, "No socket for push");
                continue;
            };
            // This is the only sender while the lock is held, so a queue that
            // is not full accepts the push without waiting.
            if conn.sender.is_full() {
                tracing::warn!(
                    room_code = %self.code,
                    player_id = %id,
                    queued = conn.sender.len(),
                    "Socket queue full, dropping connection"
                );
                let conn_id = conn.conn_id;
                conn.sender.close();
                self.detach(&id, conn_id);
                self.controller.member_connection_changed(&id, false);
                continue;
            }
            let kicked = state == DisplayState::Kicked;
            if conn.sender.send(ServerMsg::State { state }).await.is_err() {
                tracing::debug!(room_code = %self.code, player_id = %id, "Push to closed socket dropped");
            }
            if kicked {
                let conn_id = conn.conn_id;
                self.detach(&id, conn_id);
            }
        }
    }
}
