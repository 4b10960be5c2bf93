use std::{
    fmt,
    time::{Duration, SystemTime},
};

use tokio::sync::broadcast;

use crate::{
    game::{
        BuzzrEvent, DisplayState, PlayerRef, RoundSnapshot, display_state,
        ledger::{BuzzLedger, BuzzRecord},
        registry::PlayerRegistry,
        transport::SessionTransport,
    },
    net::connection::RoomCode,
    player::{Member, MemberId, Player},
};

pub const BUZZ_EVENT: &str = "buzz";
pub const MESSAGE_EVENT: &str = "message";
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Owns one round: who is playing, whether the buzzer is armed, and who buzzed.
///
/// Every method runs one trigger to completion: registry and ledger changes,
/// then notifications, then state pushes to the transport. Callers serialize
/// access (the server keeps each controller behind the room map mutex), so
/// the order in which triggers reach this type is the order buzzes are ranked.
pub struct RoundController<T: SessionTransport> {
    transport: T,
    players: PlayerRegistry,
    buzzes: BuzzLedger,
    armed: bool,
    arm_time: Option<SystemTime>,
    room_code: Option<RoomCode>,
    events: broadcast::Sender<BuzzrEvent>,
}

impl<T: SessionTransport> fmt::Debug for RoundController<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoundController")
            .field("room_code", &self.room_code)
            .field("armed", &self.armed)
            .field("arm_time", &self.arm_time)
            .field("players", &self.players)
            .field("buzzes", &self.buzzes)
            .field("subscribers", &self.events.receiver_count())
            .finish()
    }
}

impl<T: SessionTransport> RoundController<T> {
    pub fn new(transport: T) -> Self {
        Self::with_event_capacity(transport, DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_event_capacity(transport: T, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            transport,
            players: PlayerRegistry::new(),
            buzzes: BuzzLedger::new(),
            armed: false,
            arm_time: None,
            room_code: None,
            events,
        }
    }

    /// Subscribes to every notification published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<BuzzrEvent> {
        self.events.subscribe()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn publish(&self, event: BuzzrEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

// Room lifecycle, as reported by the session transport.
impl<T: SessionTransport> RoundController<T> {
    pub fn room_connected(&mut self, code: RoomCode) {
        tracing::info!(room_code = %code, "Room connected");
        self.room_code = Some(code.clone());
        self.publish(BuzzrEvent::RoomCreated { room_code: code });
    }

    pub fn room_disconnected(&mut self, code: &RoomCode) {
        tracing::info!(room_code = %code, "Room disconnected");
        self.room_code = None;
    }

    pub fn room_code(&self) -> Option<&RoomCode> {
        self.room_code.as_ref()
    }
}

// Moderator actions.
impl<T: SessionTransport> RoundController<T> {
    pub fn arm(&mut self) {
        self.arm_at(SystemTime::now());
    }

    /// Arms the buzzer with `now` as the zero point for every buzz until the
    /// next arm or disarm.
    pub fn arm_at(&mut self, now: SystemTime) {
        self.armed = true;
        self.arm_time = Some(now);
        self.clear_ledger();
        self.push_round_states();
        tracing::info!(players = self.players.len(), "Buzzers armed");
    }

    pub fn disarm(&mut self) {
        self.armed = false;
        self.arm_time = None;
        self.clear_ledger();
        self.push_round_states();
        tracing::info!(players = self.players.len(), "Buzzers disarmed");
    }

    /// Returns `false` when no such player exists.
    pub fn lock(&mut self, player: &PlayerRef) -> bool {
        self.set_locked(player, true)
    }

    /// Returns `false` when no such player exists.
    pub fn unlock(&mut self, player: &PlayerRef) -> bool {
        self.set_locked(player, false)
    }

    fn set_locked(&mut self, player: &PlayerRef, locked: bool) -> bool {
        let Some(entry) = self.resolve_mut(player) else {
            tracing::debug!(?player, locked, "Lock change for unknown player ignored");
            return false;
        };
        entry.locked = locked;
        let id = entry.id().clone();
        tracing::info!(player_id = %id, player_name = %entry.name(), locked, "Player lock changed");
        self.push_player_state(&id);
        true
    }

    pub fn kick(&mut self, player: &PlayerRef) -> Option<Player> {
        let Some(id) = self.resolve(player) else {
            tracing::debug!(?player, "Kick for unknown player ignored");
            return None;
        };
        self.remove_player(&id)
    }

    /// Removes a single buzz and pushes the player's re-derived state.
    ///
    /// Clearing a record that is no longer in the ledger is a no-op.
    pub fn clear_buzz(&mut self, record: &BuzzRecord) -> bool {
        if !self.buzzes.clear(record) {
            tracing::debug!(player_id = %record.player.id, "Clear for stale buzz ignored");
            return false;
        }
        tracing::info!(
            player_id = %record.player.id,
            elapsed = ?record.elapsed,
            "Buzz cleared"
        );
        self.publish(BuzzrEvent::BuzzCleared {
            record: record.clone(),
        });
        // A kicked player's record can outlive the player; nothing to push then.
        self.push_player_state(&record.player.id);
        true
    }

    fn clear_ledger(&mut self) {
        for record in self.buzzes.clear_all() {
            self.publish(BuzzrEvent::BuzzCleared { record });
        }
    }

    fn push_round_states(&mut self) {
        let (locked, unlocked) = self.players.partition_by_lock();
        let unlocked_state = if self.armed {
            DisplayState::Armed
        } else {
            DisplayState::Waiting
        };
        if !locked.is_empty() {
            self.transport
                .update_member_states(&locked, &DisplayState::Locked);
        }
        if !unlocked.is_empty() {
            self.transport.update_member_states(&unlocked, &unlocked_state);
        }
    }
}

// Inbound notifications from the session transport.
impl<T: SessionTransport> RoundController<T> {
    /// Adds a player for `member`, replacing any live player with the same id.
    pub fn member_joined(&mut self, member: Member) -> Player {
        let (player, replaced) = self.players.add(member);
        if replaced.is_some() {
            tracing::warn!(
                player_id = %player.id(),
                player_name = %player.name(),
                "Join for a live player id, replacing it"
            );
        } else {
            tracing::info!(player_id = %player.id(), player_name = %player.name(), "Player joined");
        }
        self.push_player_state(player.id());
        self.publish(BuzzrEvent::PlayerJoined {
            player: player.clone(),
        });
        player
    }

    pub fn member_kicked(&mut self, member: &Member) -> Option<Player> {
        self.remove_player(&member.id)
    }

    /// Records a (re)connection or disconnection. Reconnecting devices get
    /// their current state pushed again.
    pub fn member_connection_changed(&mut self, id: &MemberId, connected: bool) -> bool {
        let Some(player) = self.players.get_mut(id) else {
            return false;
        };
        player.connected = connected;
        tracing::debug!(player_id = %id, connected, "Player connection changed");
        if connected {
            self.push_player_state(id);
        }
        true
    }

    /// Handles a message from a player's device. Returns the new buzz, if the
    /// message produced one.
    pub fn on_message(
        &mut self,
        member: &Member,
        event: &str,
        timestamp: SystemTime,
        payload: &serde_json::Value,
    ) -> Option<BuzzRecord> {
        match event {
            BUZZ_EVENT => self.on_buzz(&member.id, timestamp),
            MESSAGE_EVENT => {
                self.on_text(&member.id, payload);
                None
            }
            _ => {
                tracing::trace!(player_id = %member.id, event, "Unhandled message event");
                None
            }
        }
    }

    fn on_buzz(&mut self, id: &MemberId, timestamp: SystemTime) -> Option<BuzzRecord> {
        let (true, Some(arm_time)) = (self.armed, self.arm_time) else {
            tracing::debug!(player_id = %id, "Buzz while disarmed ignored");
            return None;
        };
        let Some(player) = self.players.get(id) else {
            tracing::debug!(player_id = %id, "Buzz from unknown player ignored");
            return None;
        };
        if player.locked {
            tracing::debug!(player_id = %id, "Buzz from locked player ignored");
            return None;
        }
        if self.buzzes.find_for(&player.member).is_some() {
            tracing::debug!(player_id = %id, "Repeat buzz in the same window ignored");
            return None;
        }

        let elapsed = match timestamp.duration_since(arm_time) {
            Ok(elapsed) => elapsed,
            Err(e) => {
                tracing::warn!(
                    player_id = %id,
                    early_by = ?e.duration(),
                    "Buzz timestamped before arm time, clamping to zero"
                );
                Duration::ZERO
            }
        };

        let member = player.member.clone();
        let record = self.buzzes.record(member, elapsed);
        tracing::info!(
            player_id = %id,
            player_name = %record.player.name,
            elapsed = %record.formatted_elapsed(),
            position = self.buzzes.len(),
            "Player buzzed in"
        );
        self.publish(BuzzrEvent::Buzz {
            record: record.clone(),
        });
        self.push_player_state(id);
        Some(record)
    }

    fn on_text(&mut self, id: &MemberId, payload: &serde_json::Value) {
        let Some(text) = payload.get("text").and_then(|t| t.as_str()) else {
            tracing::debug!(player_id = %id, "Message without text ignored");
            return;
        };
        if let Some(player) = self.players.get_mut(id) {
            player.message = Some(text.to_string());
        }
    }
}

// Queries. Everything returned is a snapshot.
impl<T: SessionTransport> RoundController<T> {
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn players(&self) -> Vec<Player> {
        self.players.all()
    }

    pub fn has_players(&self) -> bool {
        !self.players.is_empty()
    }

    pub fn player(&self, player: &PlayerRef) -> Option<Player> {
        let id = self.resolve(player)?;
        self.players.get(&id).cloned()
    }

    pub fn has_buzzes(&self) -> bool {
        !self.buzzes.is_empty()
    }

    pub fn current_buzz(&self) -> Option<BuzzRecord> {
        self.buzzes.first().cloned()
    }

    pub fn buzzes(&self) -> Vec<BuzzRecord> {
        self.buzzes.all()
    }

    pub fn display_state_of(&self, id: &MemberId) -> Option<DisplayState> {
        let player = self.players.get(id)?;
        Some(display_state(
            player,
            self.armed,
            self.buzzes.find_for(&player.member),
        ))
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            room_code: self.room_code.clone(),
            armed: self.armed,
            players: self.players(),
            current_buzz: self.current_buzz(),
            buzzes: self.buzzes(),
        }
    }
}

impl<T: SessionTransport> RoundController<T> {
    fn resolve(&self, player: &PlayerRef) -> Option<MemberId> {
        match player {
            PlayerRef::Id(id) => self.players.get(id),
            PlayerRef::Name(name) => self.players.get_by_name(name),
        }
        .map(|p| p.id().clone())
    }

    fn resolve_mut(&mut self, player: &PlayerRef) -> Option<&mut Player> {
        match player {
            PlayerRef::Id(id) => self.players.get_mut(id),
            PlayerRef::Name(name) => self.players.get_by_name_mut(name),
        }
    }

    fn remove_player(&mut self, id: &MemberId) -> Option<Player> {
        let Some(player) = self.players.remove(id) else {
            tracing::debug!(player_id = %id, "Kick for unknown player ignored");
            return None;
        };
        tracing::info!(player_id = %id, player_name = %player.name(), "Player kicked");
        self.publish(BuzzrEvent::PlayerKicked {
            player: player.clone(),
        });
        self.transport
            .update_member_state(&player.member, &DisplayState::Kicked);
        Some(player)
    }

    fn push_player_state(&mut self, id: &MemberId) {
        if let Some(state) = self.display_state_of(id)
            && let Some(player) = self.players.get(id)
        {
            self.transport.update_member_state(&player.member, &state);
        }
    }
}
