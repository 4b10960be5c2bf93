use serde::{Deserialize, Serialize};

use crate::{
    game::ledger::BuzzRecord,
    net::connection::RoomCode,
    player::{MemberId, Player},
};

pub mod controller;
pub mod ledger;
pub mod registry;
pub mod room;
pub mod transport;

/// What a player's device should currently show.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum DisplayState {
    Waiting,
    Locked,
    Armed,
    Buzzed { text: String },
    Kicked,
}

/// Derives the display state of a joined player.
///
/// An active buzz wins over everything, then the lock flag, then the round's
/// armed flag. `Kicked` is never derived here: it is pushed once, on removal.
pub fn display_state(player: &Player, armed: bool, buzz: Option<&BuzzRecord>) -> DisplayState {
    if let Some(record) = buzz {
        DisplayState::Buzzed {
            text: record.formatted_elapsed(),
        }
    } else if player.locked {
        DisplayState::Locked
    } else if armed {
        DisplayState::Armed
    } else {
        DisplayState::Waiting
    }
}

/// Identifies a player either by id or by (case-insensitive) display name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerRef {
    Id(MemberId),
    Name(String),
}

impl From<MemberId> for PlayerRef {
    fn from(value: MemberId) -> Self {
        Self::Id(value)
    }
}

impl From<&Player> for PlayerRef {
    fn from(value: &Player) -> Self {
        Self::Id(value.id().clone())
    }
}

/// Notifications published by the round controller after each committed change.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum BuzzrEvent {
    RoomCreated {
        #[serde(rename = "roomCode")]
        room_code: RoomCode,
    },
    PlayerJoined {
        player: Player,
    },
    PlayerKicked {
        player: Player,
    },
    Buzz {
        record: BuzzRecord,
    },
    BuzzCleared {
        record: BuzzRecord,
    },
}

/// Read-only view of a round, for moderator UIs.
#[derive(Serialize, Clone, Debug)]
pub struct RoundSnapshot {
    #[serde(rename = "roomCode")]
    pub room_code: Option<RoomCode>,
    pub armed: bool,
    pub players: Vec<Player>,
    #[serde(rename = "currentBuzz")]
    pub current_buzz: Option<BuzzRecord>,
    pub buzzes: Vec<BuzzRecord>,
}
