use serde::{Deserialize, Serialize};

use crate::{
    game::{BuzzrEvent, DisplayState, PlayerRef, RoundSnapshot, ledger::BuzzRecord},
    player::Member,
};

/// Commands a moderator connection may send.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum ModeratorCommand {
    Arm,
    Disarm,
    Lock { player: PlayerRef },
    Unlock { player: PlayerRef },
    Kick { player: PlayerRef },
    ClearBuzz { record: BuzzRecord },
}

/// Any message a player's device sends. Only `event` is interpreted here;
/// the round controller decides what the event means.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct InboundMessage {
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Serialize, Clone, Debug)]
#[serde(tag = "type")]
pub enum ServerMsg {
    /// Sent once to a joining player so it can reconnect with the same id.
    Welcome { member: Member },
    State { state: DisplayState },
    Snapshot { round: RoundSnapshot },
    Event { event: BuzzrEvent },
}
