use std::{
    fmt::{self, Display},
    str::FromStr,
};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio_mpmc::Sender;
use uuid::Uuid;

use crate::{api::messages::ServerMsg, player::Member};

/// A unique identifier for a buzzer room (e.g., "AFKRTW")
///
/// Room codes are generated using a restricted charset to ensure they are easy to read and type.
/// Characters such as I and O are omitted to reduce mistaken characters.
#[derive(PartialEq, Eq, Hash, Clone, Debug, Serialize, Deserialize)]
pub struct RoomCode(String);

impl RoomCode {
    /// Generates a random 6-character code.
    ///
    /// The charset is "ABCDEFGHJKLMNPQRSTUVWXYZ".
    pub fn generate() -> Self {
        const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
        let mut rng = rand::rng();
        let code: String = (0..6)
            .map(|_| {
                let idx = rng.random_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect();
        Self(code)
    }
}

impl From<String> for RoomCode {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl FromStr for RoomCode {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for RoomCode {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A UUID handed to the room creator; presenting it makes a connection the moderator.
#[derive(PartialEq, Eq, Hash, Clone, Debug, Serialize, Deserialize)]
pub struct HostToken(Uuid);

impl HostToken {
    /// Generates a new random UUID v4.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for HostToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HostToken {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The live WebSocket of one player.
///
/// `conn_id` tells a reconnected socket apart from the one it replaced, so a
/// stale socket closing late does not tear down its successor.
pub struct PlayerConnection {
    pub member: Member,
    pub conn_id: Uuid,
    pub sender: Sender<ServerMsg>,
}

impl fmt::Debug for PlayerConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerConnection")
            .field("member", &self.member)
            .field("conn_id", &self.conn_id)
            .field("sender len", &self.sender.len())
            .finish()
    }
}

impl PlayerConnection {
    pub fn new(member: Member, sender: Sender<ServerMsg>) -> Self {
        Self {
            member,
            conn_id: Uuid::new_v4(),
            sender,
        }
    }
}
