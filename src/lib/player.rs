use std::{
    fmt::{self, Display},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier the session transport assigns to a participant.
///
/// Opaque to the round logic: it is only ever compared for equality.
#[derive(PartialEq, Eq, Hash, Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    /// Generates a fresh random identifier (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl From<String> for MemberId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for MemberId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for MemberId {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A participant as seen by the session transport.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
}

impl Member {
    pub fn new(id: impl Into<MemberId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One joined participant and the attributes the round controller tracks for it.
///
/// Identity lives in the shared [`Member`]; two players are equal when their
/// ids are equal, whatever their mutable attributes.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Player {
    pub member: Arc<Member>,
    pub connected: bool,
    pub locked: bool,
    pub message: Option<String>,
}

impl Player {
    pub fn new(member: Member) -> Self {
        Self {
            member: Arc::new(member),
            connected: true,
            locked: false,
            message: None,
        }
    }

    pub fn id(&self) -> &MemberId {
        &self.member.id
    }

    pub fn name(&self) -> &str {
        &self.member.name
    }
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Player {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_equality_ignores_attributes() {
        let a = Player::new(Member::new("p1", "AJ"));
        let mut b = a.clone();
        b.locked = true;
        b.connected = false;
        b.message = Some("hello".to_string());

        assert_eq!(a, b);
        assert_ne!(a, Player::new(Member::new("p2", "AJ")));
    }

    #[test]
    fn test_new_player_defaults() {
        let player = Player::new(Member::new("p1", "Sam"));

        assert!(player.connected);
        assert!(!player.locked);
        assert_eq!(player.message, None);
        assert_eq!(player.name(), "Sam");
        assert_eq!(&**player.id(), "p1");
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        assert_ne!(MemberId::generate(), MemberId::generate());
    }
}
