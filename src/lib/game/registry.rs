use std::sync::Arc;

use crate::player::{Member, MemberId, Player};

/// Every player currently joined to a round, in join order.
///
/// Each method is a single atomic step. Invariants that span several steps
/// (e.g. "only armed players may buzz") are the round controller's business.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: Vec<Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fresh player for `member`.
    ///
    /// A member whose id is already present replaces the existing player in
    /// place (same position, default attributes); the replaced player is
    /// returned alongside the new one.
    pub fn add(&mut self, member: Member) -> (Player, Option<Player>) {
        let player = Player::new(member);
        let replaced = match self.position(player.id()) {
            Some(idx) => Some(std::mem::replace(&mut self.players[idx], player.clone())),
            None => {
                self.players.push(player.clone());
                None
            }
        };
        (player, replaced)
    }

    pub fn remove(&mut self, id: &MemberId) -> Option<Player> {
        let idx = self.position(id)?;
        Some(self.players.remove(idx))
    }

    pub fn get(&self, id: &MemberId) -> Option<&Player> {
        self.players.iter().find(|p| p.id() == id)
    }

    pub fn get_mut(&mut self, id: &MemberId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id() == id)
    }

    /// Case-insensitive lookup by display name. The first match in join order wins.
    pub fn get_by_name(&self, name: &str) -> Option<&Player> {
        let name = name.to_lowercase();
        self.players.iter().find(|p| p.name().to_lowercase() == name)
    }

    pub fn get_by_name_mut(&mut self, name: &str) -> Option<&mut Player> {
        let name = name.to_lowercase();
        self.players
            .iter_mut()
            .find(|p| p.name().to_lowercase() == name)
    }

    /// Snapshot of every player.
    pub fn all(&self) -> Vec<Player> {
        self.players.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Members split into (locked, unlocked), each in join order.
    pub fn partition_by_lock(&self) -> (Vec<Arc<Member>>, Vec<Arc<Member>>) {
        let (locked, unlocked): (Vec<&Player>, Vec<&Player>) =
            self.players.iter().partition(|p| p.locked);
        (
            locked.into_iter().map(|p| p.member.clone()).collect(),
            unlocked.into_iter().map(|p| p.member.clone()).collect(),
        )
    }

    fn position(&self, id: &MemberId) -> Option<usize> {
        self.players.iter().position(|p| p.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(names: &[(&str, &str)]) -> PlayerRegistry {
        let mut registry = PlayerRegistry::new();
        for (id, name) in names {
            registry.add(Member::new(*id, *name));
        }
        registry
    }

    #[test]
    fn test_add_and_lookup() {
        let registry = registry_with(&[("p1", "AJ"), ("p2", "Sam")]);

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get(&MemberId::from("p2")).map(|p| p.name()),
            Some("Sam")
        );
        assert!(registry.get(&MemberId::from("p3")).is_none());
    }

    #[test]
    fn test_duplicate_add_overwrites_in_place() {
        let mut registry = registry_with(&[("p1", "AJ"), ("p2", "Sam")]);
        if let Some(p) = registry.get_mut(&MemberId::from("p1")) {
            p.locked = true;
        }

        let (player, replaced) = registry.add(Member::new("p1", "AJ again"));

        assert_eq!(registry.len(), 2, "No duplicate entry");
        assert!(!player.locked, "Fresh player has default attributes");
        assert_eq!(replaced.map(|p| p.locked), Some(true));
        let names: Vec<String> = registry.iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, vec!["AJ again", "Sam"], "Position preserved");
    }

    #[test]
    fn test_remove() {
        let mut registry = registry_with(&[("p1", "AJ")]);

        let removed = registry.remove(&MemberId::from("p1"));
        assert_eq!(removed.map(|p| p.name().to_string()), Some("AJ".to_string()));
        assert!(registry.is_empty());

        assert!(
            registry.remove(&MemberId::from("p1")).is_none(),
            "Removing an absent player is a no-op"
        );
    }

    #[test]
    fn test_get_by_name() {
        struct TestCase {
            query: &'static str,
            expected: Option<&'static str>,
        }

        let registry = registry_with(&[("p1", "Alice"), ("p2", "Émile")]);

        let test_cases = vec![
            TestCase {
                query: "Alice",
                expected: Some("p1"),
            },
            TestCase {
                query: "alice",
                expected: Some("p1"),
            },
            TestCase {
                query: "ALICE",
                expected: Some("p1"),
            },
            TestCase {
                query: "émile",
                expected: Some("p2"),
            },
            TestCase {
                query: "Bob",
                expected: None,
            },
        ];

        for tc in test_cases {
            assert_eq!(
                registry.get_by_name(tc.query).map(|p| &**p.id()),
                tc.expected,
                "Lookup failed for {}",
                tc.query
            );
        }
    }

    #[test]
    fn test_all_is_a_snapshot() {
        let mut registry = registry_with(&[("p1", "AJ"), ("p2", "Sam")]);
        let snapshot = registry.all();

        registry.remove(&MemberId::from("p1"));
        if let Some(p) = registry.get_mut(&MemberId::from("p2")) {
            p.locked = true;
        }

        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().all(|p| !p.locked));
    }

    #[test]
    fn test_partition_by_lock() {
        let mut registry = registry_with(&[("p1", "A"), ("p2", "B"), ("p3", "C")]);
        if let Some(p) = registry.get_mut(&MemberId::from("p2")) {
            p.locked = true;
        }

        let (locked, unlocked) = registry.partition_by_lock();

        let ids = |members: &[Arc<Member>]| -> Vec<String> {
            members.iter().map(|m| m.id.to_string()).collect()
        };
        assert_eq!(ids(&locked), vec!["p2"]);
        assert_eq!(ids(&unlocked), vec!["p1", "p3"]);
    }
}
