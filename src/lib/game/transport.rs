use std::sync::Arc;

use crate::{
    game::DisplayState,
    player::{Member, MemberId},
};

/// Delivers display-state pushes to remote devices.
///
/// Calls are fire-and-forget from the round controller's point of view: an
/// implementation must not block on delivery and owns its own retry policy.
pub trait SessionTransport {
    fn update_member_state(&mut self, member: &Member, state: &DisplayState);

    fn update_member_states(&mut self, members: &[Arc<Member>], state: &DisplayState) {
        for member in members {
            self.update_member_state(member, state);
        }
    }
}

/// A transport that queues pushes until the network layer drains them.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: Vec<(MemberId, DisplayState)>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&mut self) -> Vec<(MemberId, DisplayState)> {
        std::mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl SessionTransport for Outbox {
    fn update_member_state(&mut self, member: &Member, state: &DisplayState) {
        self.pending.push((member.id.clone(), state.clone()));
    }
}
