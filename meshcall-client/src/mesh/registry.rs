use crate::mesh::{PeerHandle, PeerSummary};
use crate::negotiation::Role;
use crate::transport::PeerKey;
use meshcall_core::{IceCandidate, ParticipantId};
use std::collections::{HashMap, HashSet, VecDeque};

/// Early candidates kept per unknown participant.
const EARLY_CANDIDATE_LIMIT: usize = 64;

/// Handles keyed by remote participant. Owned by the mesh task only.
#[derive(Default)]
pub struct PeerRegistry {
    peers: HashMap<ParticipantId, PeerHandle>,
    departed: HashSet<ParticipantId>,
    /// Candidates from participants without a handle yet, in arrival order.
    early_candidates: HashMap<ParticipantId, VecDeque<IceCandidate>>,
    next_generation: u64,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A key for a new handle of `id`; never equal to a key handed out before.
    pub fn next_key(&mut self, id: &ParticipantId) -> PeerKey {
        self.next_generation += 1;
        PeerKey::new(id.clone(), self.next_generation)
    }

    /// Returns the handle it replaced, if any.
    pub fn insert(&mut self, handle: PeerHandle) -> Option<PeerHandle> {
        self.peers.insert(handle.peer_id().clone(), handle)
    }

    pub fn remove(&mut self, id: &ParticipantId) -> Option<PeerHandle> {
        self.peers.remove(id)
    }

    pub fn get_mut(&mut self, id: &ParticipantId) -> Option<&mut PeerHandle> {
        self.peers.get_mut(id)
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.peers.contains_key(id)
    }

    /// `true` if `key` names the live handle, not a replaced or closed one.
    pub fn is_current(&self, key: &PeerKey) -> bool {
        self.peers
            .get(&key.id)
            .is_some_and(|handle| handle.key().generation == key.generation)
    }

    /// Sorted snapshot of the keys.
    pub fn peer_ids(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<_> = self.peers.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn mark_departed(&mut self, id: ParticipantId) {
        self.early_candidates.remove(&id);
        self.departed.insert(id);
    }

    /// Keeps only departed ids the roster still lists; the others can no
    /// longer come back through a late roster.
    pub fn prune_departed(&mut self, roster: &[ParticipantId]) {
        if roster.is_empty() {
            return;
        }
        self.departed.retain(|id| roster.contains(id));
    }

    pub fn forget_departed(&mut self, id: &ParticipantId) {
        self.departed.remove(id);
    }

    pub fn is_departed(&self, id: &ParticipantId) -> bool {
        self.departed.contains(id)
    }

    /// Holds a candidate that arrived before any handle for `id` existed. The
    /// oldest one goes once the per-participant limit is reached.
    pub fn buffer_candidate(&mut self, id: ParticipantId, candidate: IceCandidate) {
        let queue = self.early_candidates.entry(id).or_default();
        if queue.len() >= EARLY_CANDIDATE_LIMIT {
            queue.pop_front();
        }
        queue.push_back(candidate);
    }

    pub fn take_early_candidates(&mut self, id: &ParticipantId) -> VecDeque<IceCandidate> {
        self.early_candidates.remove(id).unwrap_or_default()
    }

    pub fn drain(&mut self) -> Vec<PeerHandle> {
        self.early_candidates.clear();
        self.peers.drain().map(|(_, handle)| handle).collect()
    }

    pub fn summaries(&self) -> Vec<PeerSummary> {
        self.peer_ids()
            .into_iter()
            .filter_map(|id| self.peers.get(&id))
            .map(|handle| PeerSummary {
                peer_id: handle.peer_id().clone(),
                role: handle.role(),
                state: handle.state(),
            })
            .collect()
    }
}

/// What a join event means for the local registry.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct JoinPlan {
    /// Roster members without a handle, with the role of the local side.
    pub create: Vec<(ParticipantId, Role)>,
    /// Handles for participants the roster no longer lists.
    pub stale: Vec<ParticipantId>,
}

impl JoinPlan {
    pub fn compute(
        self_id: &ParticipantId,
        newcomer: &ParticipantId,
        roster: &[ParticipantId],
        known: &[ParticipantId],
    ) -> Self {
        let create = roster
            .iter()
            .filter(|member| *member != self_id && !known.contains(member))
            .map(|member| (member.clone(), Role::toward(self_id, newcomer, member)))
            .collect();

        // an empty roster carries no information
        let stale = if roster.is_empty() {
            Vec::new()
        } else {
            known
                .iter()
                .filter(|id| !roster.contains(id))
                .cloned()
                .collect()
        };

        Self { create, stale }
    }
}
