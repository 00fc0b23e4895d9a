use meshcall_core::ParticipantId;
use std::fmt;

/// Which side of a pair builds the first offer. Fixed when the handle is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Offerer,
    Answerer,
}

impl Role {
    /// Role of the local participant toward `member` after `newcomer` joined.
    ///
    /// The newcomer answers every incumbent and every incumbent offers to the
    /// newcomer, so each pair has exactly one offerer. The id comparison only
    /// matters when an incumbent discovers another incumbent it has no handle for
    /// (a missed join event); both sides then agree on the lower id offering.
    pub fn toward(self_id: &ParticipantId, newcomer: &ParticipantId, member: &ParticipantId) -> Self {
        if newcomer == self_id {
            Role::Answerer
        } else if member == newcomer {
            Role::Offerer
        } else if self_id < member {
            Role::Offerer
        } else {
            Role::Answerer
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Offerer => f.write_str("offerer"),
            Role::Answerer => f.write_str("answerer"),
        }
    }
}
