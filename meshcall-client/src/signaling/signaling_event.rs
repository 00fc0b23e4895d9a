use meshcall_core::{ParticipantId, ServerMessage};

/// Inbound signaling events.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalingEvent {
    /// The server assigned our id.
    Connected(ParticipantId),

    /// Someone joined, possibly us. `roster` lists every participant.
    ParticipantJoined {
        id: ParticipantId,
        roster: Vec<ParticipantId>,
    },

    ParticipantLeft(ParticipantId),

    /// Opaque payload from another participant, decoded by the mesh.
    Signal {
        from: ParticipantId,
        payload: String,
    },

    ChatMessage {
        from: ParticipantId,
        sender: String,
        body: String,
    },

    /// Connection to the server lost.
    Disconnected,
}

impl From<ServerMessage> for SignalingEvent {
    fn from(msg: ServerMessage) -> Self {
        match msg {
            ServerMessage::Connected { id } => SignalingEvent::Connected(id),
            ServerMessage::UserJoined { id, clients } => SignalingEvent::ParticipantJoined {
                id,
                roster: clients,
            },
            ServerMessage::UserLeft { id } => SignalingEvent::ParticipantLeft(id),
            ServerMessage::Signal { from, payload } => SignalingEvent::Signal { from, payload },
            ServerMessage::ChatMessage { from, sender, body } => {
                SignalingEvent::ChatMessage { from, sender, body }
            }
        }
    }
}
