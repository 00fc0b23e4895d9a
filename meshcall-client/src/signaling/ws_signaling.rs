use crate::MeshError;
use crate::signaling::{SignalingEvent, SignalingOutput};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use meshcall_core::{ClientMessage, ParticipantId, ServerMessage, SignalPayload};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// WebSocket client for the relay server.
///
/// Frames are JSON `{"op": ..., "d": ...}`. Inbound frames are turned into
/// [`SignalingEvent`]s; a closed socket yields a final
/// [`SignalingEvent::Disconnected`].
#[derive(Clone)]
pub struct WsSignaling {
    outbound: mpsc::UnboundedSender<ClientMessage>,
}

impl WsSignaling {
    pub async fn connect(
        url: &str,
        buffer: usize,
    ) -> Result<(Self, mpsc::Receiver<SignalingEvent>), MeshError> {
        let (socket, _) = connect_async(url).await?;
        info!(%url, "connected to signaling server");

        let (mut sink, mut stream) = socket.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let (events_tx, events_rx) = mpsc::channel(buffer);

        let mut send_task = tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let text = match serde_json::to_string(&msg) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("failed to encode signaling frame: {e}");
                        continue;
                    }
                };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader_tx = events_tx.clone();
        let mut recv_task = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("signaling socket error: {e}");
                        break;
                    }
                };

                let event = match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(msg) => SignalingEvent::from(msg),
                    Err(e) => {
                        warn!("dropping unparseable signaling frame: {e}");
                        continue;
                    }
                };
                debug!(?event, "signaling event");
                if reader_tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        tokio::spawn(async move {
            tokio::select! {
                _ = (&mut send_task) => recv_task.abort(),
                _ = (&mut recv_task) => send_task.abort(),
            };
            info!("signaling connection closed");
            let _ = events_tx.send(SignalingEvent::Disconnected).await;
        });

        Ok((Self { outbound }, events_rx))
    }

    fn push(&self, msg: ClientMessage) {
        if self.outbound.send(msg).is_err() {
            warn!("signaling connection is gone; frame dropped");
        }
    }
}

#[async_trait]
impl SignalingOutput for WsSignaling {
    async fn join(&self, room: &str) {
        self.push(ClientMessage::JoinCall {
            room: room.to_owned(),
        });
    }

    async fn relay(&self, target: ParticipantId, payload: SignalPayload) {
        match payload.encode() {
            Ok(payload) => self.push(ClientMessage::Signal {
                to: target,
                payload,
            }),
            Err(e) => error!(peer = %target, "failed to encode signal: {e}"),
        }
    }
}
