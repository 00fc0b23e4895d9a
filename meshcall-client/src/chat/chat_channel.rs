use anyhow::Result;
use async_trait::async_trait;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;

/// The write side of a peer's chat data channel.
#[async_trait]
pub trait ChatChannel: Send + Sync {
    fn is_open(&self) -> bool;

    async fn deliver(&self, text: String) -> Result<()>;
}

#[async_trait]
impl ChatChannel for RTCDataChannel {
    fn is_open(&self) -> bool {
        self.ready_state() == RTCDataChannelState::Open
    }

    async fn deliver(&self, text: String) -> Result<()> {
        self.send_text(text).await?;
        Ok(())
    }
}
