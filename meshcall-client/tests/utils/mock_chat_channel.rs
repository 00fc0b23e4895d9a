use anyhow::{Result, bail};
use async_trait::async_trait;
use meshcall_client::chat::ChatChannel;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory chat channel that records every frame written to it.
#[derive(Default)]
pub struct MockChatChannel {
    open: AtomicBool,
    sent: Mutex<Vec<String>>,
}

impl MockChatChannel {
    pub fn open() -> Arc<Self> {
        let channel = Self::default();
        channel.open.store(true, Ordering::SeqCst);
        Arc::new(channel)
    }

    pub fn connecting() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatChannel for MockChatChannel {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn deliver(&self, text: String) -> Result<()> {
        if !self.is_open() {
            bail!("channel not open");
        }
        self.sent.lock().unwrap().push(text);
        Ok(())
    }
}
