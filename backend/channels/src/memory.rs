//! In-process transport: inbound messages are injected by the caller and
//! outbound messages are recorded. Used to drive the runtime without a network.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use chatbridge_core::{BotIdentity, BridgeError, ChannelRef, ChatTransport, InboundMessage};

const NAME: &str = "memory";

pub struct MemoryTransport {
    identity: BotIdentity,
    inbound: Mutex<Option<mpsc::Sender<InboundMessage>>>,
    sent: Mutex<Vec<(ChannelRef, String)>>,
    credential: Mutex<Option<String>>,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    disconnected: AtomicBool,
    fail_connect: bool,
    fail_sends: bool,
    connect_delay: Option<Duration>,
}

impl MemoryTransport {
    pub fn new(identity: BotIdentity) -> Self {
        Self {
            identity,
            inbound: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            credential: Mutex::new(None),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            disconnected: AtomicBool::new(false),
            fail_connect: false,
            fail_sends: false,
            connect_delay: None,
        }
    }

    /// Every `connect` call fails.
    pub fn with_failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Every `send` call fails.
    pub fn with_failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    /// Every `connect` takes `delay` before it completes.
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    /// Deliver `message` as if it arrived from the network.
    pub async fn inject(&self, message: InboundMessage) -> Result<(), BridgeError> {
        let tx = self
            .inbound
            .lock()
            .ok()
            .and_then(|slot| slot.clone())
            .ok_or_else(|| BridgeError::transport(NAME, "not connected"))?;
        tx.send(message)
            .await
            .map_err(|_| BridgeError::transport(NAME, "inbound channel closed"))
    }

    /// Outbound messages in send order.
    pub fn sent(&self) -> Vec<(ChannelRef, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Credential passed to the last `connect`.
    pub fn credential(&self) -> Option<String> {
        self.credential.lock().ok().and_then(|c| c.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.inbound.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatTransport for MemoryTransport {
    fn name(&self) -> &str {
        NAME
    }

    async fn connect(
        &self,
        credential: &str,
        inbound_tx: mpsc::Sender<InboundMessage>,
    ) -> Result<BotIdentity, BridgeError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_connect {
            return Err(BridgeError::transport(NAME, "connect refused"));
        }
        if let Ok(mut c) = self.credential.lock() {
            *c = Some(credential.to_string());
        }
        if let Ok(mut slot) = self.inbound.lock() {
            *slot = Some(inbound_tx);
        }
        self.disconnected.store(false, Ordering::SeqCst);
        Ok(self.identity.clone())
    }

    async fn disconnect(&self) -> Result<(), BridgeError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut slot) = self.inbound.lock() {
            *slot = None;
        }
        self.disconnected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, channel: &ChannelRef, text: &str) -> Result<(), BridgeError> {
        if self.fail_sends || self.disconnected.load(Ordering::SeqCst) {
            return Err(BridgeError::transport(NAME, "send failed"));
        }
        debug!(channel = %channel.id, "memory transport send");
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((channel.clone(), text.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatbridge_core::Author;

    fn identity() -> BotIdentity {
        BotIdentity {
            user_id: "99".into(),
            name: "bridge".into(),
        }
    }

    fn message() -> InboundMessage {
        InboundMessage {
            id: "m1".into(),
            content: "!help".into(),
            author: Author::user("u1", "alice"),
            channel: ChannelRef::direct("c1"),
        }
    }

    #[tokio::test]
    async fn inject_requires_connection() {
        let transport = MemoryTransport::new(identity());
        assert!(transport.inject(message()).await.is_err());

        let (tx, mut rx) = mpsc::channel(4);
        let who = transport.connect("secret", tx).await.unwrap();
        assert_eq!(who, identity());
        assert_eq!(transport.credential().as_deref(), Some("secret"));

        transport.inject(message()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().content, "!help");
    }

    #[tokio::test]
    async fn disconnect_stops_delivery_and_sends() {
        let transport = MemoryTransport::new(identity());
        let (tx, _rx) = mpsc::channel(4);
        transport.connect("secret", tx).await.unwrap();
        transport.disconnect().await.unwrap();

        assert!(!transport.is_connected());
        assert!(transport.inject(message()).await.is_err());
        assert!(transport.send(&ChannelRef::direct("c1"), "hi").await.is_err());
        assert_eq!(transport.disconnect_count(), 1);
    }
}
