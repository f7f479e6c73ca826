//! Test fixtures and helpers.
//!
//! Common setup code for protocol and integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use bloomsync_core::decode_missing;
use bloomsync_store::MemoryDocument;
use bloomsync_sync::{
    MemoryNetwork, MemoryTransport, NodeId, SyncConfig, SyncMessage, SyncPeer, Transport,
};

/// The node that wins a simultaneous start.
pub const LOW_NODE: NodeId = NodeId::from_bytes([0x01; 32]);
/// The node that yields on a simultaneous start.
pub const HIGH_NODE: NodeId = NodeId::from_bytes([0x02; 32]);

/// A peer over in-memory parts.
pub type MemoryPeer<T = MemoryTransport> = SyncPeer<Arc<MemoryDocument>, T>;

/// Two documents and two connected in-memory transports.
///
/// Side A uses [`LOW_NODE`], side B uses [`HIGH_NODE`].
pub struct PeerPair {
    pub network: Arc<MemoryNetwork>,
    pub doc_a: Arc<MemoryDocument>,
    pub doc_b: Arc<MemoryDocument>,
    pub transport_a: MemoryTransport,
    pub transport_b: MemoryTransport,
}

impl PeerPair {
    /// Create a pair holding the given file contents.
    pub async fn new(a: &str, b: &str) -> Self {
        let network = MemoryNetwork::new();
        let (transport_a, transport_b) = network.pair(LOW_NODE, HIGH_NODE).await;
        Self {
            network,
            doc_a: Arc::new(MemoryDocument::new("a", a)),
            doc_b: Arc::new(MemoryDocument::new("b", b)),
            transport_a,
            transport_b,
        }
    }

    /// Check whether both documents hold the same bytes.
    pub fn converged(&self) -> bool {
        self.doc_a.contents() == self.doc_b.contents()
    }

    /// Turn the pair into two protocol peers.
    pub fn into_peers(self, config: SyncConfig) -> bloomsync_sync::Result<(MemoryPeer, MemoryPeer)> {
        let a = SyncPeer::new(self.doc_a, self.transport_a, HIGH_NODE, config.clone())?;
        let b = SyncPeer::new(self.doc_b, self.transport_b, LOW_NODE, config)?;
        Ok((a, b))
    }
}

/// Alternate between two peers until neither receives anything for `quiet`.
///
/// Returns the number of messages handled.
pub async fn drive<T: Transport>(
    a: &mut MemoryPeer<T>,
    b: &mut MemoryPeer<T>,
    quiet: Duration,
) -> bloomsync_sync::Result<usize> {
    let mut handled = 0;
    loop {
        let mut progressed = false;
        for peer in [&mut *a, &mut *b] {
            if let Some((from, message)) = peer.transport().recv_timeout(quiet).await? {
                peer.handle_message(from, message).await?;
                handled += 1;
                progressed = true;
            }
        }
        if !progressed {
            return Ok(handled);
        }
    }
}

type TamperFn = dyn Fn(&SyncMessage) -> Option<SyncMessage> + Send + Sync;

/// A transport that can rewrite outgoing messages.
///
/// The tamper function returns a replacement, or `None` to send the
/// message unchanged.
pub struct TamperingTransport<T> {
    inner: T,
    tamper: Box<TamperFn>,
    tampered: AtomicUsize,
}

impl<T: Transport> TamperingTransport<T> {
    /// Wrap `inner`, rewriting outgoing messages with `tamper`.
    pub fn new(
        inner: T,
        tamper: impl Fn(&SyncMessage) -> Option<SyncMessage> + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner,
            tamper: Box::new(tamper),
            tampered: AtomicUsize::new(0),
        }
    }

    /// Drop the first line of every outgoing MissingContent.
    ///
    /// Simulates a false positive hiding a line from the exchange.
    pub fn drop_first_missing_line(inner: T) -> Self {
        Self::new(inner, |message| match message {
            SyncMessage::MissingContent { payload } => {
                let mut missing = decode_missing(payload, usize::MAX).ok()?;
                let first = missing.line_numbers().next()?;
                missing.remove(first);
                Some(SyncMessage::missing_content(&missing))
            }
            _ => None,
        })
    }

    /// Replace every outgoing MissingContent payload with `garbage`.
    pub fn garble_missing_content(inner: T, garbage: &'static [u8]) -> Self {
        Self::new(inner, move |message| match message {
            SyncMessage::MissingContent { .. } => Some(SyncMessage::MissingContent {
                payload: bytes::Bytes::from_static(garbage),
            }),
            _ => None,
        })
    }

    /// Number of messages rewritten so far.
    pub fn tampered_count(&self) -> usize {
        self.tampered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: Transport> Transport for TamperingTransport<T> {
    async fn send(&self, peer: &NodeId, message: SyncMessage) -> bloomsync_sync::Result<()> {
        let message = match (self.tamper)(&message) {
            Some(replacement) => {
                self.tampered.fetch_add(1, Ordering::SeqCst);
                replacement
            }
            None => message,
        };
        self.inner.send(peer, message).await
    }

    async fn recv(&self) -> bloomsync_sync::Result<(NodeId, SyncMessage)> {
        self.inner.recv().await
    }

    async fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> bloomsync_sync::Result<Option<(NodeId, SyncMessage)>> {
        self.inner.recv_timeout(timeout).await
    }

    fn local_node_id(&self) -> NodeId {
        self.inner.local_node_id()
    }

    async fn is_connected(&self, peer: &NodeId) -> bool {
        self.inner.is_connected(peer).await
    }
}
