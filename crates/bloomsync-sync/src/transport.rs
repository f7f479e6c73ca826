//! Transport abstraction for the sync protocol.
//!
//! The transport moves whole messages between exactly two peers. Opening
//! the connection is the caller's job.

use async_trait::async_trait;

use crate::error::SyncError;
use crate::messages::{NodeId, SyncMessage};

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Transport trait for sending and receiving sync messages.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a message to a specific peer.
    async fn send(&self, peer: &NodeId, message: SyncMessage) -> Result<()>;

    /// Receive the next message.
    ///
    /// Returns the sender's NodeId and the message.
    /// Blocks until a message is available or an error occurs.
    async fn recv(&self) -> Result<(NodeId, SyncMessage)>;

    /// Receive with timeout.
    ///
    /// Returns None if timeout expires before a message arrives. Must be
    /// cancel safe: an expired wait loses no data.
    async fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<Option<(NodeId, SyncMessage)>>;

    /// Get the local node's identity.
    fn local_node_id(&self) -> NodeId;

    /// Check if a specific peer is connected.
    async fn is_connected(&self, peer: &NodeId) -> bool;
}

/// A simple in-memory transport for testing and embedding.
///
/// Uses channels to simulate message passing between nodes.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::{mpsc, Mutex, RwLock};

    /// Message envelope for internal routing.
    #[derive(Debug, Clone)]
    struct Envelope {
        from: NodeId,
        message: SyncMessage,
    }

    /// Shared state for the memory transport network.
    #[derive(Default)]
    pub struct MemoryNetwork {
        /// Sender channels for each node.
        senders: RwLock<HashMap<NodeId, mpsc::Sender<Envelope>>>,
    }

    impl MemoryNetwork {
        /// Create a new memory network.
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Create a transport connected to this network.
        pub async fn create_transport(self: &Arc<Self>, node_id: NodeId) -> MemoryTransport {
            let (tx, rx) = mpsc::channel(64);

            self.senders.write().await.insert(node_id, tx);

            MemoryTransport {
                node_id,
                network: Arc::clone(self),
                receiver: Mutex::new(rx),
            }
        }

        /// Create two connected transports.
        pub async fn pair(
            self: &Arc<Self>,
            a: NodeId,
            b: NodeId,
        ) -> (MemoryTransport, MemoryTransport) {
            (self.create_transport(a).await, self.create_transport(b).await)
        }

        /// Remove a node; sends to it fail from now on.
        pub async fn disconnect(&self, node_id: &NodeId) {
            self.senders.write().await.remove(node_id);
        }
    }

    /// In-memory transport implementation.
    pub struct MemoryTransport {
        node_id: NodeId,
        network: Arc<MemoryNetwork>,
        receiver: Mutex<mpsc::Receiver<Envelope>>,
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn send(&self, peer: &NodeId, message: SyncMessage) -> Result<()> {
            let sender = self
                .network
                .senders
                .read()
                .await
                .get(peer)
                .cloned()
                .ok_or_else(|| SyncError::PeerNotConnected(peer.to_string()))?;

            let envelope = Envelope {
                from: self.node_id,
                message,
            };
            sender
                .send(envelope)
                .await
                .map_err(|_| SyncError::Transport("peer disconnected".into()))
        }

        async fn recv(&self) -> Result<(NodeId, SyncMessage)> {
            let mut rx = self.receiver.lock().await;
            match rx.recv().await {
                Some(envelope) => Ok((envelope.from, envelope.message)),
                None => Err(SyncError::Transport("channel closed".into())),
            }
        }

        async fn recv_timeout(
            &self,
            timeout: std::time::Duration,
        ) -> Result<Option<(NodeId, SyncMessage)>> {
            let mut rx = self.receiver.lock().await;
            match tokio::time::timeout(timeout, rx.recv()).await {
                Ok(Some(envelope)) => Ok(Some((envelope.from, envelope.message))),
                Ok(None) => Err(SyncError::Transport("channel closed".into())),
                Err(_) => Ok(None),
            }
        }

        fn local_node_id(&self) -> NodeId {
            self.node_id
        }

        async fn is_connected(&self, peer: &NodeId) -> bool {
            self.network.senders.read().await.contains_key(peer)
        }
    }
}

/// Framed transport over any byte stream.
///
/// Both ends exchange a hello carrying their node id, then wire frames.
pub mod stream {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
    use tokio::sync::Mutex;

    use crate::messages::PROTOCOL_VERSION;
    use crate::wire::{encode_frame, FrameDecoder};

    /// Hello preamble.
    const MAGIC: &[u8; 4] = b"BSYN";
    const HELLO_LEN: usize = MAGIC.len() + 1 + 32;

    struct Reader<S> {
        io: ReadHalf<S>,
        frames: FrameDecoder,
    }

    /// Transport over a connected byte stream such as a TCP socket.
    pub struct StreamTransport<S> {
        local: NodeId,
        peer: NodeId,
        reader: Mutex<Reader<S>>,
        writer: Mutex<WriteHalf<S>>,
        closed: AtomicBool,
    }

    impl<S> StreamTransport<S>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        /// Exchange hellos over `io` and return the ready transport.
        pub async fn handshake(io: S, local: NodeId) -> Result<Self> {
            let (mut rd, mut wr) = tokio::io::split(io);

            let mut hello = Vec::with_capacity(HELLO_LEN);
            hello.extend_from_slice(MAGIC);
            hello.push(PROTOCOL_VERSION);
            hello.extend_from_slice(local.as_bytes());
            wr.write_all(&hello).await?;
            wr.flush().await?;

            let mut reply = [0u8; HELLO_LEN];
            rd.read_exact(&mut reply).await?;
            if &reply[..MAGIC.len()] != MAGIC {
                return Err(SyncError::InvalidMessage("bad hello preamble".into()));
            }
            let version = reply[MAGIC.len()];
            if version != PROTOCOL_VERSION {
                return Err(SyncError::VersionMismatch {
                    local: PROTOCOL_VERSION,
                    peer: version,
                });
            }
            let mut id = [0u8; 32];
            id.copy_from_slice(&reply[MAGIC.len() + 1..]);
            let peer = NodeId::from_bytes(id);

            tracing::debug!(local = %local, peer = %peer, "stream handshake complete");

            Ok(Self {
                local,
                peer,
                reader: Mutex::new(Reader {
                    io: rd,
                    frames: FrameDecoder::new(),
                }),
                writer: Mutex::new(wr),
                closed: AtomicBool::new(false),
            })
        }

        /// The node on the other end.
        pub fn peer_id(&self) -> NodeId {
            self.peer
        }

        /// Read frames until one is complete.
        ///
        /// Only `read_buf` awaits, and it is cancel safe, so partial frames
        /// stay buffered across an expired `recv_timeout`. Malformed frames
        /// are dropped; a stream that can no longer be framed is closed.
        async fn next_message(&self) -> Result<SyncMessage> {
            let mut reader = self.reader.lock().await;
            let Reader { io, frames } = &mut *reader;
            loop {
                if self.closed.load(Ordering::Relaxed) {
                    return Err(SyncError::Transport("connection closed".into()));
                }
                match frames.decode() {
                    Ok(Some(message)) => return Ok(message),
                    Ok(None) => {}
                    Err(SyncError::Transport(reason)) => {
                        tracing::warn!(peer = %self.peer, reason = %reason, "closing stream");
                        self.closed.store(true, Ordering::Relaxed);
                        return Err(SyncError::Transport(reason));
                    }
                    Err(e) => {
                        tracing::warn!(peer = %self.peer, error = %e, "dropping malformed frame");
                        continue;
                    }
                }
                if io.read_buf(frames.buffer_mut()).await? == 0 {
                    self.closed.store(true, Ordering::Relaxed);
                    return Err(SyncError::Transport("connection closed".into()));
                }
            }
        }
    }

    #[async_trait]
    impl<S> Transport for StreamTransport<S>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        async fn send(&self, peer: &NodeId, message: SyncMessage) -> Result<()> {
            if peer != &self.peer {
                return Err(SyncError::PeerNotConnected(peer.to_string()));
            }
            let frame = encode_frame(&message)?;
            let mut writer = self.writer.lock().await;
            let result = async {
                writer.write_all(&frame).await?;
                writer.flush().await
            }
            .await;
            if let Err(e) = result {
                self.closed.store(true, Ordering::Relaxed);
                return Err(e.into());
            }
            Ok(())
        }

        async fn recv(&self) -> Result<(NodeId, SyncMessage)> {
            let message = self.next_message().await?;
            Ok((self.peer, message))
        }

        async fn recv_timeout(
            &self,
            timeout: std::time::Duration,
        ) -> Result<Option<(NodeId, SyncMessage)>> {
            match tokio::time::timeout(timeout, self.next_message()).await {
                Ok(Ok(message)) => Ok(Some((self.peer, message))),
                Ok(Err(e)) => Err(e),
                Err(_) => Ok(None),
            }
        }

        fn local_node_id(&self) -> NodeId {
            self.local
        }

        async fn is_connected(&self, peer: &NodeId) -> bool {
            peer == &self.peer && !self.closed.load(Ordering::Relaxed)
        }
    }
}
