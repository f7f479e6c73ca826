//! The sync node: one peer's event loop.
//!
//! A node owns a [`SyncPeer`] and feeds it three kinds of events from a
//! single task, so the protocol state is never shared:
//!
//! - messages from the transport
//! - local change notifications from a file watcher, via [`LocalChangeHandle`]
//! - round timeouts

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use bloomsync_store::Document;
use bloomsync_sync::{
    LocalChange, NodeId, RoundOutcome, RoundReport, SyncConfig, SyncMessage, SyncPeer, Transport,
};

use crate::error::{NodeError, Result};

/// Configuration for a sync node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Protocol configuration.
    pub sync: SyncConfig,
    /// Longest wait between loop iterations while idle.
    pub idle_poll_interval: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
            idle_poll_interval: Duration::from_secs(1),
        }
    }
}

/// Handle for reporting local file changes to a running node.
///
/// Cheap to clone. Notifications coalesce: a burst of changes while the
/// node is busy produces one follow-up check.
#[derive(Debug, Clone)]
pub struct LocalChangeHandle {
    tx: mpsc::Sender<()>,
}

impl LocalChangeHandle {
    /// Report that the local file changed.
    ///
    /// Returns `false` once the node has stopped.
    pub fn notify(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => true,
            Err(TrySendError::Closed(())) => false,
        }
    }
}

/// Totals over the rounds a node has finished.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSummary {
    /// Rounds finished.
    pub rounds: usize,
    /// Rounds that needed a full-file transfer.
    pub fallbacks: usize,
    /// Rounds abandoned after a timeout.
    pub timeouts: usize,
    /// Rounds aborted by an error.
    pub aborted: usize,
    /// The most recent report.
    pub last: Option<RoundReport>,
}

impl NodeSummary {
    fn record(&mut self, report: RoundReport) {
        self.rounds += 1;
        if report.used_fallback() {
            self.fallbacks += 1;
        }
        if report.outcome == RoundOutcome::TimedOut {
            self.timeouts += 1;
        }
        self.last = Some(report);
    }
}

enum Event {
    Shutdown,
    LocalChange,
    Inbound(bloomsync_sync::Result<Option<(NodeId, SyncMessage)>>),
}

/// One side of a file sync session.
pub struct SyncNode<D: Document, T: Transport> {
    peer: SyncPeer<D, T>,
    config: NodeConfig,
    changes: mpsc::Receiver<()>,
    handle: LocalChangeHandle,
    summary: NodeSummary,
}

impl<D: Document, T: Transport> SyncNode<D, T> {
    /// Create a node syncing `document` with `peer` over `transport`.
    pub fn new(document: D, transport: T, peer: NodeId, config: NodeConfig) -> Result<Self> {
        let peer = SyncPeer::new(document, transport, peer, config.sync.clone())
            .map_err(NodeError::from_sync)?;
        let (tx, changes) = mpsc::channel(1);
        Ok(Self {
            peer,
            config,
            changes,
            handle: LocalChangeHandle { tx },
            summary: NodeSummary::default(),
        })
    }

    /// A handle for reporting local changes.
    pub fn change_handle(&self) -> LocalChangeHandle {
        self.handle.clone()
    }

    /// The protocol peer.
    pub fn peer(&self) -> &SyncPeer<D, T> {
        &self.peer
    }

    /// The synchronized document.
    pub fn document(&self) -> &D {
        self.peer.document()
    }

    /// Totals so far.
    pub fn summary(&self) -> &NodeSummary {
        &self.summary
    }

    /// Start a round right away, as a freshly connected host does.
    pub async fn initial_sync(&mut self) -> Result<LocalChange> {
        self.peer
            .on_local_change()
            .await
            .map_err(NodeError::from_sync)
    }

    /// Run until `shutdown` completes or the connection is lost.
    ///
    /// Errors that only affect one round are logged and the loop carries
    /// on; the round is abandoned and the peer is idle again.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<NodeSummary>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        tracing::info!(
            local = %self.peer.local_id(),
            peer = %self.peer.peer_id(),
            document = %self.peer.document().describe(),
            "sync node running"
        );

        loop {
            let wait = match self.peer.time_until_deadline() {
                Some(left) => left.min(self.config.idle_poll_interval),
                None => self.config.idle_poll_interval,
            };

            let event = tokio::select! {
                biased;
                _ = &mut shutdown => Event::Shutdown,
                Some(()) = self.changes.recv() => Event::LocalChange,
                inbound = self.peer.transport().recv_timeout(wait) => Event::Inbound(inbound),
            };

            let result = match event {
                Event::Shutdown => break,
                Event::LocalChange => self.peer.on_local_change().await.map(|_| None),
                Event::Inbound(Ok(Some((from, message)))) => {
                    self.peer.handle_message(from, message).await
                }
                Event::Inbound(Ok(None)) => self.peer.check_timeout().await,
                Event::Inbound(Err(e)) => Err(e),
            };

            match result.map_err(NodeError::from_sync) {
                Ok(Some(report)) => self.summary.record(report),
                Ok(None) => {}
                Err(e) if e.is_fatal() => {
                    tracing::warn!(error = %e, "sync node stopping");
                    return Err(e);
                }
                Err(e) => {
                    self.summary.aborted += 1;
                    tracing::warn!(error = %e, "sync round failed");
                }
            }
        }

        tracing::info!(rounds = self.summary.rounds, "sync node stopped");
        Ok(self.summary.clone())
    }
}
