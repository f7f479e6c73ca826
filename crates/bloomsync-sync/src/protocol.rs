//! Sync protocol state machine.
//!
//! One [`SyncPeer`] runs on each side. A round starts when a local change
//! is noticed while idle:
//!
//! 1. The initiator sends a filter over its lines.
//! 2. The responder works out which of its lines the initiator lacks (its
//!    deficit) and replies with its own filter.
//! 3. The initiator sends the lines the responder lacks.
//! 4. The responder merges, writes the file, and reports the new hash.
//! 5. The initiator confirms, or sends its whole file if the hashes differ.
//!
//! The machine is event driven: callers feed it local-change events,
//! inbound messages and timeout checks.

use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use bloomsync_core::{decode_missing, ContentHash, CoreError, MissingContent, Reconciler};
use bloomsync_store::{Document, Snapshot};

use crate::convergence::{verify_convergence, ConvergenceResult};
use crate::error::{Result, SyncError};
use crate::merge::merge_lines;
use crate::messages::{limits, NodeId, SyncMessage};
use crate::transport::Transport;

/// Configuration for sync behavior.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Target false-positive rate of line filters. Both peers must agree.
    pub false_positive_rate: f64,
    /// How long a round may wait for the next peer message.
    pub round_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            false_positive_rate: bloomsync_core::DEFAULT_FALSE_POSITIVE_RATE,
            round_timeout: Duration::from_secs(30),
        }
    }
}

/// Which side of a round this peer played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Noticed the change and sent the first filter.
    Initiator,
    /// Answered the peer's filter.
    Responder,
}

/// How a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Hashes matched after the line exchange.
    Converged,
    /// This peer sent its whole file.
    SentEntireFile,
    /// This peer received and wrote the peer's whole file.
    ReceivedEntireFile,
    /// Timed out waiting for the peer.
    TimedOut,
}

/// Result of one round, as seen from one side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    /// The role this peer played.
    pub role: Role,
    /// How the round ended.
    pub outcome: RoundOutcome,
    /// Lines sent in MissingContent.
    pub lines_sent: usize,
    /// Lines received in MissingContent.
    pub lines_received: usize,
    /// Local lines dropped by the merge.
    pub lines_removed: usize,
}

impl RoundReport {
    /// Check if the round ended with both files identical.
    pub fn is_converged(&self) -> bool {
        self.outcome != RoundOutcome::TimedOut
    }

    /// Check if the round needed a full-file transfer.
    pub fn used_fallback(&self) -> bool {
        matches!(
            self.outcome,
            RoundOutcome::SentEntireFile | RoundOutcome::ReceivedEntireFile
        )
    }
}

#[derive(Debug)]
struct RoundStats {
    role: Role,
    lines_sent: usize,
    lines_received: usize,
    lines_removed: usize,
}

impl RoundStats {
    fn new(role: Role) -> Self {
        Self {
            role,
            lines_sent: 0,
            lines_received: 0,
            lines_removed: 0,
        }
    }

    fn finish(self, outcome: RoundOutcome) -> RoundReport {
        RoundReport {
            role: self.role,
            outcome,
            lines_sent: self.lines_sent,
            lines_received: self.lines_received,
            lines_removed: self.lines_removed,
        }
    }
}

/// Protocol state. Anything but `Idle` means a round is in progress.
#[derive(Debug)]
pub enum SyncState {
    /// No round in progress.
    Idle,
    /// Initiator: sent our filter, waiting for the peer's.
    AwaitingFilterReply {
        /// The content the round reconciles.
        base: Snapshot,
    },
    /// Responder: sent our filter, waiting for the initiator's lines.
    AwaitingMissingContent {
        /// The content the merge applies to.
        base: Snapshot,
        /// Our lines the initiator's filter lacks.
        deficit: MissingContent,
    },
    /// Initiator: sent our lines, waiting for the merged file's hash.
    AwaitingHash {
        /// The content the responder should now hold.
        base: Snapshot,
    },
    /// Responder: waiting for confirmation or the initiator's whole file.
    AwaitingVerdict {
        /// Hash of the merged file we wrote, if we merged.
        merged: Option<ContentHash>,
    },
}

impl SyncState {
    /// A short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::AwaitingFilterReply { .. } => "awaiting-filter-reply",
            SyncState::AwaitingMissingContent { .. } => "awaiting-missing-content",
            SyncState::AwaitingHash { .. } => "awaiting-hash",
            SyncState::AwaitingVerdict { .. } => "awaiting-verdict",
        }
    }

    /// Check if no round is in progress.
    pub fn is_idle(&self) -> bool {
        matches!(self, SyncState::Idle)
    }
}

/// What a local change event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalChange {
    /// A round was started.
    Started,
    /// A round is in progress; the change will be looked at afterwards.
    Deferred,
    /// The file matches what was last synced.
    Unchanged,
}

/// One side of the sync protocol.
pub struct SyncPeer<D: Document, T: Transport> {
    /// The synchronized file.
    document: D,
    /// The transport layer.
    transport: T,
    /// The one peer we sync with.
    peer: NodeId,
    /// Configuration.
    config: SyncConfig,
    reconciler: Reconciler,
    state: SyncState,
    /// When the current round gives up waiting.
    deadline: Option<Instant>,
    stats: Option<RoundStats>,
    /// A local change arrived while busy.
    pending_change: bool,
    /// Hash of the content both sides last agreed on.
    last_synced: Option<ContentHash>,
}

impl<D: Document, T: Transport> SyncPeer<D, T> {
    /// Create a peer.
    pub fn new(document: D, transport: T, peer: NodeId, config: SyncConfig) -> Result<Self> {
        let reconciler = Reconciler::new(config.false_positive_rate)?;
        Ok(Self {
            document,
            transport,
            peer,
            config,
            reconciler,
            state: SyncState::Idle,
            deadline: None,
            stats: None,
            pending_change: false,
            last_synced: None,
        })
    }

    /// The current protocol state.
    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Check if a round is in progress.
    pub fn is_busy(&self) -> bool {
        !self.state.is_idle()
    }

    /// Check if a local change is waiting for the current round to end.
    pub fn has_pending_change(&self) -> bool {
        self.pending_change
    }

    /// Hash of the content both sides last agreed on.
    pub fn last_synced(&self) -> Option<ContentHash> {
        self.last_synced
    }

    /// The synchronized document.
    pub fn document(&self) -> &D {
        &self.document
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The peer's node id.
    pub fn peer_id(&self) -> NodeId {
        self.peer
    }

    /// Our node id.
    pub fn local_id(&self) -> NodeId {
        self.transport.local_node_id()
    }

    /// The configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Time left before the current round times out.
    pub fn time_until_deadline(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Handle a local change notification.
    ///
    /// Starts a round when idle and the file differs from what was last
    /// synced. Our own writes therefore never start a round.
    pub async fn on_local_change(&mut self) -> Result<LocalChange> {
        if self.is_busy() {
            tracing::debug!(state = self.state.name(), "local change deferred");
            self.pending_change = true;
            return Ok(LocalChange::Deferred);
        }

        let base = self.document.read().await?;
        if self.last_synced == Some(base.hash()) {
            tracing::trace!(hash = %base.hash(), "local change matches synced content");
            return Ok(LocalChange::Unchanged);
        }

        self.start_round(base).await?;
        Ok(LocalChange::Started)
    }

    /// Send our filter over `base` and wait for the peer's.
    async fn start_round(&mut self, base: Snapshot) -> Result<()> {
        let lines = base.lines()?;
        let filter = self.reconciler.build_filter(&lines)?;

        tracing::info!(
            peer = %self.peer,
            lines = lines.len(),
            filter_bytes = filter.num_bytes(),
            "starting sync round"
        );

        self.stats = Some(RoundStats::new(Role::Initiator));
        let request = SyncMessage::FilterRequest {
            filter: Bytes::from(filter.into_bytes()),
        };
        if let Err(e) = self.send(request).await {
            self.abort(&e);
            return Err(e);
        }
        self.transition(SyncState::AwaitingFilterReply { base });
        Ok(())
    }

    /// Handle one inbound message.
    ///
    /// Returns a report when this message ended a round. Errors abort the
    /// round; the peer is idle afterwards.
    pub async fn handle_message(
        &mut self,
        from: NodeId,
        message: SyncMessage,
    ) -> Result<Option<RoundReport>> {
        if from != self.peer {
            tracing::warn!(from = %from, "dropping message from unknown node");
            return Ok(None);
        }

        if let Err(reason) = message.validate_limits() {
            tracing::warn!(peer = %from, reason, "dropping oversized message");
            return Ok(None);
        }

        tracing::debug!(
            peer = %from,
            message = ?message.message_type(),
            bytes = message.payload_len(),
            state = self.state.name(),
            "received"
        );

        let result = self.dispatch(message).await;
        if let Err(e) = &result {
            self.abort(e);
        }
        result
    }

    /// Abort the round if the peer has been silent too long.
    pub async fn check_timeout(&mut self) -> Result<Option<RoundReport>> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                tracing::warn!(
                    peer = %self.peer,
                    state = self.state.name(),
                    "round timed out"
                );
                self.finish(RoundOutcome::TimedOut).await
            }
            _ => Ok(None),
        }
    }

    /// Wait up to `max_wait` for one message and handle it, or handle a
    /// timeout.
    pub async fn poll_once(&mut self, max_wait: Duration) -> Result<Option<RoundReport>> {
        let wait = match self.time_until_deadline() {
            Some(left) if left.is_zero() => return self.check_timeout().await,
            Some(left) => left.min(max_wait),
            None => max_wait,
        };

        match self.transport.recv_timeout(wait).await {
            Ok(Some((from, message))) => self.handle_message(from, message).await,
            Ok(None) => self.check_timeout().await,
            Err(e) => {
                self.abort(&e);
                Err(e)
            }
        }
    }

    async fn dispatch(&mut self, message: SyncMessage) -> Result<Option<RoundReport>> {
        let state = std::mem::replace(&mut self.state, SyncState::Idle);

        match (state, message) {
            (_, SyncMessage::EntireFile { contents }) => self.accept_entire_file(contents).await,

            (state, SyncMessage::FullFileRequest) => {
                if state.is_idle() {
                    self.stats = Some(RoundStats::new(Role::Responder));
                }
                tracing::info!(peer = %self.peer, "peer requested the whole file");
                self.send_entire_file().await
            }

            (SyncState::AwaitingFilterReply { base }, SyncMessage::FilterRequest { filter }) => {
                if self.local_id() < self.peer {
                    tracing::debug!(peer = %self.peer, "simultaneous start, keeping initiator role");
                    self.state = SyncState::AwaitingFilterReply { base };
                    Ok(None)
                } else {
                    tracing::info!(peer = %self.peer, "simultaneous start, yielding to peer");
                    self.pending_change = true;
                    self.respond_to_filter(filter).await
                }
            }

            (state, SyncMessage::FilterRequest { filter }) => {
                if !state.is_idle() {
                    tracing::info!(
                        peer = %self.peer,
                        state = state.name(),
                        "peer started a new round, abandoning ours"
                    );
                    if matches!(self.stats, Some(RoundStats { role: Role::Initiator, .. })) {
                        self.pending_change = true;
                    }
                }
                self.respond_to_filter(filter).await
            }

            (SyncState::AwaitingFilterReply { base }, SyncMessage::FilterReply { filter }) => {
                self.send_missing_content(base, filter).await
            }

            (
                SyncState::AwaitingMissingContent { base, deficit },
                SyncMessage::MissingContent { payload },
            ) => self.apply_missing_content(base, deficit, payload).await,

            (SyncState::AwaitingHash { base }, SyncMessage::FileHash { hash }) => {
                self.check_hash(base, hash).await
            }

            (SyncState::AwaitingVerdict { merged }, SyncMessage::Verified) => {
                if merged.is_some() {
                    self.last_synced = merged;
                }
                self.finish(RoundOutcome::Converged).await
            }

            (state, message) => {
                tracing::warn!(
                    peer = %self.peer,
                    state = state.name(),
                    message = ?message.message_type(),
                    "dropping message not valid in this state"
                );
                self.state = state;
                Ok(None)
            }
        }
    }

    /// Responder: compute our deficit against the initiator's filter and
    /// answer with our own filter.
    async fn respond_to_filter(&mut self, filter: Bytes) -> Result<Option<RoundReport>> {
        self.stats = Some(RoundStats::new(Role::Responder));
        let base = self.document.read().await?;

        let lines = match base.lines() {
            Ok(lines) => lines,
            Err(e) => {
                tracing::warn!(error = %e, "local file is not text, requesting the whole file");
                return self.request_entire_file().await;
            }
        };

        let deficit = match self.reconciler.compute_missing(&lines, &filter, None) {
            Ok(deficit) => deficit,
            Err(e) if e.is_payload_error() => {
                tracing::warn!(error = %e, "undecodable filter, requesting the whole file");
                return self.request_entire_file().await;
            }
            Err(e) => return Err(e.into()),
        };

        let reply = self.reconciler.build_filter(&lines)?;
        tracing::debug!(deficit = deficit.len(), lines = lines.len(), "answering filter");

        self.send(SyncMessage::FilterReply {
            filter: Bytes::from(reply.into_bytes()),
        })
        .await?;
        self.transition(SyncState::AwaitingMissingContent { base, deficit });
        Ok(None)
    }

    /// Initiator: send the lines the responder's filter lacks.
    async fn send_missing_content(
        &mut self,
        base: Snapshot,
        filter: Bytes,
    ) -> Result<Option<RoundReport>> {
        let lines = base.lines()?;

        let missing = match self.reconciler.compute_missing(&lines, &filter, None) {
            Ok(missing) => missing,
            Err(e) if e.is_payload_error() => {
                tracing::warn!(error = %e, "undecodable filter reply, sending the whole file");
                return self.send_entire_file().await;
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(stats) = &mut self.stats {
            stats.lines_sent = missing.len();
        }
        tracing::debug!(lines = missing.len(), bytes = missing.text_bytes(), "sending missing lines");

        self.send(SyncMessage::missing_content(&missing)).await?;
        self.transition(SyncState::AwaitingHash { base });
        Ok(None)
    }

    /// Responder: merge, write, and report the resulting hash.
    async fn apply_missing_content(
        &mut self,
        base: Snapshot,
        deficit: MissingContent,
        payload: Bytes,
    ) -> Result<Option<RoundReport>> {
        let incoming = match decode_incoming(&payload) {
            Ok(incoming) => incoming,
            Err(e) => {
                tracing::warn!(error = %e, "undecodable missing content, requesting the whole file");
                return self.request_entire_file().await;
            }
        };

        let current = self.document.read().await?;
        if current.hash() != base.hash() {
            return self.restart_with_local_edit(current).await;
        }

        let lines = base.lines()?;
        let merged = merge_lines(&lines, &deficit, &incoming);

        let hash = if merged.as_bytes() == base.bytes().as_ref() {
            base.hash()
        } else {
            self.document.replace(merged.as_bytes()).await?
        };

        if let Some(stats) = &mut self.stats {
            stats.lines_received = incoming.len();
            stats.lines_removed = deficit.len();
        }
        tracing::debug!(
            added = incoming.len(),
            removed = deficit.len(),
            hash = %hash,
            "merged peer lines"
        );

        self.send(SyncMessage::FileHash { hash }).await?;
        self.transition(SyncState::AwaitingVerdict { merged: Some(hash) });
        Ok(None)
    }

    /// Responder: the file was edited after we answered the filter, so the
    /// deficit no longer describes it. Leave the edit in place and open a
    /// round of our own; the peer abandons its round when it sees our
    /// request.
    async fn restart_with_local_edit(&mut self, current: Snapshot) -> Result<Option<RoundReport>> {
        tracing::info!(
            peer = %self.peer,
            hash = %current.hash(),
            "local file changed during round, sending our edit instead of merging"
        );
        self.pending_change = false;
        self.start_round(current).await?;
        Ok(None)
    }

    /// Initiator: compare the responder's hash with ours.
    async fn check_hash(
        &mut self,
        base: Snapshot,
        remote: ContentHash,
    ) -> Result<Option<RoundReport>> {
        match verify_convergence(&base.hash(), &remote) {
            ConvergenceResult::Converged => {
                self.send(SyncMessage::Verified).await?;
                self.last_synced = Some(base.hash());
                self.finish(RoundOutcome::Converged).await
            }
            ConvergenceResult::Diverged { local, remote } => {
                tracing::info!(
                    peer = %self.peer,
                    local = %local,
                    remote = %remote,
                    "hash mismatch, falling back to whole file"
                );
                self.send_entire_file().await
            }
        }
    }

    async fn send_entire_file(&mut self) -> Result<Option<RoundReport>> {
        let snapshot = self.document.read().await?;
        if snapshot.len() > limits::MAX_FILE_BYTES {
            return Err(SyncError::MessageTooLarge {
                size: snapshot.len(),
                max: limits::MAX_FILE_BYTES,
            });
        }

        self.send(SyncMessage::EntireFile {
            contents: snapshot.bytes().clone(),
        })
        .await?;
        self.last_synced = Some(snapshot.hash());
        self.finish(RoundOutcome::SentEntireFile).await
    }

    async fn accept_entire_file(&mut self, contents: Bytes) -> Result<Option<RoundReport>> {
        if self.stats.is_none() {
            self.stats = Some(RoundStats::new(Role::Responder));
        }

        let incoming = ContentHash::hash(&contents);
        let current = self.document.read().await?;
        let hash = if current.hash() == incoming {
            incoming
        } else {
            self.document.replace(&contents).await?
        };

        tracing::info!(peer = %self.peer, bytes = contents.len(), hash = %hash, "wrote peer's whole file");
        self.last_synced = Some(hash);
        self.finish(RoundOutcome::ReceivedEntireFile).await
    }

    async fn request_entire_file(&mut self) -> Result<Option<RoundReport>> {
        self.send(SyncMessage::FullFileRequest).await?;
        self.transition(SyncState::AwaitingVerdict { merged: None });
        Ok(None)
    }

    async fn send(&mut self, message: SyncMessage) -> Result<()> {
        tracing::debug!(
            peer = %self.peer,
            message = ?message.message_type(),
            bytes = message.payload_len(),
            "sending"
        );
        self.transport.send(&self.peer, message).await
    }

    fn transition(&mut self, state: SyncState) {
        self.state = state;
        self.deadline = Some(Instant::now() + self.config.round_timeout);
    }

    /// End the round and start the next one if a change is pending.
    async fn finish(&mut self, outcome: RoundOutcome) -> Result<Option<RoundReport>> {
        self.state = SyncState::Idle;
        self.deadline = None;

        let stats = self
            .stats
            .take()
            .unwrap_or_else(|| RoundStats::new(Role::Responder));
        let report = stats.finish(outcome);

        tracing::info!(
            peer = %self.peer,
            role = ?report.role,
            outcome = ?report.outcome,
            sent = report.lines_sent,
            received = report.lines_received,
            "sync round finished"
        );

        if std::mem::take(&mut self.pending_change) {
            if let Err(e) = self.on_local_change().await {
                tracing::warn!(error = %e, "could not start pending round");
            }
        }

        Ok(Some(report))
    }

    fn abort(&mut self, error: &SyncError) {
        if self.is_busy() || self.stats.is_some() {
            tracing::warn!(peer = %self.peer, error = %error, "sync round aborted");
        }
        self.state = SyncState::Idle;
        self.deadline = None;
        self.stats = None;
    }
}

/// Decode a MissingContent payload and check per-line limits.
fn decode_incoming(payload: &[u8]) -> std::result::Result<MissingContent, CoreError> {
    let incoming = decode_missing(payload, limits::MAX_MISSING_LINES)?;
    if let Some((_, text)) = incoming
        .iter()
        .find(|(_, text)| text.len() > limits::MAX_LINE_BYTES)
    {
        return Err(CoreError::LimitExceeded {
            what: "line length",
            size: text.len(),
            max: limits::MAX_LINE_BYTES,
        });
    }
    Ok(incoming)
}
