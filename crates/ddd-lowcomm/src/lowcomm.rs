//! The LowComm context.
//!
//! One [`LowComm`] per rank owns the message-type registry, the send and
//! receive queues of the current phase, and the phase's shared receive
//! buffer. A phase runs:
//!
//! ```text
//! new_send_msg / set_*  ->  prepare_send / fill  ->  connect  ->  send
//!     ->  communicate  ->  read received messages  ->  cleanup
//! ```
//!
//! `connect`, `abort` and `communicate` are collective. A rank that cannot
//! take part in a phase calls `abort` where it would have called `connect`;
//! every rank then sees the same exception and runs `cleanup`.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::slice::ChunksExact;
use std::sync::Arc;

use bytes::Bytes;

use ddd_core::{ExceptionCode, Rank, Tag};
use ddd_notify::{Announcement, ExpectedRecv, Notifier};
use ddd_transport::{agree_exception, Lease, MemClass, MemoryPool, Transport};

use crate::config::LowCommConfig;
use crate::error::{LayoutError, LowCommError, Result};
use crate::layout::Layout;
use crate::message::{
    ComponentSize, RecvMessage, RecvMsg, RecvState, SendMessage, SendMsg, SendState,
};
use crate::registry::{Comp, ComponentKind, MessageType, MsgType, TypeRegistry};
use crate::stats::PhaseStats;

/// Progress of a phase after one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommStatus {
    pub pending_sends: usize,
    pub pending_recvs: usize,
}

impl CommStatus {
    pub fn is_done(&self) -> bool {
        self.pending_sends == 0 && self.pending_recvs == 0
    }
}

fn check_entries(ty: &MessageType, layout: &Layout) -> std::result::Result<(), LayoutError> {
    for (index, (desc, slot)) in ty.components().iter().zip(layout.slots()).enumerate() {
        let entry_size = match desc.kind {
            ComponentKind::Table { entry_size } => entry_size,
            ComponentKind::Chunk => 1,
        };
        if slot.entries * entry_size != slot.size {
            return Err(LayoutError::EntryMismatch {
                index,
                size: slot.size,
                entries: slot.entries,
                entry_size,
            });
        }
    }
    Ok(())
}

/// Typed, asynchronous point-to-point messaging for one rank.
pub struct LowComm<T: Transport> {
    transport: T,
    pool: Arc<dyn MemoryPool>,
    config: LowCommConfig,
    registry: TypeRegistry,
    /// Generation of the current phase; bumped by `cleanup`.
    phase: u32,
    connected: bool,
    /// Sequence number of the next send per destination.
    next_tag: HashMap<Rank, u32>,
    sends: Vec<SendMessage<T::SendRequest>>,
    recvs: Vec<RecvMessage<T::RecvRequest>>,
    recv_buffer: Vec<u8>,
    recv_lease: Option<Lease>,
    stats: PhaseStats,
}

impl<T: Transport> LowComm<T> {
    /// Create a context over `transport`, allocating from `pool`.
    pub fn new(transport: T, pool: Arc<dyn MemoryPool>, config: LowCommConfig) -> Self {
        let registry = TypeRegistry::new(config.max_msg_types);
        Self {
            transport,
            pool,
            config,
            registry,
            phase: 0,
            connected: false,
            next_tag: HashMap::new(),
            sends: Vec::new(),
            recvs: Vec::new(),
            recv_buffer: Vec::new(),
            recv_lease: None,
            stats: PhaseStats::default(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn pool(&self) -> &Arc<dyn MemoryPool> {
        &self.pool
    }

    pub fn config(&self) -> &LowCommConfig {
        &self.config
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The local rank.
    pub fn rank(&self) -> Rank {
        self.transport.rank()
    }

    /// Counters of the current phase.
    pub fn stats(&self) -> &PhaseStats {
        &self.stats
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a message type. Components are added with
    /// [`new_table`](Self::new_table) and [`new_chunk`](Self::new_chunk).
    pub fn new_msg_type(&mut self, name: &str) -> MsgType {
        self.registry.define(&self.pool, name)
    }

    /// Add a table of `entry_size`-byte entries to a message type.
    pub fn new_table(&mut self, msg_type: MsgType, name: &str, entry_size: usize) -> Comp {
        self.registry
            .add_component(msg_type, name, ComponentKind::Table { entry_size })
    }

    /// Add a raw byte chunk to a message type.
    pub fn new_chunk(&mut self, msg_type: MsgType, name: &str) -> Comp {
        self.registry
            .add_component(msg_type, name, ComponentKind::Chunk)
    }

    fn kind_of(&self, msg_type: MsgType, comp: Comp) -> ComponentKind {
        assert!(
            comp.msg_type == msg_type,
            "component {comp:?} does not belong to message type {:?}",
            self.registry.get(msg_type).name()
        );
        self.registry.component(comp).kind
    }

    fn entry_size(&self, msg_type: MsgType, comp: Comp) -> usize {
        match self.kind_of(msg_type, comp) {
            ComponentKind::Table { entry_size } => entry_size,
            ComponentKind::Chunk => panic!("component {comp:?} is a chunk, not a table"),
        }
    }

    fn expect_chunk(&self, msg_type: MsgType, comp: Comp) {
        if let ComponentKind::Table { .. } = self.kind_of(msg_type, comp) {
            panic!("component {comp:?} is a table, not a chunk");
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Send Side
    // ─────────────────────────────────────────────────────────────────────────

    fn send_index(&self, msg: SendMsg) -> usize {
        assert!(
            msg.phase == self.phase,
            "stale send handle from phase {} (current phase {})",
            msg.phase,
            self.phase
        );
        let index = msg.index as usize;
        assert!(index < self.sends.len(), "unknown send handle {msg:?}");
        index
    }

    fn send_msg(&self, msg: SendMsg) -> &SendMessage<T::SendRequest> {
        &self.sends[self.send_index(msg)]
    }

    fn send_msg_mut(&mut self, msg: SendMsg) -> &mut SendMessage<T::SendRequest> {
        let index = self.send_index(msg);
        &mut self.sends[index]
    }

    /// Create a send message of `msg_type` to `dest`, in state New.
    ///
    /// # Panics
    /// If the current phase is already connected.
    pub fn new_send_msg(&mut self, msg_type: MsgType, dest: Rank) -> SendMsg {
        assert!(
            !self.connected,
            "new_send_msg: phase already connected; call cleanup first"
        );
        let components = self.registry.seal(msg_type).components().len();

        let counter = self.next_tag.entry(dest).or_insert(0);
        let tag = Tag::phased(self.phase, *counter);
        *counter += 1;

        self.sends
            .push(SendMessage::new(msg_type, dest, tag, components));
        SendMsg {
            index: (self.sends.len() - 1) as u32,
            phase: self.phase,
        }
    }

    /// Set the number of entries of a table component. Only legal in New.
    pub fn set_table_len(&mut self, msg: SendMsg, comp: Comp, entries: usize) {
        let entry_size = self.entry_size(self.send_msg(msg).msg_type, comp);
        let m = self.send_msg_mut(msg);
        m.expect(SendState::New, "set_table_len");
        m.sizes[comp.index()] = ComponentSize {
            bytes: entries * entry_size,
            entries,
        };
    }

    /// Set the byte size of a chunk component. Only legal in New.
    pub fn set_chunk_size(&mut self, msg: SendMsg, comp: Comp, bytes: usize) {
        self.expect_chunk(self.send_msg(msg).msg_type, comp);
        let m = self.send_msg_mut(msg);
        m.expect(SendState::New, "set_chunk_size");
        m.sizes[comp.index()] = ComponentSize {
            bytes,
            entries: bytes,
        };
    }

    /// Freeze the layout and allocate the buffer: New/Frozen -> Allocated.
    ///
    /// When the pool is exhausted, completed sends are reclaimed once and the
    /// allocation is retried. Fails with [`LowCommError::OutOfMemory`] if
    /// nothing could be reclaimed or the retry fails too; the message then
    /// stays Frozen.
    pub fn prepare_send(&mut self, msg: SendMsg) -> Result<()> {
        let index = self.send_index(msg);
        if self.sends[index].state == SendState::New {
            self.sends[index].freeze();
        }
        self.sends[index].expect(SendState::Frozen, "prepare_send");
        self.allocate(index)
    }

    fn allocate(&mut self, index: usize) -> Result<()> {
        let needed = self.sends[index].layout().total();

        let (lease, mut buffer) = match Lease::buffer(&self.pool, MemClass::Temporary, needed) {
            Some(pair) => pair,
            None => {
                let reclaimed = self.reclaim()?;
                if reclaimed == 0 {
                    tracing::warn!(
                        rank = self.rank().0,
                        needed,
                        "lowcomm: no memory left to reclaim"
                    );
                    return Err(LowCommError::OutOfMemory { needed });
                }
                Lease::buffer(&self.pool, MemClass::Temporary, needed)
                    .ok_or(LowCommError::OutOfMemory { needed })?
            }
        };

        let msg = &mut self.sends[index];
        msg.layout().write_header(self.config.magic, &mut buffer);
        msg.buffer = Some(buffer);
        msg.lease = Some(lease);
        msg.state = SendState::Allocated;
        Ok(())
    }

    /// Poll outstanding sends once and free the buffers of completed ones.
    fn reclaim(&mut self) -> Result<usize> {
        let reclaimed = self.poll_sends()?;
        self.stats.reclaim_passes += 1;
        self.stats.buffers_reclaimed += reclaimed;
        tracing::debug!(rank = self.rank().0, reclaimed, "lowcomm: reclaim pass");
        Ok(reclaimed)
    }

    fn poll_sends(&mut self) -> Result<usize> {
        let mut completed = 0;
        for msg in self
            .sends
            .iter_mut()
            .filter(|m| m.state == SendState::Communicating)
        {
            let done = match msg.request.as_mut() {
                Some(request) => self.transport.test_send(request)?,
                None => false,
            };
            if done {
                msg.complete();
                completed += 1;
            }
        }
        Ok(completed)
    }

    fn send_payload_mut(&mut self, msg: SendMsg, comp: Comp, op: &str) -> &mut [u8] {
        let m = self.send_msg_mut(msg);
        m.expect(SendState::Allocated, op);
        let range = m.layout().slot(comp.index()).range();
        match m.buffer.as_mut() {
            Some(buffer) => &mut buffer[range],
            None => panic!("{op}: allocated send message has no buffer"),
        }
    }

    /// Payload of a table component, for filling. Only legal in Allocated.
    pub fn table_mut(&mut self, msg: SendMsg, comp: Comp) -> &mut [u8] {
        self.entry_size(self.send_msg(msg).msg_type, comp);
        self.send_payload_mut(msg, comp, "table_mut")
    }

    /// Payload of a chunk component, for filling. Only legal in Allocated.
    pub fn chunk_mut(&mut self, msg: SendMsg, comp: Comp) -> &mut [u8] {
        self.expect_chunk(self.send_msg(msg).msg_type, comp);
        self.send_payload_mut(msg, comp, "chunk_mut")
    }

    /// Hand the buffer to the transport: Allocated -> Communicating.
    pub fn send(&mut self, msg: SendMsg) -> Result<()> {
        let index = self.send_index(msg);
        let m = &mut self.sends[index];
        m.expect(SendState::Allocated, "send");
        let buffer = match m.buffer.take() {
            Some(buffer) => buffer,
            None => panic!("send: allocated send message has no buffer"),
        };
        let bytes = buffer.len();

        let request = self.transport.isend(m.dest, m.tag, Bytes::from(buffer))?;
        m.request = Some(request);
        m.state = SendState::Communicating;

        self.stats.msgs_sent += 1;
        self.stats.bytes_sent += bytes;
        Ok(())
    }

    pub fn send_state(&self, msg: SendMsg) -> SendState {
        self.send_msg(msg).state
    }

    /// Destination rank of a send message.
    pub fn send_dest(&self, msg: SendMsg) -> Rank {
        self.send_msg(msg).dest
    }

    /// Total buffer size of a send message. Only legal once frozen.
    pub fn send_size(&self, msg: SendMsg) -> usize {
        self.send_msg(msg).layout().total()
    }

    /// Send handles of the current phase, in creation order.
    pub fn send_msgs(&self) -> Vec<SendMsg> {
        (0..self.sends.len() as u32)
            .map(|index| SendMsg {
                index,
                phase: self.phase,
            })
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Phase Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Discover the receive set and post the receives. Collective.
    ///
    /// Send messages still in New are frozen. Returns the number of messages
    /// this rank will receive, all of which are typed `msg_type`.
    ///
    /// Failures are agreed on by every rank. A rank that could not set up its
    /// part of the phase gets [`LowCommError::Withdrawn`] with the local
    /// cause; every other rank gets [`LowCommError::Exception`] with the same
    /// code. Only transport errors leave the ranks out of step.
    pub async fn connect(&mut self, msg_type: MsgType) -> Result<usize> {
        assert!(
            !self.connected,
            "connect: phase already connected; call cleanup first"
        );
        self.connected = true;
        self.registry.get(msg_type);

        for msg in self.sends.iter_mut().filter(|m| m.state == SendState::New) {
            msg.freeze();
        }

        let me = self.rank();
        let size = self.transport.size();
        let mut exception = None;
        let mut dests: Vec<Rank> = self.sends.iter().map(|m| m.dest).collect();
        dests.sort();
        dests.dedup();
        for dest in dests.into_iter().filter(|d| *d != me && d.index() < size) {
            if let Err(e) = self.transport.get_channel(dest) {
                tracing::warn!(
                    rank = me.0,
                    dest = dest.0,
                    error = %e,
                    "lowcomm: channel setup failed"
                );
                exception = Some(ExceptionCode::CHANNEL_UNAVAILABLE);
                break;
            }
        }

        let announcements: Vec<Announcement> = self
            .sends
            .iter()
            .map(|m| Announcement {
                dest: m.dest,
                size: m.layout().total() as u64,
            })
            .collect();

        let notifier = Notifier::new(&self.transport, &self.pool, &self.config.notify);
        let expected = match exception {
            Some(code) => return Err(notifier.notify_exception(code).await.into()),
            None => notifier.notify(&announcements).await?,
        };

        let posted = self.post_recvs(msg_type, &expected);
        let local = posted.as_ref().err().map(LowCommError::exception);
        if let Some(code) = agree_exception(&self.transport, local).await? {
            tracing::warn!(rank = me.0, %code, "lowcomm: phase setup failed");
            return Err(match posted {
                Err(source) => LowCommError::Withdrawn {
                    code,
                    source: Box::new(source),
                },
                Ok(()) => LowCommError::Exception(code),
            });
        }

        tracing::debug!(
            rank = me.0,
            sends = self.sends.len(),
            recvs = self.recvs.len(),
            recv_bytes = self.recv_buffer.len(),
            "lowcomm: connected"
        );
        Ok(expected.len())
    }

    /// Allocate the shared receive buffer and post one receive per expected
    /// message.
    fn post_recvs(&mut self, msg_type: MsgType, expected: &[ExpectedRecv]) -> Result<()> {
        let total: usize = expected.iter().map(|e| e.size as usize).sum();
        let Some((lease, buffer)) = Lease::buffer(&self.pool, MemClass::Temporary, total) else {
            tracing::warn!(
                rank = self.rank().0,
                total,
                "lowcomm: cannot allocate receive buffer"
            );
            return Err(LowCommError::RecvBufferExhausted { needed: total });
        };
        self.recv_buffer = buffer;
        self.recv_lease = Some(lease);

        let mut seqs: HashMap<Rank, u32> = HashMap::new();
        let mut offset = 0;
        for e in expected {
            let len = e.size as usize;
            let counter = seqs.entry(e.src).or_insert(0);
            let tag = Tag::phased(self.phase, *counter);
            *counter += 1;

            self.transport.get_channel(e.src)?;
            let mut msg = RecvMessage::new(msg_type, e.src, tag, offset..offset + len);
            msg.request = Some(self.transport.irecv(e.src, tag, len)?);
            msg.state = RecvState::Communicating;
            self.recvs.push(msg);
            offset += len;
        }
        Ok(())
    }

    /// Withdraw from the phase with `code`. Collective counterpart of
    /// [`connect`](Self::connect).
    ///
    /// Returns the exception every rank of the phase observes.
    pub async fn abort(&mut self, code: ExceptionCode) -> ExceptionCode {
        assert!(
            !self.connected,
            "abort: phase already connected; call cleanup first"
        );
        self.connected = true;
        tracing::warn!(rank = self.rank().0, %code, "lowcomm: aborting phase");

        let notifier = Notifier::new(&self.transport, &self.pool, &self.config.notify);
        notifier.notify_exception(code).await.exception()
    }

    /// Poll every outstanding send and receive once.
    pub fn poll_communicate(&mut self) -> Result<CommStatus> {
        self.poll_sends()?;
        self.poll_recvs()?;

        Ok(CommStatus {
            pending_sends: self
                .sends
                .iter()
                .filter(|m| m.state == SendState::Communicating)
                .count(),
            pending_recvs: self
                .recvs
                .iter()
                .filter(|m| m.state == RecvState::Communicating)
                .count(),
        })
    }

    fn poll_recvs(&mut self) -> Result<()> {
        for msg in self
            .recvs
            .iter_mut()
            .filter(|m| m.state == RecvState::Communicating)
        {
            let Some(request) = msg.request.as_mut() else {
                continue;
            };
            let Some(payload) = self.transport.test_recv(request)? else {
                continue;
            };

            let slot = &mut self.recv_buffer[msg.range.clone()];
            if payload.len() != slot.len() {
                return Err(LowCommError::Protocol {
                    src: msg.src,
                    source: LayoutError::Truncated(payload.len()),
                });
            }
            slot.copy_from_slice(&payload);

            let ty = self.registry.get(msg.msg_type);
            let protocol = |source| LowCommError::Protocol {
                src: msg.src,
                source,
            };
            let layout =
                Layout::parse(slot, self.config.magic, ty.components().len()).map_err(protocol)?;
            check_entries(ty, &layout).map_err(protocol)?;

            msg.layout = Some(layout);
            msg.request = None;
            msg.state = RecvState::Ready;
            self.stats.msgs_received += 1;
            self.stats.bytes_received += payload.len();
        }
        Ok(())
    }

    /// Drive the phase to completion. Collective.
    ///
    /// Polls sends and receives until both queues are complete, yielding to
    /// the executor between polls. Returns the received messages.
    ///
    /// # Panics
    /// If the phase is not connected, or a send message was announced but
    /// never sent.
    pub async fn communicate(&mut self) -> Result<Vec<RecvMsg>> {
        assert!(self.connected, "communicate: phase is not connected");
        if let Some(m) = self
            .sends
            .iter()
            .find(|m| m.state != SendState::Communicating && m.state != SendState::Ready)
        {
            panic!(
                "communicate: send message to rank {} was announced but is {}",
                m.dest, m.state
            );
        }

        loop {
            let status = self.poll_communicate()?;
            if status.is_done() {
                break;
            }
            tokio::task::yield_now().await;
        }
        Ok(self.recv_msgs())
    }

    /// Release every message and the receive buffer of the phase.
    ///
    /// Handles of the finished phase become invalid.
    pub fn cleanup(&mut self) {
        tracing::debug!(
            rank = self.rank().0,
            phase = self.phase,
            msgs_sent = self.stats.msgs_sent,
            bytes_sent = self.stats.bytes_sent,
            msgs_received = self.stats.msgs_received,
            bytes_received = self.stats.bytes_received,
            reclaim_passes = self.stats.reclaim_passes,
            "lowcomm: phase cleanup"
        );
        self.sends.clear();
        self.recvs.clear();
        self.recv_buffer = Vec::new();
        self.recv_lease = None;
        self.next_tag.clear();
        self.connected = false;
        self.phase = self.phase.wrapping_add(1);
        self.stats = PhaseStats::default();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Receive Side
    // ─────────────────────────────────────────────────────────────────────────

    fn recv_msg(&self, msg: RecvMsg) -> &RecvMessage<T::RecvRequest> {
        assert!(
            msg.phase == self.phase,
            "stale receive handle from phase {} (current phase {})",
            msg.phase,
            self.phase
        );
        self.recvs
            .get(msg.index as usize)
            .unwrap_or_else(|| panic!("unknown receive handle {msg:?}"))
    }

    fn recv_payload(&self, msg: RecvMsg, comp: Comp) -> &[u8] {
        let m = self.recv_msg(msg);
        let slot = m.layout().slot(comp.index());
        let start = m.range.start + slot.offset;
        &self.recv_buffer[start..start + slot.size]
    }

    /// Receive handles of the current phase, ordered by source rank.
    pub fn recv_msgs(&self) -> Vec<RecvMsg> {
        (0..self.recvs.len() as u32)
            .map(|index| RecvMsg {
                index,
                phase: self.phase,
            })
            .collect()
    }

    pub fn recv_state(&self, msg: RecvMsg) -> RecvState {
        self.recv_msg(msg).state
    }

    /// Source rank of a received message.
    pub fn recv_src(&self, msg: RecvMsg) -> Rank {
        self.recv_msg(msg).src
    }

    pub fn recv_type(&self, msg: RecvMsg) -> MsgType {
        self.recv_msg(msg).msg_type
    }

    /// Total buffer size of a received message.
    pub fn recv_size(&self, msg: RecvMsg) -> usize {
        self.recv_msg(msg).range.len()
    }

    /// Number of entries in a received table. Only legal in Ready.
    pub fn table_len(&self, msg: RecvMsg, comp: Comp) -> usize {
        self.entry_size(self.recv_msg(msg).msg_type, comp);
        self.recv_msg(msg).layout().slot(comp.index()).entries
    }

    /// Raw bytes of a received table. Only legal in Ready.
    pub fn table(&self, msg: RecvMsg, comp: Comp) -> &[u8] {
        self.entry_size(self.recv_msg(msg).msg_type, comp);
        self.recv_payload(msg, comp)
    }

    /// Entries of a received table, one slice per entry.
    pub fn table_entries(&self, msg: RecvMsg, comp: Comp) -> ChunksExact<'_, u8> {
        let entry_size = self.entry_size(self.recv_msg(msg).msg_type, comp);
        self.recv_payload(msg, comp).chunks_exact(entry_size)
    }

    /// Bytes of a received chunk. Only legal in Ready.
    pub fn chunk(&self, msg: RecvMsg, comp: Comp) -> &[u8] {
        self.expect_chunk(self.recv_msg(msg).msg_type, comp);
        self.recv_payload(msg, comp)
    }

    pub fn chunk_size(&self, msg: RecvMsg, comp: Comp) -> usize {
        self.chunk(msg, comp).len()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Diagnostics
    // ─────────────────────────────────────────────────────────────────────────

    fn header_hex(buf: &[u8]) -> String {
        hex::encode(&buf[..buf.len().min(8)])
    }

    /// One line per send message of the current phase.
    pub fn dump_send_queue(&self) -> String {
        let mut out = String::new();
        for (i, m) in self.sends.iter().enumerate() {
            let size = m.layout.as_ref().map(Layout::total);
            let header = m.buffer.as_deref().map(Self::header_hex);
            let _ = writeln!(
                out,
                "send {i:3} -> rank {:4} tag {:3} type {:<12} state {:<13} size {:>8} header {}",
                m.dest,
                m.tag.seq(),
                self.registry.get(m.msg_type).name(),
                m.state.to_string(),
                size.map_or_else(|| "-".to_owned(), |s| s.to_string()),
                header.unwrap_or_else(|| "-".to_owned()),
            );
        }
        tracing::trace!(rank = self.rank().0, "send queue:\n{out}");
        out
    }

    /// One line per receive message of the current phase.
    pub fn dump_recv_queue(&self) -> String {
        let mut out = String::new();
        for (i, m) in self.recvs.iter().enumerate() {
            let header = match m.state {
                RecvState::Ready => Self::header_hex(&self.recv_buffer[m.range.clone()]),
                _ => "-".to_owned(),
            };
            let _ = writeln!(
                out,
                "recv {i:3} <- rank {:4} tag {:3} type {:<12} state {:<13} size {:>8} header {}",
                m.src,
                m.tag.seq(),
                self.registry.get(m.msg_type).name(),
                m.state.to_string(),
                m.range.len(),
                header,
            );
        }
        tracing::trace!(rank = self.rank().0, "recv queue:\n{out}");
        out
    }
}
