//! Message instances and their state machines.
//!
//! ```text
//! send: New -> Frozen -> Allocated -> Communicating -> Ready
//! recv: New -> Communicating -> Ready
//! ```
//!
//! Instances live in per-phase arenas inside the [`LowComm`](crate::LowComm)
//! context. Handles carry the phase they were created in, so a handle kept
//! past `cleanup` is caught instead of silently naming a new message.

use std::fmt;
use std::ops::Range;

use ddd_core::{Rank, Tag};
use ddd_transport::Lease;

use crate::layout::Layout;
use crate::registry::MsgType;

/// Handle of a send message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SendMsg {
    pub(crate) index: u32,
    pub(crate) phase: u32,
}

/// Handle of a receive message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecvMsg {
    pub(crate) index: u32,
    pub(crate) phase: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    New,
    Frozen,
    Allocated,
    Communicating,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvState {
    New,
    Communicating,
    Ready,
}

impl fmt::Display for SendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for RecvState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Per-instance size of one component, fixed once the message is frozen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ComponentSize {
    pub bytes: usize,
    pub entries: usize,
}

pub(crate) struct SendMessage<R> {
    pub msg_type: MsgType,
    pub dest: Rank,
    pub tag: Tag,
    pub state: SendState,
    pub sizes: Vec<ComponentSize>,
    pub layout: Option<Layout>,
    /// Filled by the caller while Allocated; handed to the transport on send.
    pub buffer: Option<Vec<u8>>,
    /// Held until the transport confirms delivery.
    pub lease: Option<Lease>,
    pub request: Option<R>,
}

impl<R> SendMessage<R> {
    pub fn new(msg_type: MsgType, dest: Rank, tag: Tag, components: usize) -> Self {
        Self {
            msg_type,
            dest,
            tag,
            state: SendState::New,
            sizes: vec![ComponentSize::default(); components],
            layout: None,
            buffer: None,
            lease: None,
            request: None,
        }
    }

    pub fn expect(&self, state: SendState, op: &str) {
        assert!(
            self.state == state,
            "{op}: send message to rank {} is {}, expected {}",
            self.dest,
            self.state,
            state
        );
    }

    /// New -> Frozen.
    pub fn freeze(&mut self) {
        self.expect(SendState::New, "freeze");
        let sizes: Vec<_> = self.sizes.iter().map(|s| (s.bytes, s.entries)).collect();
        self.layout = Some(Layout::freeze(&sizes));
        self.state = SendState::Frozen;
    }

    /// Frozen layout; only valid past New.
    pub fn layout(&self) -> &Layout {
        self.layout
            .as_ref()
            .unwrap_or_else(|| panic!("send message to rank {} is not frozen", self.dest))
    }

    /// Communicating -> Ready, releasing the buffer.
    pub fn complete(&mut self) {
        self.expect(SendState::Communicating, "complete");
        self.request = None;
        self.lease = None;
        self.state = SendState::Ready;
    }
}

pub(crate) struct RecvMessage<R> {
    pub msg_type: MsgType,
    pub src: Rank,
    pub tag: Tag,
    pub state: RecvState,
    /// Slice of the phase's shared receive buffer.
    pub range: Range<usize>,
    pub layout: Option<Layout>,
    pub request: Option<R>,
}

impl<R> RecvMessage<R> {
    pub fn new(msg_type: MsgType, src: Rank, tag: Tag, range: Range<usize>) -> Self {
        Self {
            msg_type,
            src,
            tag,
            state: RecvState::New,
            range,
            layout: None,
            request: None,
        }
    }

    pub fn expect(&self, state: RecvState, op: &str) {
        assert!(
            self.state == state,
            "{op}: receive message from rank {} is {}, expected {}",
            self.src,
            self.state,
            state
        );
    }

    pub fn layout(&self) -> &Layout {
        self.expect(RecvState::Ready, "layout");
        self.layout
            .as_ref()
            .unwrap_or_else(|| panic!("receive message from rank {} has no layout", self.src))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freeze_computes_layout() {
        let mut msg: SendMessage<()> = SendMessage::new(MsgType(0), Rank(1), Tag(0), 2);
        msg.sizes[0] = ComponentSize {
            bytes: 80,
            entries: 10,
        };
        msg.freeze();
        assert_eq!(msg.state, SendState::Frozen);
        assert_eq!(msg.layout().slot(0).size, 80);
        assert_eq!(msg.layout().slot(1).size, 0);
    }

    #[test]
    #[should_panic(expected = "freeze: send message to rank 1 is Frozen, expected New")]
    fn test_freeze_twice_panics() {
        let mut msg: SendMessage<()> = SendMessage::new(MsgType(0), Rank(1), Tag(0), 0);
        msg.freeze();
        msg.freeze();
    }

    #[test]
    #[should_panic(expected = "is New, expected Communicating")]
    fn test_complete_requires_communicating() {
        let mut msg: SendMessage<()> = SendMessage::new(MsgType(0), Rank(1), Tag(0), 0);
        msg.complete();
    }

    #[test]
    #[should_panic(expected = "layout: receive message from rank 2 is New")]
    fn test_recv_layout_requires_ready() {
        let msg: RecvMessage<()> = RecvMessage::new(MsgType(0), Rank(2), Tag(0), 0..8);
        msg.layout();
    }
}
