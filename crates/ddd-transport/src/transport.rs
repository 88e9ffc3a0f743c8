//! Transport abstraction.
//!
//! The transport moves opaque byte payloads between ranks. Point-to-point
//! traffic is non-blocking: a send or receive is posted, then tested with
//! single-shot completion checks driven by the caller. Tree collectives
//! (Concentrate towards the root, Spread away from it) are `async` and
//! complete when the peer has delivered.

use async_trait::async_trait;
use bytes::Bytes;

use ddd_core::{Rank, Tag};

use crate::error::Result;
use crate::topology::TreeTopology;

/// Transport trait for DDD communication.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Handle of a posted send.
    type SendRequest: Send;
    /// Handle of a posted receive.
    type RecvRequest: Send;

    /// The local rank.
    fn rank(&self) -> Rank;

    /// Number of ranks in the run.
    fn size(&self) -> usize;

    /// The spanning tree used by Concentrate and Spread.
    fn tree(&self) -> &TreeTopology;

    /// Make sure a point-to-point channel to `peer` exists.
    ///
    /// Channels are established lazily, once a partner has been discovered.
    fn get_channel(&self, peer: Rank) -> Result<()>;

    /// Post a send of `payload` to `dest`, matched on `tag`.
    fn isend(&self, dest: Rank, tag: Tag, payload: Bytes) -> Result<Self::SendRequest>;

    /// Single-shot completion check of a send.
    ///
    /// Returns true once the receiver has taken the payload.
    fn test_send(&self, request: &mut Self::SendRequest) -> Result<bool>;

    /// Post a receive of exactly `len` bytes from `src`, matched on `tag`.
    fn irecv(&self, src: Rank, tag: Tag, len: usize) -> Result<Self::RecvRequest>;

    /// Single-shot completion check of a receive.
    ///
    /// Returns the payload the first time the receive is found complete and
    /// `None` before that. Testing a request again after it returned its
    /// payload yields `None`.
    fn test_recv(&self, request: &mut Self::RecvRequest) -> Result<Option<Bytes>>;

    /// Receive the Concentrate payload of a child.
    async fn concentrate_recv(&self, child: Rank) -> Result<Bytes>;

    /// Send a Concentrate payload to the parent.
    async fn concentrate_send(&self, payload: Bytes) -> Result<()>;

    /// Receive the Spread payload from the parent.
    async fn spread_recv(&self) -> Result<Bytes>;

    /// Send a Spread payload to a child.
    async fn spread_send(&self, child: Rank, payload: Bytes) -> Result<()>;
}

/// In-process reference transport.
///
/// All ranks of a run share one [`MemoryNetwork`](memory::MemoryNetwork);
/// each rank drives its own [`MemoryTransport`](memory::MemoryTransport).
/// A send completes when the receiver takes the payload out of its mailbox,
/// which makes pending sends observable for the memory-pressure tests.
pub mod memory {
    use super::*;
    use crate::error::TransportError;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex, PoisonError};
    use tokio::sync::Notify;

    /// Traffic class; each has its own matching space.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Lane {
        Data,
        Concentrate,
        Spread,
    }

    /// (source rank, lane, tag)
    type MatchKey = (Rank, Lane, Tag);

    #[derive(Debug)]
    struct Envelope {
        payload: Bytes,
        taken: Arc<AtomicBool>,
    }

    #[derive(Debug, Default)]
    struct Mailbox {
        queues: Mutex<HashMap<MatchKey, VecDeque<Envelope>>>,
        arrived: Notify,
    }

    impl Mailbox {
        fn take(&self, key: &MatchKey) -> Option<Envelope> {
            let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
            let queue = queues.get_mut(key)?;
            let envelope = queue.pop_front();
            if queue.is_empty() {
                queues.remove(key);
            }
            envelope
        }

        fn put(&self, key: MatchKey, envelope: Envelope) {
            self.queues
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(key)
                .or_default()
                .push_back(envelope);
            self.arrived.notify_one();
        }
    }

    /// Shared state of an in-process run.
    #[derive(Debug)]
    pub struct MemoryNetwork {
        mailboxes: Vec<Mailbox>,
        arity: usize,
        /// Directed (from, to) pairs whose channel setup fails.
        denied: Mutex<HashSet<(Rank, Rank)>>,
    }

    impl MemoryNetwork {
        /// Create a run of `size` ranks over a binary spanning tree.
        pub fn new(size: usize) -> Arc<Self> {
            Self::with_arity(size, 2)
        }

        /// Create a run of `size` ranks over a tree with the given arity.
        pub fn with_arity(size: usize, arity: usize) -> Arc<Self> {
            assert!(size > 0, "a run needs at least one rank");
            Arc::new(Self {
                mailboxes: (0..size).map(|_| Mailbox::default()).collect(),
                arity,
                denied: Mutex::new(HashSet::new()),
            })
        }

        /// Number of ranks.
        pub fn size(&self) -> usize {
            self.mailboxes.len()
        }

        /// Create the transport endpoint of `rank`.
        pub fn transport(self: &Arc<Self>, rank: Rank) -> MemoryTransport {
            MemoryTransport {
                rank,
                tree: TreeTopology::with_arity(rank, self.size(), self.arity),
                network: Arc::clone(self),
            }
        }

        /// Create the endpoints of all ranks, in rank order.
        pub fn transports(self: &Arc<Self>) -> Vec<MemoryTransport> {
            Rank::all(self.size()).map(|r| self.transport(r)).collect()
        }

        /// Make channel setup from `from` to `to` fail.
        pub fn deny_channel(&self, from: Rank, to: Rank) {
            self.denied.lock().unwrap_or_else(PoisonError::into_inner).insert((from, to));
        }

        fn mailbox(&self, rank: Rank) -> Result<&Mailbox> {
            self.mailboxes
                .get(rank.index())
                .ok_or(TransportError::RankOutOfRange {
                    rank,
                    size: self.size(),
                })
        }
    }

    /// Handle of a posted in-memory send.
    #[derive(Debug)]
    pub struct MemorySendRequest {
        taken: Arc<AtomicBool>,
    }

    /// Handle of a posted in-memory receive.
    #[derive(Debug)]
    pub struct MemoryRecvRequest {
        src: Rank,
        tag: Tag,
        len: usize,
        done: bool,
    }

    /// One rank's endpoint of a [`MemoryNetwork`].
    #[derive(Debug)]
    pub struct MemoryTransport {
        rank: Rank,
        tree: TreeTopology,
        network: Arc<MemoryNetwork>,
    }

    impl MemoryTransport {
        fn post(
            &self,
            dest: Rank,
            lane: Lane,
            tag: Tag,
            payload: Bytes,
        ) -> Result<Arc<AtomicBool>> {
            let taken = Arc::new(AtomicBool::new(false));
            self.network.mailbox(dest)?.put(
                (self.rank, lane, tag),
                Envelope {
                    payload,
                    taken: Arc::clone(&taken),
                },
            );
            Ok(taken)
        }

        async fn wait(&self, src: Rank, lane: Lane) -> Result<Bytes> {
            let mailbox = self.network.mailbox(self.rank)?;
            let key = (src, lane, Tag(0));
            loop {
                if let Some(envelope) = mailbox.take(&key) {
                    envelope.taken.store(true, Ordering::Release);
                    return Ok(envelope.payload);
                }
                mailbox.arrived.notified().await;
            }
        }

        fn check_child(&self, child: Rank) -> Result<()> {
            if self.tree.children().contains(&child) {
                Ok(())
            } else {
                Err(TransportError::NotAChild {
                    rank: self.rank,
                    child,
                })
            }
        }
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        type SendRequest = MemorySendRequest;
        type RecvRequest = MemoryRecvRequest;

        fn rank(&self) -> Rank {
            self.rank
        }

        fn size(&self) -> usize {
            self.network.size()
        }

        fn tree(&self) -> &TreeTopology {
            &self.tree
        }

        fn get_channel(&self, peer: Rank) -> Result<()> {
            self.network.mailbox(peer)?;
            let denied = self.network.denied.lock().unwrap_or_else(PoisonError::into_inner);
            if denied.contains(&(self.rank, peer)) || denied.contains(&(peer, self.rank)) {
                return Err(TransportError::ChannelUnavailable {
                    from: self.rank,
                    to: peer,
                });
            }
            Ok(())
        }

        fn isend(&self, dest: Rank, tag: Tag, payload: Bytes) -> Result<MemorySendRequest> {
            let taken = self.post(dest, Lane::Data, tag, payload)?;
            Ok(MemorySendRequest { taken })
        }

        fn test_send(&self, request: &mut MemorySendRequest) -> Result<bool> {
            Ok(request.taken.load(Ordering::Acquire))
        }

        fn irecv(&self, src: Rank, tag: Tag, len: usize) -> Result<MemoryRecvRequest> {
            self.network.mailbox(src)?;
            Ok(MemoryRecvRequest {
                src,
                tag,
                len,
                done: false,
            })
        }

        fn test_recv(&self, request: &mut MemoryRecvRequest) -> Result<Option<Bytes>> {
            if request.done {
                return Ok(None);
            }
            let mailbox = self.network.mailbox(self.rank)?;
            let Some(envelope) = mailbox.take(&(request.src, Lane::Data, request.tag)) else {
                return Ok(None);
            };
            envelope.taken.store(true, Ordering::Release);
            request.done = true;

            if envelope.payload.len() != request.len {
                return Err(TransportError::SizeMismatch {
                    src: request.src,
                    tag: request.tag,
                    expected: request.len,
                    actual: envelope.payload.len(),
                });
            }
            Ok(Some(envelope.payload))
        }

        async fn concentrate_recv(&self, child: Rank) -> Result<Bytes> {
            self.check_child(child)?;
            self.wait(child, Lane::Concentrate).await
        }

        async fn concentrate_send(&self, payload: Bytes) -> Result<()> {
            let parent = self.tree.parent().ok_or(TransportError::NoParent(self.rank))?;
            self.post(parent, Lane::Concentrate, Tag(0), payload)?;
            Ok(())
        }

        async fn spread_recv(&self) -> Result<Bytes> {
            let parent = self.tree.parent().ok_or(TransportError::NoParent(self.rank))?;
            self.wait(parent, Lane::Spread).await
        }

        async fn spread_send(&self, child: Rank, payload: Bytes) -> Result<()> {
            self.check_child(child)?;
            self.post(child, Lane::Spread, Tag(0), payload)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryNetwork;
    use super::*;
    use crate::error::TransportError;

    #[test]
    fn test_send_completes_when_taken() {
        let network = MemoryNetwork::new(2);
        let t0 = network.transport(Rank(0));
        let t1 = network.transport(Rank(1));

        let mut send = t0
            .isend(Rank(1), Tag(3), Bytes::from_static(b"hello"))
            .unwrap();
        assert!(!t0.test_send(&mut send).unwrap());

        let mut recv = t1.irecv(Rank(0), Tag(3), 5).unwrap();
        let payload = t1.test_recv(&mut recv).unwrap().unwrap();
        assert_eq!(&payload[..], b"hello");
        assert!(t0.test_send(&mut send).unwrap());
        assert!(t1.test_recv(&mut recv).unwrap().is_none());
    }

    #[test]
    fn test_receive_matches_on_tag() {
        let network = MemoryNetwork::new(2);
        let t0 = network.transport(Rank(0));
        let t1 = network.transport(Rank(1));

        t0.isend(Rank(1), Tag(0), Bytes::from_static(b"a")).unwrap();
        t0.isend(Rank(1), Tag(1), Bytes::from_static(b"bb")).unwrap();

        let mut second = t1.irecv(Rank(0), Tag(1), 2).unwrap();
        let mut first = t1.irecv(Rank(0), Tag(0), 1).unwrap();
        assert_eq!(&t1.test_recv(&mut second).unwrap().unwrap()[..], b"bb");
        assert_eq!(&t1.test_recv(&mut first).unwrap().unwrap()[..], b"a");
    }

    #[test]
    fn test_size_mismatch() {
        let network = MemoryNetwork::new(2);
        let t0 = network.transport(Rank(0));
        let t1 = network.transport(Rank(1));

        t0.isend(Rank(1), Tag(0), Bytes::from_static(b"abc")).unwrap();
        let mut recv = t1.irecv(Rank(0), Tag(0), 4).unwrap();
        assert!(matches!(
            t1.test_recv(&mut recv),
            Err(TransportError::SizeMismatch { expected: 4, actual: 3, .. })
        ));
    }

    #[test]
    fn test_denied_channel() {
        let network = MemoryNetwork::new(3);
        network.deny_channel(Rank(0), Rank(2));
        let t2 = network.transport(Rank(2));
        assert!(t2.get_channel(Rank(1)).is_ok());
        assert!(matches!(
            t2.get_channel(Rank(0)),
            Err(TransportError::ChannelUnavailable { .. })
        ));
        assert!(t2.get_channel(Rank(7)).is_err());
    }

    #[tokio::test]
    async fn test_concentrate_and_spread() {
        let network = MemoryNetwork::new(3);
        let t0 = network.transport(Rank(0));
        let t2 = network.transport(Rank(2));

        t2.concentrate_send(Bytes::from_static(b"up")).await.unwrap();
        assert_eq!(&t0.concentrate_recv(Rank(2)).await.unwrap()[..], b"up");

        t0.spread_send(Rank(2), Bytes::from_static(b"down")).await.unwrap();
        assert_eq!(&t2.spread_recv().await.unwrap()[..], b"down");

        assert!(matches!(
            t0.concentrate_send(Bytes::new()).await,
            Err(TransportError::NoParent(_))
        ));
        assert!(t2.spread_send(Rank(1), Bytes::new()).await.is_err());
    }
}
