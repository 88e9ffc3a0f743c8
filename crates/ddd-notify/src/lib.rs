//! # DDD Notify
//!
//! Every rank knows which messages it wants to send, but not which messages
//! it will receive. Notify computes the transpose of the global
//! "who sends how much to whom" relation, so that each rank learns its
//! expected receives, without a global broadcast and without any rank
//! knowing the full topology in advance.
//!
//! ## Algorithm
//!
//! Two waves over the transport's spanning tree:
//!
//! 1. [`merge_up`](wave::merge_up): tuples travel towards the root. Each node
//!    resolves the tuples whose destination lies in its own subtree and
//!    forwards the rest, together with one placeholder per rank so that
//!    ancestors learn which ranks live below which child.
//! 2. [`route_down`](wave::route_down): resolved tuples travel back down,
//!    each node keeping the ones addressed to itself.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ddd_core::Rank;
//! use ddd_notify::{NotifyConfig, Notifier};
//! use ddd_transport::{HeapPool, MemoryNetwork};
//!
//! async fn example() {
//!     let network = MemoryNetwork::new(2);
//!     let transport = network.transport(Rank(0));
//!     let pool = HeapPool::new();
//!     let config = NotifyConfig::default();
//!     let notifier = Notifier::new(&transport, &pool, &config);
//!
//!     let mut round = notifier.begin(1);
//!     round.announce(Rank(1), 128);
//!     // Collective: rank 1 must run its own round concurrently.
//!     // let expected = round.notify().await.unwrap();
//!     round.end();
//! }
//! ```

pub mod config;
pub mod error;
pub mod notify;
pub mod record;
pub mod wave;

pub use config::NotifyConfig;
pub use error::{NotifyError, Result};
pub use notify::{Announcement, ExpectedRecv, Notifier, NotifyRound};
pub use record::{Classification, NotifyRecord};
