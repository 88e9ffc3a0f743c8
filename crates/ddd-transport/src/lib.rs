//! # DDD Transport
//!
//! The collaborator contracts the DDD communication core is built on, plus an
//! in-process reference implementation of each.
//!
//! ## Overview
//!
//! - [`Transport`] - non-blocking point-to-point send/receive with completion
//!   polling, tree-structured reduce ("Concentrate") and broadcast ("Spread"),
//!   and lazy channel acquisition.
//! - [`TreeTopology`] - the spanning tree Concentrate and Spread run along.
//! - [`MemoryPool`] - allocator families for persistent and per-phase
//!   temporary memory, with RAII [`Lease`]s.
//! - [`MemoryNetwork`] - N ranks inside one process, one [`MemoryTransport`]
//!   per rank, for tests and examples.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ddd_core::Rank;
//! use ddd_transport::{global_sum, MemoryNetwork};
//!
//! async fn example() {
//!     let network = MemoryNetwork::new(4);
//!     let transport = network.transport(Rank(0));
//!
//!     // Every rank must take part in the reduction.
//!     // let total = global_sum(&transport, 1).await.unwrap();
//! }
//! ```

pub mod collective;
pub mod error;
pub mod pool;
pub mod topology;
pub mod transport;

pub use collective::{agree_exception, barrier, global_sum};
pub use error::{Result, TransportError};
pub use pool::{BudgetPool, HeapPool, Lease, MemClass, MemoryPool};
pub use topology::TreeTopology;
pub use transport::{
    memory::MemoryNetwork, memory::MemoryRecvRequest, memory::MemorySendRequest,
    memory::MemoryTransport, Transport,
};
