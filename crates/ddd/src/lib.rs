//! # DDD
//!
//! The communication core of a distributed dynamic-data library: ranks of a
//! fixed-size parallel run exchange typed, variable-shape messages without
//! knowing in advance who sends to whom, and audit that replicated object
//! state stayed consistent.
//!
//! ## Overview
//!
//! - **Notify**: every rank learns which messages to expect, without a
//!   global broadcast.
//! - **LowComm**: self-describing message types made of tables and chunks,
//!   buffers allocated under memory pressure, non-blocking transfers driven
//!   to completion.
//! - **Consistency checker**: verifies replication invariants across the run.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ddd::{Ddd, DddConfig};
//! use ddd::core::Rank;
//! use ddd::transport::{HeapPool, MemoryNetwork};
//!
//! async fn example() {
//!     let network = MemoryNetwork::new(2);
//!     let mut ddd = Ddd::new(network.transport(Rank(0)), HeapPool::new(), DddConfig::default());
//!
//!     let lc = ddd.lowcomm_mut();
//!     let ty = lc.new_msg_type("halo");
//!     let values = lc.new_table(ty, "values", 8);
//!
//!     let msg = lc.new_send_msg(ty, Rank(1));
//!     lc.set_table_len(msg, values, 16);
//!     lc.prepare_send(msg).unwrap();
//!     lc.table_mut(msg, values).fill(0);
//!
//!     // Collective: rank 1 must run the same phase.
//!     // lc.connect(ty).await.unwrap();
//!     // lc.send(msg).unwrap();
//!     // let received = lc.communicate().await.unwrap();
//!     // lc.cleanup();
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `ddd::core` - ranks, ids, priorities, exception codes
//! - `ddd::transport` - transport trait, memory pools, in-memory network
//! - `ddd::notify` - the Notify protocol
//! - `ddd::lowcomm` - message types and phases
//! - `ddd::cons` - the consistency checker

pub mod context;
pub mod error;

pub use ddd_cons as cons;
pub use ddd_core as core;
pub use ddd_lowcomm as lowcomm;
pub use ddd_notify as notify;
pub use ddd_transport as transport;

pub use context::{Ddd, DddConfig};
pub use error::{DddError, Result};

pub use ddd_cons::{ConsConfig, ConsMode, ConsReport, Inconsistency, LocalObject, Snapshot};
pub use ddd_core::{ExceptionCode, Gid, ObjType, Priority, Rank};
pub use ddd_lowcomm::{Comp, LowComm, LowCommConfig, LowCommError, MsgType, RecvMsg, SendMsg};
pub use ddd_notify::{NotifyConfig, NotifyError};
pub use ddd_transport::{MemoryPool, Transport};
