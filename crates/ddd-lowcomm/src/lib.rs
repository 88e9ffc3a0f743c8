//! Typed asynchronous messaging between ranks.
//!
//! A [`LowComm`] context registers message types made of tables and chunks,
//! builds self-describing buffers for them, and runs communication phases:
//! Notify discovers who receives what, then all buffers move with
//! non-blocking point-to-point transfers. Buffers come from a
//! [`MemoryPool`](ddd_transport::MemoryPool); when it runs dry, completed
//! sends are reclaimed before giving up.

pub mod config;
pub mod error;
pub mod layout;
pub mod lowcomm;
pub mod message;
pub mod registry;
pub mod stats;

pub use config::{LowCommConfig, MAX_COMPONENTS};
pub use error::{LayoutError, LowCommError, Result};
pub use layout::{Layout, Slot, ALIGN};
pub use lowcomm::{CommStatus, LowComm};
pub use message::{RecvMsg, RecvState, SendMsg, SendState};
pub use registry::{Comp, ComponentDesc, ComponentKind, MessageType, MsgType, TypeRegistry};
pub use stats::PhaseStats;
