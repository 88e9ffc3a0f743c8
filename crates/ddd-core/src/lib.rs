//! # DDD Core
//!
//! Pure primitives shared by every layer of the DDD communication core:
//! rank identifiers, global object ids, priorities, and the negative
//! exception codes that collective operations use to unwind consistently.
//!
//! This crate contains no I/O and no networking.
//!
//! ## Key Types
//!
//! - [`Rank`] - One participant in the fixed-size parallel run
//! - [`Gid`] - Global object id, unique across all ranks and totally ordered
//! - [`Priority`] - Replica priority of a distributed object
//! - [`ExceptionCode`] - Negative code propagated through collective operations

pub mod error;
pub mod exception;
pub mod types;

pub use error::CoreError;
pub use exception::ExceptionCode;
pub use types::{Gid, ObjType, Priority, Rank, Tag};
