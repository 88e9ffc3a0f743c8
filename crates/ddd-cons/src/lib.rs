//! # DDD Consistency Checker
//!
//! Audits the replication invariants of a distributed object set after a
//! replication phase:
//!
//! - no rank holds two local objects with the same global id
//!   ([`check_double_obj`]),
//! - every coupling is locally sane ([`check_local_cpl`]),
//! - every coupling is mirrored, with matching type and priorities, on the
//!   partner rank ([`ConsChecker::check_global_cpl`]),
//! - optionally, all holders of an object agree on its full holder set
//!   ([`ConsChecker::check_global_cpl_all`]).
//!
//! [`ConsChecker::cons_check`] runs all of them and sums the findings over
//! the run. The checker is strictly diagnostic: findings are logged and
//! returned, never repaired.

pub mod check;
pub mod config;
pub mod error;
pub mod report;
pub mod rows;
pub mod snapshot;

pub use check::{check_double_obj, check_local_cpl, ConsChecker};
pub use config::{ConsConfig, ConsMode};
pub use error::{ConsError, Result};
pub use report::{ConsReport, Inconsistency};
pub use rows::{CplRow, HolderRow, ROW_SIZE};
pub use snapshot::{Coupling, LocalObject, Snapshot};
