//! # DDD Testkit
//!
//! Testing utilities for the DDD communication core.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Harness**: run every rank of an in-memory run as a tokio task
//! - **Fixtures**: replication snapshots that are consistent by construction,
//!   with fault injection
//! - **Generators**: Proptest strategies for traffic patterns and
//!   replication states
//! - **Logging**: `tracing` output routed to the test writer
//!
//! ## Multi-Rank Tests
//!
//! ```rust,no_run
//! use ddd::DddConfig;
//! use ddd_testkit::{run_ddd, ReplicationFixture};
//!
//! async fn example() {
//!     let fixture = ReplicationFixture::generate(4, 100, 42);
//!     let snapshots = fixture.snapshots();
//!
//!     let reports = run_ddd(4, DddConfig::default(), |mut ddd| {
//!         let snapshot = snapshots[ddd.rank().index()].clone();
//!         async move { ddd.cons_check(&snapshot).await.unwrap() }
//!     })
//!     .await;
//!     assert!(reports.iter().all(|r| r.is_consistent()));
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod harness;
pub mod logging;

pub use fixtures::{PriorityFault, ReplicatedObject, ReplicationFixture};
pub use harness::{run_ddd, run_ddd_with_pools, run_ranks};
pub use logging::{init_test_logging, init_test_logging_at};
