//! Shared utilities for docket integration tests.
//!
//! - `TestHarness`: temp directory with an on-disk SQLite store
//! - `FakeBackend`: scripted in-memory job queue and record source
//! - builders for records

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{wait_until_settled, FakeBackend, TestHarness};
