//! Integration test suite for tempo.
//!
//! These tests exercise the full pipeline from task snapshot to batch
//! plan, including reconciliation against a moving source and the
//! scheduler loop's debounce behaviour.
//!
//! # Test Categories
//!
//! - `pipeline`: scope, depth, grouping and classification end to end
//! - `reconciliation`: optimistic mutations racing re-fetches
//! - `scheduling`: the scheduler loop, debounce and failure events
//!
//! # CI Compatibility
//!
//! All tests run against the in-memory task source; no tracker files or
//! watchers are involved, making them safe for CI.

mod fixtures;

mod pipeline;
mod reconciliation;
