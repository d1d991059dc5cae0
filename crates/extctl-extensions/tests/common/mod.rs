//! Common test utilities for extctl-extensions
//!
//! - Fixtures: a temporary data directory with store and extensions dir
//! - Mocks: a recording fake fetcher and plan executor
//! - Assertion helpers for on-disk state

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod assertions;
pub mod fixtures;
pub mod mocks;

pub use assertions::*;
pub use fixtures::*;
pub use mocks::*;
