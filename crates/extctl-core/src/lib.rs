//! # extctl-core
//!
//! Core library for the extctl CLI providing:
//! - The `ExtensionId` identifier shared by every component
//! - Per-invocation configuration (`Context`, `Paths`, `Settings`)
//! - The core error type

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use config::{Context, Paths, Settings};
pub use error::{Error, Result};
pub use types::ExtensionId;
pub use utils::get_home_dir;
