//! Arbor Config
//!
//! This crate contains the serializable configuration types for an arbor
//! workflow host. They describe how the host drains queued actions and when
//! it renders, independent of any particular workflow tree.
//!
//! Configuration can be loaded from:
//! - JSON files (via CLI with `--config=host.json`)
//! - Inline JSON strings (embedders, tests)

mod error;
mod host;

pub use error::ConfigError;
pub use host::{HostConfig, RenderPolicy};
