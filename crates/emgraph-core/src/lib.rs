//! emgraph-core: Shared types, data-source capabilities, and configuration for emgraph.
//!
//! This crate provides the foundational types used across all emgraph components:
//! - Asset (node) and asset relation types as normalized from the OTL API
//! - Type URI helpers (short types, directional relation types)
//! - The `NodeSource` / `RelationSource` capabilities the collector fetches through
//! - Configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod source;
pub mod types;

pub use error::{ConfigError, SourceError};
pub use source::{NodeSource, RelationSource};
pub use types::{canonical_uuid, is_directional_type, short_type, Node, Relation};
