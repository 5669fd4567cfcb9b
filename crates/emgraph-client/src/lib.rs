//! emgraph-client: REST client for the EM-Infra OTL API.
//!
//! Implements the `NodeSource` and `RelationSource` capabilities from
//! `emgraph-core` on top of the asset and asset-relation search endpoints,
//! and normalizes the raw JSON-LD records into `Node` / `Relation`.

pub mod adapter;
pub mod client;
pub mod queries;

pub use client::{ClientError, EmInfraClient};
pub use emgraph_core::config::ClientConfig;
