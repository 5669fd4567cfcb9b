//! Data-source capabilities the collector fetches through.
//!
//! Implementations own pagination, batching and retries. Both capabilities
//! hand back records already normalized into [`Node`] / [`Relation`].

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::types::{Node, Relation};

/// Fetch assets by uuid.
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// Fetch every asset whose uuid is in `uuids`. Unknown uuids are simply
    /// absent from the result. `uuids` is never empty.
    async fn fetch_nodes_by_uuids(
        &self,
        uuids: &BTreeSet<String>,
    ) -> Result<Vec<Node>, SourceError>;
}

/// Fetch asset relations by endpoint.
#[async_trait]
pub trait RelationSource: Send + Sync {
    /// Fetch every relation with one of `uuids` as source or target.
    async fn fetch_relations_by_endpoint_uuids(
        &self,
        uuids: &BTreeSet<String>,
    ) -> Result<Vec<Relation>, SourceError>;
}
